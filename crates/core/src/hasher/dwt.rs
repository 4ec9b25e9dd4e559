//! Self-contained 2D discrete wavelet transform used by the wavelet hash.
//!
//! No wavelet/DWT crate exists in the Rust ecosystem for this, so the
//! transform is implemented directly: a periodic (circular) analysis/
//! synthesis filter bank, which keeps the single-level decomposition
//! exactly invertible for the orthonormal filters below.

/// An orthonormal wavelet filter bank (analysis + synthesis, low + high pass).
pub struct Wavelet {
    pub dec_lo: Vec<f64>,
    pub dec_hi: Vec<f64>,
    pub rec_lo: Vec<f64>,
    pub rec_hi: Vec<f64>,
}

impl Wavelet {
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "haar" => Some(Self::haar()),
            "db4" => Some(Self::db4()),
            _ => None,
        }
    }

    pub fn haar() -> Self {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        Self::from_scaling(vec![s, s])
    }

    /// Daubechies-4 (8-tap) orthonormal scaling filter.
    pub fn db4() -> Self {
        Self::from_scaling(vec![
            0.230377813309,
            0.714846570553,
            0.630880767930,
            -0.027983769417,
            -0.187034811719,
            0.030841381836,
            0.032883011667,
            -0.010597401785,
        ])
    }

    pub fn filter_length(&self) -> usize {
        self.dec_lo.len()
    }

    fn from_scaling(lo: Vec<f64>) -> Self {
        let f = lo.len();
        let hi: Vec<f64> = (0..f)
            .map(|n| {
                let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
                sign * lo[f - 1 - n]
            })
            .collect();
        let rec_lo: Vec<f64> = lo.iter().rev().copied().collect();
        let rec_hi: Vec<f64> = hi.iter().rev().copied().collect();
        Self {
            dec_lo: lo,
            dec_hi: hi,
            rec_lo,
            rec_hi,
        }
    }
}

fn circular_conv(x: &[f64], h: &[f64]) -> Vec<f64> {
    let len = x.len();
    let flen = h.len() as i64;
    (0..len as i64)
        .map(|i| {
            (0..flen)
                .map(|k| {
                    let xi = ((i - k).rem_euclid(len as i64)) as usize;
                    h[k as usize] * x[xi]
                })
                .sum()
        })
        .collect()
}

/// Single-level 1D DWT: returns (approx, detail), each half the input length.
fn dwt_1d(x: &[f64], w: &Wavelet) -> (Vec<f64>, Vec<f64>) {
    let lo_full = circular_conv(x, &w.dec_lo);
    let hi_full = circular_conv(x, &w.dec_hi);
    let half = x.len() / 2;
    let approx = (0..half).map(|j| lo_full[2 * j]).collect();
    let detail = (0..half).map(|j| hi_full[2 * j]).collect();
    (approx, detail)
}

/// Single-level 1D inverse DWT: reconstructs a signal of length `2 * approx.len()`.
fn idwt_1d(approx: &[f64], detail: &[f64], w: &Wavelet) -> Vec<f64> {
    let len = approx.len() * 2;
    let mut up_lo = vec![0.0; len];
    let mut up_hi = vec![0.0; len];
    for j in 0..approx.len() {
        up_lo[2 * j] = approx[j];
        up_hi[2 * j] = detail[j];
    }
    let lo = circular_conv(&up_lo, &w.rec_lo);
    let hi = circular_conv(&up_hi, &w.rec_hi);
    lo.iter().zip(hi.iter()).map(|(a, b)| a + b).collect()
}

/// Separable single-level 2D DWT over a `size x size` row-major buffer:
/// rows first, then columns. Returns (LL, LH, HL, HH), each
/// `(size/2) x (size/2)`.
fn dwt2(image: &[f64], size: usize, w: &Wavelet) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let half = size / 2;

    // Transform rows: each row splits into a low half and a high half.
    let mut row_lo = vec![0.0; half * size];
    let mut row_hi = vec![0.0; half * size];
    for r in 0..size {
        let row = &image[r * size..(r + 1) * size];
        let (lo, hi) = dwt_1d(row, w);
        row_lo[r * half..(r + 1) * half].copy_from_slice(&lo);
        row_hi[r * half..(r + 1) * half].copy_from_slice(&hi);
    }

    // Transform columns of each half.
    let mut ll = vec![0.0; half * half];
    let mut lh = vec![0.0; half * half];
    let mut hl = vec![0.0; half * half];
    let mut hh = vec![0.0; half * half];
    for c in 0..half {
        let col_lo: Vec<f64> = (0..size).map(|r| row_lo[r * half + c]).collect();
        let col_hi: Vec<f64> = (0..size).map(|r| row_hi[r * half + c]).collect();

        let (lo_lo, hi_lo) = dwt_1d(&col_lo, w);
        let (lo_hi, hi_hi) = dwt_1d(&col_hi, w);
        for r in 0..half {
            ll[r * half + c] = lo_lo[r];
            hl[r * half + c] = hi_lo[r];
            lh[r * half + c] = lo_hi[r];
            hh[r * half + c] = hi_hi[r];
        }
    }

    (ll, lh, hl, hh)
}

/// Inverse of [`dwt2`]: reconstructs a `size x size` image from its four subbands.
fn idwt2(ll: &[f64], lh: &[f64], hl: &[f64], hh: &[f64], size: usize, w: &Wavelet) -> Vec<f64> {
    let half = size / 2;

    let mut row_lo = vec![0.0; half * size];
    let mut row_hi = vec![0.0; half * size];
    for c in 0..half {
        let col_ll: Vec<f64> = (0..half).map(|r| ll[r * half + c]).collect();
        let col_hl: Vec<f64> = (0..half).map(|r| hl[r * half + c]).collect();
        let col_lh: Vec<f64> = (0..half).map(|r| lh[r * half + c]).collect();
        let col_hh: Vec<f64> = (0..half).map(|r| hh[r * half + c]).collect();

        let lo_col = idwt_1d(&col_ll, &col_hl, w);
        let hi_col = idwt_1d(&col_lh, &col_hh, w);
        for r in 0..size {
            row_lo[r * half + c] = lo_col[r];
            row_hi[r * half + c] = hi_col[r];
        }
    }

    let mut image = vec![0.0; size * size];
    for r in 0..size {
        let lo = &row_lo[r * half..(r + 1) * half];
        let hi = &row_hi[r * half..(r + 1) * half];
        let row = idwt_1d(lo, hi, w);
        image[r * size..(r + 1) * size].copy_from_slice(&row);
    }
    image
}

/// Repeatedly takes the LL quadrant for `levels` single-level decompositions,
/// returning the final `(size / 2^levels)`-square LL subband flattened
/// row-major — this is the leading block `wavelib`'s flattened coefficient
/// array exposes, and all the wavelet hash needs from the main pass.
pub fn ll_after_levels(image: &[f64], size: usize, levels: usize, w: &Wavelet) -> Vec<f64> {
    let mut cur = image.to_vec();
    let mut cur_size = size;
    for _ in 0..levels {
        let (ll, _, _, _) = dwt2(&cur, cur_size, w);
        cur = ll;
        cur_size /= 2;
    }
    cur
}

/// Removes the coarsest-level LL (DC) component using the Haar wavelet:
/// forward-transform `levels` levels (keeping every subband so the
/// transform can be undone), zero the final LL, then inverse-transform
/// back to a `size x size` image.
pub fn remove_max_haar_ll(image: &[f64], size: usize, levels: usize) -> Vec<f64> {
    let haar = Wavelet::haar();
    let mut stack = Vec::with_capacity(levels);
    let mut cur = image.to_vec();
    let mut cur_size = size;

    for _ in 0..levels {
        let (ll, lh, hl, hh) = dwt2(&cur, cur_size, &haar);
        stack.push((lh, hl, hh, cur_size));
        cur = ll;
        cur_size /= 2;
    }

    for v in cur.iter_mut() {
        *v = 0.0;
    }

    for (lh, hl, hh, size_before) in stack.into_iter().rev() {
        cur = idwt2(&cur, &lh, &hl, &hh, size_before, &haar);
        cur_size = size_before;
    }
    debug_assert_eq!(cur_size, size);
    cur
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haar_round_trips() {
        let w = Wavelet::haar();
        let size = 8;
        let image: Vec<f64> = (0..size * size).map(|i| i as f64).collect();
        let (ll, lh, hl, hh) = dwt2(&image, size, &w);
        let back = idwt2(&ll, &lh, &hl, &hh, size, &w);
        for (a, b) in image.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-8, "{a} vs {b}");
        }
    }

    #[test]
    fn db4_round_trips() {
        let w = Wavelet::db4();
        let size = 16;
        let image: Vec<f64> = (0..size * size).map(|i| (i % 7) as f64).collect();
        let (ll, lh, hl, hh) = dwt2(&image, size, &w);
        let back = idwt2(&ll, &lh, &hl, &hh, size, &w);
        for (a, b) in image.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn ll_after_levels_shrinks_by_power_of_two() {
        let w = Wavelet::haar();
        let size = 32;
        let image: Vec<f64> = (0..size * size).map(|i| (i % 5) as f64).collect();
        let ll = ll_after_levels(&image, size, 2, &w);
        assert_eq!(ll.len(), (size / 4) * (size / 4));
    }

    #[test]
    fn remove_max_haar_ll_zeroes_dc_component() {
        let size = 8;
        // constant image: its only energy is in the DC/LL term.
        let image = vec![5.0; size * size];
        let filtered = remove_max_haar_ll(&image, size, 3);
        let mean: f64 = filtered.iter().sum::<f64>() / filtered.len() as f64;
        assert!(mean.abs() < 1e-6);
    }
}
