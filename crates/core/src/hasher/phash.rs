use std::path::Path;
use std::sync::Arc;

use rustdct::{DctPlanner, TransformType2And3};

use super::common::{load_grayscale, median, resize_gray};
use crate::error::{Error, Result};
use crate::hashval::HashVal;

const HIGH_FREQ_FACTOR: usize = 4;

/// Perceptual hash: http://www.hackerfactor.com/blog/index.php?/archives/432-Looks-Like-It.html
///
/// Resize to `(4*N) x (4*N)`, run a 2D DCT-II, keep the top-left `N x N`
/// low-frequency subblock, threshold each coefficient against the
/// subblock's median.
pub fn hash<const N: usize>(path: &Path) -> Result<HashVal<N>> {
    assert!(N >= 2, "hash size must be >= 2");

    let img_size = HIGH_FREQ_FACTOR * N;
    let pixels = load_grayscale(path, img_size as u32, img_size as u32)?;
    hash_pixels(&pixels, N, img_size)
}

/// Same algorithm over an already-decoded grayscale buffer.
pub fn hash_buffer<const N: usize>(gray: &[u8], w: u32, h: u32, path: &Path) -> Result<HashVal<N>> {
    assert!(N >= 2, "hash size must be >= 2");

    let img_size = HIGH_FREQ_FACTOR * N;
    let pixels = resize_gray(gray, w, h, img_size as u32, img_size as u32).ok_or_else(|| {
        Error::UnknownType {
            path: path.to_path_buf(),
        }
    })?;
    hash_pixels(&pixels, N, img_size)
}

fn hash_pixels<const N: usize>(pixels: &[u8], n: usize, img_size: usize) -> Result<HashVal<N>> {
    let mut samples: Vec<f64> = pixels.iter().map(|&p| p as f64 / 255.0).collect();
    dct2d_inplace(&mut samples, img_size);

    // Top-left NxN subblock of the full img_size x img_size DCT output,
    // row-skipping (img_size - N) columns between rows.
    let mut low_freq = Vec::with_capacity(n * n);
    let mut index = 0;
    for _ in 0..n {
        for _ in 0..n {
            low_freq.push(samples[index]);
            index += 1;
        }
        index += img_size - n;
    }

    let mut to_sort = low_freq.clone();
    let med = median(&mut to_sort);

    let mut hv = HashVal::<N>::new();
    for (i, &v) in low_freq.iter().enumerate() {
        hv.set(i, v > med)?;
    }
    Ok(hv)
}

/// In-place 2D DCT-II over a `size x size` row-major buffer: DCT each row,
/// transpose, DCT each row again (the transformed columns), transpose back.
fn dct2d_inplace(data: &mut [f64], size: usize) {
    let dct = DctPlanner::new().plan_dct2(size);
    dct_rows(data, size, &dct);

    let mut transposed = vec![0.0f64; data.len()];
    transpose::transpose(data, &mut transposed, size, size);
    dct_rows(&mut transposed, size, &dct);

    transpose::transpose(&transposed, data, size, size);
}

fn dct_rows(data: &mut [f64], size: usize, dct: &Arc<dyn TransformType2And3<f64>>) {
    for row in data.chunks_exact_mut(size) {
        dct.process_dct2(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, w: u32, h: u32, f: impl Fn(u32, u32) -> [u8; 3]) {
        let img = image::RgbImage::from_fn(w, h, |x, y| image::Rgb(f(x, y)));
        img.save(path).unwrap();
    }

    #[test]
    fn nonzero_hash_for_non_uniform_image() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grad.png");
        write_png(&path, 128, 128, |x, y| [(x + y) as u8, (x * 2) as u8, (y * 2) as u8]);

        let hv = hash::<8>(&path).unwrap();
        assert_ne!(hv.uint64(), 0);
    }

    #[test]
    fn identical_images_produce_identical_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        write_png(&a, 64, 64, |x, y| [(x + y) as u8, 10, 20]);
        write_png(&b, 64, 64, |x, y| [(x + y) as u8, 10, 20]);

        assert_eq!(hash::<8>(&a).unwrap(), hash::<8>(&b).unwrap());
    }
}
