use std::path::Path;

use super::common::{image_dimensions, load_grayscale, median, resize_gray};
use super::dwt::{ll_after_levels, remove_max_haar_ll, Wavelet};
use crate::error::{Error, Result};
use crate::hashval::HashVal;

/// Options for the wavelet hash. Defaults match the original tool:
/// Haar wavelet, auto image scale, DC-removal pre-pass enabled.
pub struct WhashOptions {
    pub mode: String,
    /// `0` means auto-derive from the source image's dimensions.
    pub img_scale: usize,
    pub remove_max_haar_ll: bool,
}

impl Default for WhashOptions {
    fn default() -> Self {
        Self {
            mode: "haar".to_string(),
            img_scale: 0,
            remove_max_haar_ll: true,
        }
    }
}

/// Wavelet hash, based on https://www.kaggle.com/c/avito-duplicate-ads-detection/
///
/// Resizes to an auto-derived (or explicit) power-of-two image scale,
/// optionally removes the coarsest Haar LL/DC component, then runs a
/// multi-level 2D DWT and thresholds the final `N x N` LL subband against
/// its median.
pub fn hash<const N: usize>(path: &Path, opts: &WhashOptions) -> Result<HashVal<N>> {
    let (img_scale, wavelet) = resolve_scale(N, opts, || image_dimensions(path))?;
    let pixels = load_grayscale(path, img_scale as u32, img_scale as u32)?;
    hash_pixels(&pixels, N, img_scale, opts, &wavelet)
}

/// Same algorithm over an already-decoded grayscale buffer (e.g. a video
/// collage): `(w, h)` stands in for the source image's native dimensions
/// when `img_scale` is auto-derived.
pub fn hash_buffer<const N: usize>(
    gray: &[u8],
    w: u32,
    h: u32,
    path: &Path,
    opts: &WhashOptions,
) -> Result<HashVal<N>> {
    let (img_scale, wavelet) = resolve_scale(N, opts, || Ok((h, w)))?;
    let pixels = resize_gray(gray, w, h, img_scale as u32, img_scale as u32).ok_or_else(|| {
        Error::UnknownType {
            path: path.to_path_buf(),
        }
    })?;
    hash_pixels(&pixels, N, img_scale, opts, &wavelet)
}

fn resolve_scale(
    n: usize,
    opts: &WhashOptions,
    native_dims: impl FnOnce() -> Result<(u32, u32)>,
) -> Result<(usize, Wavelet)> {
    assert!(n >= 2, "hash size must be >= 2");
    assert!(n & (n - 1) == 0, "hash size must be a power of two");

    let wavelet = Wavelet::by_name(&opts.mode).ok_or_else(|| Error::ParamInvalid {
        message: format!("mode should be haar or db4, got \"{}\"", opts.mode),
    })?;

    let img_scale = if opts.img_scale != 0 {
        if opts.img_scale & (opts.img_scale - 1) != 0 {
            return Err(Error::ParamInvalid {
                message: "img_scale should be power of 2".to_string(),
            });
        }
        if opts.img_scale < n {
            return Err(Error::ParamInvalid {
                message: "img_scale should be greater than or equal to hash size".to_string(),
            });
        }
        opts.img_scale
    } else {
        let (rows, cols) = native_dims()?;
        let natural_scale = 1usize << (rows.min(cols) as f64).log2().floor() as u32;
        natural_scale.max(n)
    };

    Ok((img_scale, wavelet))
}

fn hash_pixels<const N: usize>(
    pixels: &[u8],
    n: usize,
    img_scale: usize,
    opts: &WhashOptions,
    wavelet: &Wavelet,
) -> Result<HashVal<N>> {
    let ll_max_level = (img_scale as f64).log2() as usize;
    let level = (n as f64).log2() as usize;
    let dwt_level = (ll_max_level.saturating_sub(level)).max(1);

    let mut samples: Vec<f64> = pixels.iter().map(|&p| p as f64 / 255.0).collect();

    if opts.remove_max_haar_ll {
        samples = remove_max_haar_ll(&samples, img_scale, ll_max_level);
    }

    let coeffs = ll_after_levels(&samples, img_scale, dwt_level, wavelet);
    debug_assert_eq!(coeffs.len(), n * n);

    let mut to_sort = coeffs.clone();
    let med = median(&mut to_sort);

    let mut hv = HashVal::<N>::new();
    for (i, &c) in coeffs.iter().enumerate() {
        hv.set(i, c > med)?;
    }
    Ok(hv)
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

        let hv = hash::<8>(&path, &WhashOptions::default()).unwrap();
        assert_ne!(hv.uint64(), 0);
    }

    #[test]
    fn db4_mode_also_produces_a_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grad.png");
        write_png(&path, 128, 128, |x, y| [(x + y) as u8, (x * 2) as u8, (y * 2) as u8]);

        let opts = WhashOptions {
            mode: "db4".to_string(),
            ..Default::default()
        };
        let hv = hash::<8>(&path, &opts).unwrap();
        assert_ne!(hv.uint64(), 0);
    }

    #[test]
    fn hash_buffer_matches_file_hash_for_identity_dims() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grad.png");
        write_png(&path, 128, 128, |x, y| [(x + y) as u8, (x * 2) as u8, (y * 2) as u8]);

        let gray = super::super::common::load_grayscale(&path, 128, 128).unwrap();
        let from_file = hash::<8>(&path, &WhashOptions::default()).unwrap();
        let from_buffer =
            hash_buffer::<8>(&gray, 128, 128, &path, &WhashOptions::default()).unwrap();
        assert_eq!(from_file, from_buffer);
    }

    #[test]
    fn rejects_unknown_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grad.png");
        write_png(&path, 64, 64, |x, _| [(x * 4) as u8, 0, 0]);

        let opts = WhashOptions {
            mode: "bogus".to_string(),
            ..Default::default()
        };
        assert!(hash::<8>(&path, &opts).is_err());
    }
}
