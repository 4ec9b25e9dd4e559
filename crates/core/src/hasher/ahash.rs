use std::path::Path;

use super::common::{load_grayscale, resize_gray};
use crate::error::{Error, Result};
use crate::hashval::HashVal;

/// Average hash: http://www.hackerfactor.com/blog/index.php?/archives/432-Looks-Like-It.html
///
/// Resize to `N x N`, threshold each pixel against the image mean.
pub fn hash<const N: usize>(path: &Path) -> Result<HashVal<N>> {
    assert!(N >= 2, "hash size must be >= 2");

    let pixels = load_grayscale(path, N as u32, N as u32)?;
    hash_pixels(&pixels)
}

/// Same algorithm over an already-decoded grayscale buffer (e.g. a video
/// collage), resizing from `(w, h)` down to `N x N` first.
pub fn hash_buffer<const N: usize>(gray: &[u8], w: u32, h: u32, path: &Path) -> Result<HashVal<N>> {
    assert!(N >= 2, "hash size must be >= 2");

    let pixels = resize_gray(gray, w, h, N as u32, N as u32).ok_or_else(|| Error::UnknownType {
        path: path.to_path_buf(),
    })?;
    hash_pixels(&pixels)
}

fn hash_pixels<const N: usize>(pixels: &[u8]) -> Result<HashVal<N>> {
    let avg = pixels.iter().map(|&p| p as u64).sum::<u64>() / pixels.len() as u64;

    let mut hv = HashVal::<N>::new();
    for (i, &p) in pixels.iter().enumerate() {
        hv.set(i, p as u64 > avg)?;
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
        write_png(&path, 64, 64, |x, _| [(x * 4) as u8, 0, 0]);

        let hv = hash::<8>(&path).unwrap();
        assert_ne!(hv.uint64(), 0);
    }

    #[test]
    fn identical_images_produce_identical_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        write_png(&a, 32, 32, |x, y| [(x + y) as u8, 10, 20]);
        write_png(&b, 32, 32, |x, y| [(x + y) as u8, 10, 20]);

        assert_eq!(hash::<8>(&a).unwrap(), hash::<8>(&b).unwrap());
    }

    #[test]
    fn hash_buffer_is_nonzero_for_gradient() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grad.png");
        write_png(&path, 64, 64, |x, _| [(x * 4) as u8, 0, 0]);

        let gray = super::super::common::load_grayscale(&path, 64, 64).unwrap();
        let hv_buf = hash_buffer::<8>(&gray, 64, 64, &path).unwrap();
        assert_ne!(hv_buf.uint64(), 0);
    }
}
