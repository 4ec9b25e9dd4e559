use std::path::Path;

use super::common::{load_grayscale, resize_gray};
use crate::error::{Error, Result};
use crate::hashval::HashVal;

/// Difference hash: http://www.hackerfactor.com/blog/index.php?/archives/529-Kind-of-Like-That.html
///
/// Resize to `(N+1) x N`, set bit `i` when a pixel is greater than its
/// left neighbor in the same row.
pub fn hash<const N: usize>(path: &Path) -> Result<HashVal<N>> {
    assert!(N >= 2, "hash size must be >= 2");

    let cols = N + 1;
    let pixels = load_grayscale(path, cols as u32, N as u32)?;
    hash_pixels(&pixels, N)
}

/// Same algorithm over an already-decoded grayscale buffer.
pub fn hash_buffer<const N: usize>(gray: &[u8], w: u32, h: u32, path: &Path) -> Result<HashVal<N>> {
    assert!(N >= 2, "hash size must be >= 2");

    let cols = N + 1;
    let pixels = resize_gray(gray, w, h, cols as u32, N as u32).ok_or_else(|| Error::UnknownType {
        path: path.to_path_buf(),
    })?;
    hash_pixels(&pixels, N)
}

fn hash_pixels<const N: usize>(pixels: &[u8], n: usize) -> Result<HashVal<N>> {
    let cols = n + 1;
    let mut hv = HashVal::<N>::new();
    let mut index = 0;
    for row in 0..n {
        for col in 1..cols {
            let prev = pixels[row * cols + col - 1];
            let cur = pixels[row * cols + col];
            hv.set(index, cur > prev)?;
            index += 1;
        }
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
    fn nonzero_hash_for_gradient() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grad.png");
        write_png(&path, 64, 64, |x, _| [(x * 4) as u8, 0, 0]);

        let hv = hash::<8>(&path).unwrap();
        assert_ne!(hv.uint64(), 0);
    }

    #[test]
    fn flat_image_hashes_to_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("flat.png");
        write_png(&path, 32, 32, |_, _| [128, 128, 128]);

        let hv = hash::<8>(&path).unwrap();
        assert_eq!(hv.uint64(), 0);
    }
}
