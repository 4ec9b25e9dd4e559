use std::path::Path;

use fast_image_resize::{self as fir, images::Image as FirImage};

use crate::error::{Error, Result};

/// Decode an image and resize it to a `width x height` grayscale buffer,
/// matching OpenCV's `INTER_AREA` behavior for downscaling via a box filter.
///
/// Uses a hybrid decode strategy: JPEG files go through `turbojpeg`'s
/// full-resolution grayscale decode (feature-gated, skips chroma planes
/// entirely), everything else goes through the `image` crate's full RGB
/// decode followed by a BT.601 grayscale conversion. Both paths feed the
/// same SIMD resize step.
pub fn load_grayscale(path: &Path, width: u32, height: u32) -> Result<Vec<u8>> {
    #[cfg(feature = "turbojpeg")]
    if is_jpeg(path) {
        if let Some(buf) = load_jpeg_grayscale(path, width, height) {
            return Ok(buf);
        }
    }

    load_image_crate_grayscale(path, width, height)
}

#[cfg(feature = "turbojpeg")]
fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
}

#[cfg(feature = "turbojpeg")]
fn load_jpeg_grayscale(path: &Path, width: u32, height: u32) -> Option<Vec<u8>> {
    let jpeg_data = std::fs::read(path).ok()?;
    let mut decompressor = turbojpeg::Decompressor::new().ok()?;
    let header = decompressor.read_header(&jpeg_data).ok()?;
    let w = header.width;
    let h = header.height;

    let mut buf = vec![0u8; w * h];
    let output = turbojpeg::Image {
        pixels: buf.as_mut_slice(),
        width: w,
        pitch: w,
        height: h,
        format: turbojpeg::PixelFormat::GRAY,
    };
    decompressor.decompress(&jpeg_data, output).ok()?;

    resize_gray(&buf, w as u32, h as u32, width, height)
}

fn load_image_crate_grayscale(path: &Path, width: u32, height: u32) -> Result<Vec<u8>> {
    let img = image::open(path).map_err(|e| Error::DecodeImage {
        path: path.to_path_buf(),
        source: e,
    })?;
    let rgb = img.to_rgb8();
    let (w, h) = (rgb.width(), rgb.height());
    let gray = rgb_to_gray(&rgb.into_raw());

    resize_gray(&gray, w, h, width, height).ok_or_else(|| Error::UnknownType {
        path: path.to_path_buf(),
    })
}

/// BT.601 luma conversion of a row-major RGB buffer.
pub fn rgb_to_gray(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|px| {
            let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
            (0.299 * r + 0.587 * g + 0.114 * b) as u8
        })
        .collect()
}

/// BT.601 luma conversion of a row-major BGR buffer (the video pipeline's
/// native frame/collage format), matching `cv::cvtColor(.., COLOR_BGR2GRAY)`.
pub fn bgr_to_gray(bgr: &[u8]) -> Vec<u8> {
    bgr.chunks_exact(3)
        .map(|px| {
            let (b, g, r) = (px[0] as f32, px[1] as f32, px[2] as f32);
            (0.299 * r + 0.587 * g + 0.114 * b) as u8
        })
        .collect()
}

/// Resize a single-channel buffer from `src_w x src_h` to `dst_w x dst_h`
/// using an area (box-filter) convolution. Returns `None` if `src_buf`'s
/// length doesn't match `src_w * src_h`.
pub fn resize_gray(src_buf: &[u8], src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Option<Vec<u8>> {
    if (src_w, src_h) == (dst_w, dst_h) {
        return Some(src_buf.to_vec());
    }
    let src = FirImage::from_vec_u8(src_w, src_h, src_buf.to_vec(), fir::PixelType::U8).ok()?;
    let mut dst = FirImage::new(dst_w, dst_h, fir::PixelType::U8);
    let options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Box));
    fir::Resizer::new().resize(&src, &mut dst, &options).ok()?;
    Some(dst.buffer().to_vec())
}

/// Cheap header-only read of an image's native dimensions, without a full decode.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|e| Error::DecodeImage {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Median of a slice using the original tool's convention:
/// `(sorted[(len + 1) / 2 - 1] + sorted[len / 2]) / 2`.
/// NOT the same as the more common `sorted[len/2]`-midpoint convention —
/// kept for bit-exact parity with the fixtures this crate is tested against.
pub fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let len = values.len();
    (values[(len + 1) / 2 - 1] + values[len / 2]) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_matches_original_convention() {
        let mut v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(median(&mut v), 2.5);
        let mut v = vec![1.0, 2.0, 3.0];
        assert_eq!(median(&mut v), 2.0);
    }

    #[test]
    fn resize_gray_identity_when_dims_match() {
        let buf = vec![1u8, 2, 3, 4];
        let out = resize_gray(&buf, 2, 2, 2, 2).unwrap();
        assert_eq!(out, buf);
    }
}
