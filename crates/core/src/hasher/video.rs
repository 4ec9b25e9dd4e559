use std::path::Path;

use ffmpeg_next as ffmpeg;

use crate::color::{ColorType, DOMINANT_COLOR_MAP};
use crate::error::{Error, Result};

const AV_TIME_BASE: f64 = 1_000_000.0;

/// One sampled, BGR-scaled video frame.
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Seeks and decodes one frame every `rate` seconds, mirroring the
/// original tool's `VideoDecoder::peek` sampling strategy.
pub struct VideoSampler {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    duration: i64,
    rate: f64,
    scaled_rows: u32,
    scaled_cols: u32,
    peek_frame_idx: u32,
    end_of_stream: bool,
}

fn open_err(path: &Path, message: &str) -> Error {
    Error::OpenFile {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, message.to_string()),
    }
}

impl VideoSampler {
    pub fn open(path: &Path, rate: f64, scaled_rows: u32, scaled_cols: u32) -> Result<Self> {
        ffmpeg::init().map_err(|e| open_err(path, &e.to_string()))?;

        let ictx = ffmpeg::format::input(path).map_err(|e| open_err(path, &e.to_string()))?;
        let input = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| open_err(path, "no video stream found"))?;
        let stream_index = input.index();
        let duration = ictx.duration();

        let context_decoder = ffmpeg::codec::context::Context::from_parameters(input.parameters())
            .map_err(|e| open_err(path, &e.to_string()))?;
        let decoder = context_decoder
            .decoder()
            .video()
            .map_err(|e| open_err(path, &e.to_string()))?;

        let (rows, cols) = (decoder.height(), decoder.width());
        let (out_rows, out_cols) = match (scaled_rows, scaled_cols) {
            (0, 0) => (rows, cols),
            (0, c) => ((c as f64 * rows as f64 / cols as f64).ceil() as u32, c),
            (r, 0) => (r, (r as f64 * cols as f64 / rows as f64).ceil() as u32),
            (r, c) => (r, c),
        };

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            cols,
            rows,
            ffmpeg::format::Pixel::BGR24,
            out_cols,
            out_rows,
            ffmpeg::software::scaling::flag::Flags::BICUBIC,
        )
        .map_err(|e| open_err(path, &e.to_string()))?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            duration,
            rate,
            scaled_rows: out_rows,
            scaled_cols: out_cols,
            peek_frame_idx: 0,
            end_of_stream: false,
        })
    }

    /// Seeks to `rate * peek_frame_idx` seconds and decodes the first frame
    /// at or after that position. Returns `None` once the sample position
    /// exceeds the stream duration or decoding otherwise fails.
    pub fn peek(&mut self) -> Option<Frame> {
        if self.end_of_stream {
            return None;
        }

        let seconds = self.rate * self.peek_frame_idx as f64;
        let start_av_time = (seconds * AV_TIME_BASE) as i64;
        if start_av_time > self.duration {
            self.end_of_stream = true;
            return None;
        }

        // `Input::seek` issues `avformat_seek_file` with `stream_index = -1`,
        // whose timestamp is in `AV_TIME_BASE` (microsecond) units, not the
        // stream's own time base.
        if self.ictx.seek(start_av_time, ..start_av_time).is_err() {
            self.end_of_stream = true;
            return None;
        }

        let mut frame = None;
        loop {
            let next = self.ictx.packets().next();
            let (stream, packet) = match next {
                Some(v) => v,
                None => {
                    self.end_of_stream = true;
                    break;
                }
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg::util::frame::video::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb = ffmpeg::util::frame::video::Video::empty();
                if self.scaler.run(&decoded, &mut rgb).is_ok() {
                    frame = Some(Frame {
                        width: self.scaled_cols,
                        height: self.scaled_rows,
                        data: rgb.data(0).to_vec(),
                    });
                }
                break;
            }
        }

        self.peek_frame_idx += 1;
        if frame.is_none() {
            self.end_of_stream = true;
        }
        frame
    }
}

/// Samples a video at `rate`-second intervals, scaling each frame to
/// `scaled_rows x scaled_cols` (144x144 by default).
pub fn make_thumb(path: &Path, rate: f64, scaled_rows: u32, scaled_cols: u32) -> Result<Vec<Frame>> {
    let mut sampler = VideoSampler::open(path, rate, scaled_rows, scaled_cols)?;
    let mut frames = Vec::new();
    while let Some(frame) = sampler.peek() {
        frames.push(frame);
    }
    Ok(frames)
}

/// Assembles sampled frames into a square collage: `floor(sqrt(n))`
/// frames per row, proportionally downscaled only if a full row would
/// exceed `max_image_width`, placed row-major left-to-right top-to-bottom.
pub fn make_collage(images: &[Frame], max_image_width: u32) -> Option<Frame> {
    let first = images.first()?;
    let (image_height, image_width) = (first.height, first.width);

    let images_per_row = (images.len() as f64).sqrt().floor() as u32;
    let images_per_row = images_per_row.max(1);

    let scale = if images_per_row * image_width > max_image_width {
        max_image_width as f64 / (images_per_row * image_width) as f64
    } else {
        1.0
    };
    let scaled_height = (image_height as f64 * scale).ceil() as u32;
    let scaled_width = (image_width as f64 * scale).ceil() as u32;
    let number_of_rows = (images.len() as f64 / images_per_row as f64).ceil() as u32;

    let canvas_w = (images_per_row * scaled_width) as usize;
    let canvas_h = (number_of_rows * scaled_height) as usize;
    let mut canvas = vec![0u8; canvas_w * canvas_h * 3];

    let mut i = 0usize;
    let mut current_height = 0u32;
    for _y in 0..number_of_rows {
        let mut current_width = 0u32;
        for _x in 0..images_per_row {
            if i >= images.len() {
                break;
            }
            let img = &images[i];
            let resized = if scaled_width != img.width || scaled_height != img.height {
                resize_rgb(img, scaled_width, scaled_height)
            } else {
                img.data.clone()
            };

            for row in 0..scaled_height as usize {
                let src_off = row * scaled_width as usize * 3;
                let dst_y = current_height as usize + row;
                let dst_off = (dst_y * canvas_w + current_width as usize) * 3;
                canvas[dst_off..dst_off + scaled_width as usize * 3]
                    .copy_from_slice(&resized[src_off..src_off + scaled_width as usize * 3]);
            }

            i += 1;
            current_width += scaled_width;
        }
        current_height += scaled_height;
    }

    Some(Frame {
        width: canvas_w as u32,
        height: canvas_h as u32,
        data: canvas,
    })
}

fn resize_rgb(img: &Frame, width: u32, height: u32) -> Vec<u8> {
    use fast_image_resize::{self as fir, images::Image as FirImage};

    let src =
        match FirImage::from_vec_u8(img.width, img.height, img.data.clone(), fir::PixelType::U8x3)
        {
            Ok(s) => s,
            Err(_) => return img.data.clone(),
        };
    let mut dst = FirImage::new(width, height, fir::PixelType::U8x3);
    let options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Box));
    if fir::Resizer::new().resize(&src, &mut dst, &options).is_err() {
        return img.data.clone();
    }
    dst.buffer().to_vec()
}

/// Classifies a single frame's dominant color: strict per-pixel majority
/// among R/G/B (else luminance), then an image-level classification with
/// a percentage-margin tie-break against a flat luminance winner.
pub fn dominant_color(frame: &Frame, resize: u32, min_percent_diff_of_rgb: u32) -> ColorType {
    let resized = resize_rgb(frame, resize, resize);
    let (mut b_count, mut g_count, mut r_count, mut l_count) = (0i64, 0i64, 0i64, 0i64);

    for px in resized.chunks_exact(3) {
        let (b, g, r) = (px[0] as i32, px[1] as i32, px[2] as i32);
        if b > r && b > g {
            b_count += 1;
        } else if g > r && g > b {
            g_count += 1;
        } else if r > g && r > b {
            r_count += 1;
        } else {
            l_count += 1;
        }
    }

    let total_pixels = (resize * resize) as i64;
    if l_count >= b_count && l_count >= g_count && l_count >= r_count {
        return ColorType::L;
    }

    let mpd = total_pixels * min_percent_diff_of_rgb as i64 / 100;
    if b_count - mpd > r_count && b_count - mpd > g_count {
        ColorType::B
    } else if g_count - mpd > r_count && g_count - mpd > b_count {
        ColorType::G
    } else if r_count - mpd > g_count && r_count - mpd > b_count {
        ColorType::R
    } else {
        ColorType::N
    }
}

/// Temporal dominant-color hash: bit `63-i` is set when sampled frame `i`'s
/// dominant color matches the fixed expected-color map. Frames beyond
/// index 63 are silently ignored (inherited from the original tool).
pub fn dominant_color_hash(images: &[Frame], resize: u32, min_percent_diff_of_rgb: u32) -> u64 {
    let mut hash = 0u64;
    for (i, img) in images.iter().enumerate().take(DOMINANT_COLOR_MAP.len()) {
        let color = dominant_color(img, resize, min_percent_diff_of_rgb);
        if color == DOMINANT_COLOR_MAP[i] {
            hash |= 1 << (DOMINANT_COLOR_MAP.len() - i - 1);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(w: u32, h: u32, bgr: [u8; 3]) -> Frame {
        let mut data = vec![0u8; (w * h * 3) as usize];
        for px in data.chunks_exact_mut(3) {
            px.copy_from_slice(&bgr);
        }
        Frame {
            width: w,
            height: h,
            data,
        }
    }

    #[test]
    fn dominant_color_picks_strict_majority_channel() {
        // BGR: blue=10, green=10, red=220 -> a genuinely red pixel.
        let frame = solid_frame(16, 16, [10, 10, 220]);
        assert_eq!(dominant_color(&frame, 16, 10), ColorType::R);
    }

    #[test]
    fn dominant_color_falls_back_to_luminance_on_gray() {
        let frame = solid_frame(16, 16, [128, 128, 128]);
        assert_eq!(dominant_color(&frame, 16, 10), ColorType::L);
    }

    #[test]
    fn collage_assembles_square_grid() {
        let frames = vec![
            solid_frame(8, 8, [255, 0, 0]),
            solid_frame(8, 8, [0, 255, 0]),
            solid_frame(8, 8, [0, 0, 255]),
            solid_frame(8, 8, [255, 255, 0]),
        ];
        let collage = make_collage(&frames, 1024).unwrap();
        assert_eq!(collage.width, 16);
        assert_eq!(collage.height, 16);
    }

    #[test]
    fn dominant_color_hash_ignores_samples_past_64() {
        let frames: Vec<Frame> = (0..70).map(|_| solid_frame(4, 4, [128, 128, 128])).collect();
        let hash = dominant_color_hash(&frames, 16, 10);
        // All 70 samples are flat gray -> ColorType::L, matching the map's
        // last 16 entries (indices 48..64) but not the first 48 (R/G/B).
        assert_eq!(hash, 0xFFFF);
    }
}
