pub mod ahash;
pub mod common;
pub mod dhash;
pub mod dwt;
pub mod phash;
pub mod video;
pub mod whash;

use std::path::Path;

pub use whash::WhashOptions;

use crate::error::{Error, Result};
use crate::hashval::HashVal;

/// Which hashing algorithm to run over a file's spatial content.
/// `WHash` matches the original tool's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    AHash,
    PHash,
    DHash,
    WHash,
}

impl Default for HashType {
    fn default() -> Self {
        Self::WHash
    }
}

/// The kind of file a path resolves to, driving which pipeline the
/// unified hasher dispatches through. Anything not recognized as an
/// image or video is `Other` and is skipped by the CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Image,
    Video,
    Other,
}

/// Extensions the original tool recognizes as image/video inputs.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp", "gif",
];
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "m4v", "3gp",
];

/// Classify a path by its lowercased extension against the built-in
/// image/video extension sets.
pub fn file_type_of(path: &Path) -> FileType {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_ascii_lowercase(),
        None => return FileType::Other,
    };
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        FileType::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        FileType::Video
    } else {
        FileType::Other
    }
}

/// Facade over the four image hashers plus the video fingerprint
/// pipeline, carrying the `(FileType, HashType)` pair that picks which
/// algorithm runs and how its output combines with the temporal
/// dominant-color hash for video inputs.
pub struct Hasher {
    file_type: FileType,
    hash_type: HashType,
    whash_opts: WhashOptions,
}

impl Hasher {
    pub fn new(file_type: FileType, hash_type: HashType) -> Self {
        Self {
            file_type,
            hash_type,
            whash_opts: WhashOptions::default(),
        }
    }

    /// Compute the combined 64-bit fingerprint for `path`.
    ///
    /// Image path: decode to grayscale, run the selected hasher, return
    /// its `uint64()`. Video path: sample frames, hash the collage
    /// (spatial) and the dominant-color sequence (temporal), return
    /// their XOR. `FileType::Other` returns 0 without error — callers
    /// are expected to have already filtered these out.
    pub fn hash(&self, path: &Path) -> Result<u64> {
        match self.file_type {
            FileType::Image => self.hash_image(path),
            FileType::Video => self.hash_video(path),
            FileType::Other => Ok(0),
        }
    }

    fn hash_image(&self, path: &Path) -> Result<u64> {
        let hv = self.image_hash::<8>(path)?;
        Ok(hv.uint64())
    }

    fn image_hash<const N: usize>(&self, path: &Path) -> Result<HashVal<N>> {
        match self.hash_type {
            HashType::AHash => ahash::hash(path),
            HashType::PHash => phash::hash(path),
            HashType::DHash => dhash::hash(path),
            HashType::WHash => whash::hash(path, &self.whash_opts),
        }
    }

    fn hash_video(&self, path: &Path) -> Result<u64> {
        let frames = video::make_thumb(path, 1.0, 144, 144)?;
        if frames.is_empty() {
            return Err(Error::MakeThumb {
                path: path.to_path_buf(),
            });
        }

        let temporal = video::dominant_color_hash(&frames, 16, 10);

        let collage = video::make_collage(&frames, 1024).ok_or_else(|| Error::MakeThumb {
            path: path.to_path_buf(),
        })?;
        let spatial = self.collage_hash(&collage)?;

        Ok(spatial ^ temporal)
    }

    fn collage_hash(&self, collage: &video::Frame) -> Result<u64> {
        let gray = common::bgr_to_gray(&collage.data);
        let collage_path = Path::new("<video collage>");
        let hv: HashVal<8> = match self.hash_type {
            HashType::AHash => ahash::hash_buffer(&gray, collage.width, collage.height, collage_path)?,
            HashType::PHash => phash::hash_buffer(&gray, collage.width, collage.height, collage_path)?,
            HashType::DHash => dhash::hash_buffer(&gray, collage.width, collage.height, collage_path)?,
            HashType::WHash => whash::hash_buffer(
                &gray,
                collage.width,
                collage.height,
                collage_path,
                &self.whash_opts,
            )?,
        };
        Ok(hv.uint64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn file_type_classification() {
        assert_eq!(file_type_of(&PathBuf::from("a.JPG")), FileType::Image);
        assert_eq!(file_type_of(&PathBuf::from("a.mp4")), FileType::Video);
        assert_eq!(file_type_of(&PathBuf::from("a.txt")), FileType::Other);
        assert_eq!(file_type_of(&PathBuf::from("noext")), FileType::Other);
    }

    #[test]
    fn other_file_type_hashes_to_zero() {
        let h = Hasher::new(FileType::Other, HashType::WHash);
        let v = h.hash(&PathBuf::from("whatever")).unwrap();
        assert_eq!(v, 0);
    }
}
