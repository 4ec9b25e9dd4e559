use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy, mirroring the stable negative ordinals the original
/// tool used as process exit codes (starting at -500).
#[derive(Debug, Error)]
pub enum Error {
    #[error("index {index} out of range for hash of size {size}")]
    OutOfRange { index: usize, size: usize },

    #[error("create folder \"{path}\" failed: {source}")]
    MkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("open file \"{path}\" failed: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode image \"{path}\" failed: {source}")]
    DecodeImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("read file \"{path}\" failed: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("init db \"{path}\" failed: {source}")]
    InitDb {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("insert db record failed: {source}")]
    InsertDb {
        #[source]
        source: rusqlite::Error,
    },

    #[error("delete db record failed: {source}")]
    DeleteDb {
        #[source]
        source: rusqlite::Error,
    },

    #[error("clear db records failed: {source}")]
    ClearDb {
        #[source]
        source: rusqlite::Error,
    },

    #[error("prune db records failed: {source}")]
    PruneDb {
        #[source]
        source: rusqlite::Error,
    },

    #[error("path \"{path}\" not exists")]
    NotExists { path: PathBuf },

    #[error("unknown file type for \"{path}\"")]
    UnknownType { path: PathBuf },

    #[error("invalid parameter: {message}")]
    ParamInvalid { message: String },

    #[error("make thumbnail for \"{path}\" failed")]
    MakeThumb { path: PathBuf },
}

impl Error {
    /// Stable ordinal matching the original `errors` enum (`ERR_OUT_OF_RANGE = -500` …).
    pub fn code(&self) -> i32 {
        match self {
            Error::OutOfRange { .. } => -500,
            Error::MkDir { .. } => -499,
            Error::OpenFile { .. } => -498,
            Error::DecodeImage { .. } => -497,
            Error::ReadFile { .. } => -496,
            Error::InitDb { .. } => -495,
            Error::InsertDb { .. } => -494,
            Error::DeleteDb { .. } => -493,
            Error::ClearDb { .. } => -492,
            Error::PruneDb { .. } => -491,
            Error::NotExists { .. } => -490,
            Error::UnknownType { .. } => -489,
            Error::ParamInvalid { .. } => -488,
            Error::MakeThumb { .. } => -487,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_sequential_from_500() {
        let e = Error::OutOfRange { index: 0, size: 8 };
        assert_eq!(e.code(), -500);
        let e = Error::MakeThumb {
            path: PathBuf::from("x"),
        };
        assert_eq!(e.code(), -487);
    }
}
