use std::io;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("permission denied for {path}: {source}")]
    NoPermission { path: PathBuf, source: io::Error },

    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed json in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no usable average power table among {tried:?}")]
    NoPowerTable { tried: Vec<PathBuf> },

    #[error("invalid stats file {path}: {reason}")]
    Persist { path: PathBuf, reason: String },
}

/// Classify an io error for `path`, splitting out EACCES/EPERM.
pub(crate) fn io_error(path: &Path, source: io::Error) -> Error {
    match source.raw_os_error() {
        Some(code) if code == libc::EACCES || code == libc::EPERM => Error::NoPermission {
            path: path.to_path_buf(),
            source,
        },
        _ => Error::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}
