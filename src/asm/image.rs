//! Raw binary program images.
//!
//! An image is a flat byte dump with no header, loaded verbatim at a base
//! address (0x0100 for CP/M `.COM` files).

use crate::cpu::MEMORY_SIZE;
use std::path::Path;
use thiserror::Error;

/// Read an image from disk, rejecting files that cannot fit in memory.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ImageError::IoError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if bytes.len() > MEMORY_SIZE {
        return Err(ImageError::TooLarge(bytes.len()));
    }

    tracing::debug!(path = %path.display(), size = bytes.len(), "loaded image");
    Ok(bytes)
}

/// Errors that can occur while reading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("cannot read {path}: {message}")]
    IoError { path: String, message: String },

    #[error("image is {0} bytes; memory holds 65536")]
    TooLarge(usize),
}
