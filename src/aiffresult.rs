use core::result;
use std::sync::Arc;
use thiserror::Error;

use crate::ChunkId;

/// The part of the format that can't be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Unsupported {
    /// Sample bit depth without a sample codec. Supported depths are 8, 16, 24 and 32.
    #[error("{0}-bit samples")]
    BitDepth(u16),
    /// AIFF-C compression type without a sample codec.
    #[error("compression type {}", String::from_utf8_lossy(.0))]
    Compression(ChunkId),
}

/// Error values.
///
/// Errors are cheap to clone, so that a decoder can return the same failure
/// from every call after it has failed once.
#[derive(Debug, Clone, Error)]
pub enum AiffError {
    /// The stream doesn't start with "FORM" or the form type isn't "AIFF" or "AIFC".
    /// The inner value is the offending four byte literal.
    #[error("unsupported container {}", String::from_utf8_lossy(.0))]
    UnsupportedContainer(ChunkId),
    /// The sample format has no codec.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(Unsupported),
    /// A structural read ended before its declared size.
    #[error("truncated {0}")]
    Truncated(&'static str),
    /// A field is inconsistent with the rest of the stream.
    #[error("malformed {0}")]
    Malformed(&'static str),
    /// The encoder was used after it was closed.
    #[error("invalid write state")]
    InvalidWriteState,
    /// The data doesn't fit in the 32-bit size fields.
    #[error("size too large")]
    SizeTooLarge,
    /// Error from the underlying stream.
    #[error(transparent)]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for AiffError {
    fn from(e: std::io::Error) -> Self {
        AiffError::Io(Arc::new(e))
    }
}

/// Library Result type.
pub type AiffResult<T> = result::Result<T, AiffError>;
