//! Error types for the wrapping engine
//!
//! None of these ever reach a page: the string entry points on
//! [`Wrapper`](crate::Wrapper) log them and hand back the input unchanged.
//! They exist so the internal pipeline can use `?` and so callers of the
//! `try_*` variants can see why a fragment was left alone.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WrapError {
    /// The fragment could not be turned into a usable tree
    #[error("Fragment parse failed: {0}")]
    Parse(String),

    #[error("HTML serialization failed: {0}")]
    Serialize(#[from] std::io::Error),

    #[error("Serializer produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Fragment exceeds the configured `max_input_bytes`
    #[error("Fragment of {len} bytes exceeds the {limit} byte limit")]
    InputTooLarge { len: usize, limit: usize },
}
