use thiserror::Error;

use crate::gguf::GgufTensorType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DequantError {
    #[error("Unknown tensor type: {0}")]
    UnknownTensorType(u32),

    #[error("Unsupported tensor format: {0}")]
    UnsupportedFormat(GgufTensorType),

    #[error("Dequantization not yet implemented for {0}")]
    NotYetImplemented(GgufTensorType),

    #[error("Size mismatch for {dtype} tensor: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        dtype: GgufTensorType,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid dimensions {dims:?}: {reason}")]
    InvalidDimensions { dims: Vec<u64>, reason: String },

    #[error("Decoder conflict: {dtype} is already handled by '{existing}'")]
    DecoderConflict {
        dtype: GgufTensorType,
        existing: &'static str,
    },

    #[error("IO error: {0}")]
    Io(String),
}

impl DequantError {
    /// True for errors meaning "no usable decoder for this format".
    ///
    /// Callers treat `UnsupportedFormat` and `NotYetImplemented` the same way;
    /// the distinction only matters for tracking format coverage.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_) | Self::NotYetImplemented(_))
    }
}

impl From<std::io::Error> for DequantError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
