// GGUF tensor metadata consumed by the decoders

pub mod types;

pub use types::{tensor_byte_size, GgufTensorType, K_SCALE_SIZE, QK4_0, QK8_0, QK_K};

use crate::error::DequantError;

// ---------------------------------------------------------------------------
// TensorDescriptor
// ---------------------------------------------------------------------------

/// Type and shape of one tensor, as read from a GGUF tensor info entry.
///
/// The file reader owns parsing; this crate only needs the format tag and the
/// dimension vector to size and validate the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescriptor {
    /// Data type (quantization format).
    pub dtype: GgufTensorType,
    /// Size along each dimension, outermost first.
    pub dims: Vec<u64>,
}

impl TensorDescriptor {
    pub fn new(dtype: GgufTensorType, dims: impl Into<Vec<u64>>) -> Self {
        Self {
            dtype,
            dims: dims.into(),
        }
    }

    /// Total number of elements in the tensor.
    ///
    /// Fails if there are no dimensions, any dimension is zero, or the product
    /// does not fit in `usize`.
    pub fn n_elements(&self) -> Result<usize, DequantError> {
        element_count(&self.dims)
    }

    /// Byte length the payload must have for this type and shape.
    pub fn expected_byte_len(&self) -> Result<usize, DequantError> {
        let n = self.n_elements()?;
        tensor_byte_size(self.dtype, n).ok_or_else(|| DequantError::InvalidDimensions {
            dims: self.dims.clone(),
            reason: format!("{} byte size overflows usize", self.dtype),
        })
    }
}

/// Checked product of a dimension vector.
pub fn element_count(dims: &[u64]) -> Result<usize, DequantError> {
    let invalid = |reason: &str| DequantError::InvalidDimensions {
        dims: dims.to_vec(),
        reason: reason.to_string(),
    };

    if dims.is_empty() {
        return Err(invalid("no dimensions"));
    }
    if dims.contains(&0) {
        return Err(invalid("zero-sized dimension"));
    }

    let mut n: usize = 1;
    for &d in dims {
        let d = usize::try_from(d).map_err(|_| invalid("dimension exceeds usize"))?;
        n = n
            .checked_mul(d)
            .ok_or_else(|| invalid("element count overflows usize"))?;
    }
    Ok(n)
}
