// GGML tensor type tags and per-format block geometry

use crate::error::DequantError;

// ---------------------------------------------------------------------------
// GGML tensor type IDs (matches ggml_type enum in ggml.h)
// ---------------------------------------------------------------------------

/// Tensor data types that can appear in a GGUF file.
///
/// The discriminant values match the GGML type IDs. Every ID is listed so the
/// type field can be parsed and named even when no decoder handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum GgufTensorType {
    F32 = 0,
    F16 = 1,
    Q4_0 = 2,
    Q4_1 = 3,
    // Q4_2 = 4 (removed)
    // Q4_3 = 5 (removed)
    Q5_0 = 6,
    Q5_1 = 7,
    Q8_0 = 8,
    Q8_1 = 9,
    Q2K = 10,
    Q3K = 11,
    Q4K = 12,
    Q5K = 13,
    Q6K = 14,
    Q8K = 15,
    IQ2XXS = 16,
    IQ2XS = 17,
    IQ3XXS = 18,
    IQ1S = 19,
    IQ4NL = 20,
    IQ3S = 21,
    IQ2S = 22,
    IQ4XS = 23,
    I8 = 24,
    I16 = 25,
    I32 = 26,
    I64 = 27,
    F64 = 28,
    IQ1M = 29,
    BF16 = 30,
}

/// One past the largest GGML type ID; sizes the registry's dispatch table.
pub const GGML_TYPE_COUNT: usize = 31;

impl GgufTensorType {
    /// Every known tensor type, in type-ID order.
    pub const ALL: [GgufTensorType; 29] = [
        Self::F32,
        Self::F16,
        Self::Q4_0,
        Self::Q4_1,
        Self::Q5_0,
        Self::Q5_1,
        Self::Q8_0,
        Self::Q8_1,
        Self::Q2K,
        Self::Q3K,
        Self::Q4K,
        Self::Q5K,
        Self::Q6K,
        Self::Q8K,
        Self::IQ2XXS,
        Self::IQ2XS,
        Self::IQ3XXS,
        Self::IQ1S,
        Self::IQ4NL,
        Self::IQ3S,
        Self::IQ2S,
        Self::IQ4XS,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::F64,
        Self::IQ1M,
        Self::BF16,
    ];

    /// Convert a raw u32 from a GGUF tensor info entry into a `GgufTensorType`.
    pub fn from_u32(v: u32) -> Result<Self, DequantError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.id() == v)
            .ok_or(DequantError::UnknownTensorType(v))
    }

    /// The GGML type ID.
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Number of elements per quantization block.
    ///
    /// For non-quantized types (F32, F16, etc.) the block size is 1.
    pub const fn block_size(self) -> usize {
        match self {
            Self::F32 | Self::F16 | Self::BF16 | Self::F64 => 1,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => 1,
            Self::Q4_0 | Self::Q4_1 | Self::Q5_0 | Self::Q5_1 => QK4_0,
            Self::Q8_0 | Self::Q8_1 => QK8_0,
            Self::Q2K | Self::Q3K | Self::Q4K | Self::Q5K | Self::Q6K | Self::Q8K => QK_K,
            Self::IQ4NL => 32,
            Self::IQ2XXS
            | Self::IQ2XS
            | Self::IQ3XXS
            | Self::IQ1S
            | Self::IQ3S
            | Self::IQ2S
            | Self::IQ4XS
            | Self::IQ1M => QK_K,
        }
    }

    /// Size in bytes of one quantization block.
    ///
    /// For non-quantized types this is the size of a single element.
    pub const fn type_size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F16 => 2,
            Self::BF16 => 2,
            Self::F64 => 8,
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 => 4,
            Self::I64 => 8,
            Self::Q4_0 => 2 + QK4_0 / 2,         // 18
            Self::Q4_1 => 2 * 2 + QK4_0 / 2,     // 20
            Self::Q5_0 => 2 + 4 + QK4_0 / 2,     // 22
            Self::Q5_1 => 2 * 2 + 4 + QK4_0 / 2, // 24
            Self::Q8_0 => 2 + QK8_0,             // 34
            Self::Q8_1 => 2 * 2 + QK8_0,         // 36
            // K-quant sizes (QK_K = 256)
            Self::Q2K => 2 * 2 + QK_K / 16 + QK_K / 4, // 84
            Self::Q3K => 2 + QK_K / 4 + QK_K / 8 + K_SCALE_SIZE, // 110
            Self::Q4K => 2 * 2 + K_SCALE_SIZE + QK_K / 2, // 144
            Self::Q5K => 2 * 2 + K_SCALE_SIZE + QK_K / 8 + QK_K / 2, // 176
            Self::Q6K => 2 + QK_K / 16 + 3 * QK_K / 4, // 210
            Self::Q8K => 4 + QK_K + QK_K / 16 * 2, // 292
            Self::IQ2XXS => 2 + QK_K / 8 * 2,
            Self::IQ2XS => 2 + QK_K / 8 * 2 + QK_K / 32,
            Self::IQ3XXS => 2 + 3 * (QK_K / 8),
            Self::IQ1S => 2 + QK_K / 8 + QK_K / 16,
            Self::IQ4NL => 2 + 32 / 2,
            Self::IQ3S => 2 + QK_K / 4 + QK_K / 32 + QK_K / 8 + QK_K / 64,
            Self::IQ2S => 2 + QK_K / 4 + QK_K / 16,
            Self::IQ4XS => 2 + 2 + QK_K / 64 + QK_K / 2,
            Self::IQ1M => QK_K / 8 + QK_K / 16 + QK_K / 32,
        }
    }

    /// True for the 256-element super-block formats.
    pub const fn is_k_quant(self) -> bool {
        matches!(
            self,
            Self::Q2K | Self::Q3K | Self::Q4K | Self::Q5K | Self::Q6K | Self::Q8K
        )
    }

    /// Whether a tensor may end in a block holding fewer live elements than
    /// `block_size()`.
    ///
    /// Linear block formats reserve a full block for the tail; K-quant
    /// tensors must be a whole number of super-blocks.
    pub const fn allows_partial_block(self) -> bool {
        !self.is_k_quant()
    }

    /// Human-readable name for the tensor type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "F32",
            Self::F16 => "F16",
            Self::Q4_0 => "Q4_0",
            Self::Q4_1 => "Q4_1",
            Self::Q5_0 => "Q5_0",
            Self::Q5_1 => "Q5_1",
            Self::Q8_0 => "Q8_0",
            Self::Q8_1 => "Q8_1",
            Self::Q2K => "Q2_K",
            Self::Q3K => "Q3_K",
            Self::Q4K => "Q4_K",
            Self::Q5K => "Q5_K",
            Self::Q6K => "Q6_K",
            Self::Q8K => "Q8_K",
            Self::IQ2XXS => "IQ2_XXS",
            Self::IQ2XS => "IQ2_XS",
            Self::IQ3XXS => "IQ3_XXS",
            Self::IQ1S => "IQ1_S",
            Self::IQ4NL => "IQ4_NL",
            Self::IQ3S => "IQ3_S",
            Self::IQ2S => "IQ2_S",
            Self::IQ4XS => "IQ4_XS",
            Self::I8 => "I8",
            Self::I16 => "I16",
            Self::I32 => "I32",
            Self::I64 => "I64",
            Self::F64 => "F64",
            Self::IQ1M => "IQ1_M",
            Self::BF16 => "BF16",
        }
    }

    /// Look up a type by its display name, case-insensitively (`"q4_k"`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for GgufTensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of elements per Q4_0 / Q4_1 / Q5_0 / Q5_1 block.
pub const QK4_0: usize = 32;

/// Number of elements per Q8_0 / Q8_1 block.
pub const QK8_0: usize = 32;

/// Number of elements per K-quant super-block.
pub const QK_K: usize = 256;

/// Size of the packed scale/min array in Q3_K, Q4_K and Q5_K blocks.
pub const K_SCALE_SIZE: usize = 12;

/// Compute the number of bytes needed to store `n_elements` values of the
/// given tensor type.
///
/// Number of blocks is `ceil(n_elements / block_size)`; returns `None` if the
/// byte count does not fit in `usize`.
pub fn tensor_byte_size(dtype: GgufTensorType, n_elements: usize) -> Option<usize> {
    let n_blocks = n_elements.div_ceil(dtype.block_size());
    n_blocks.checked_mul(dtype.type_size())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
