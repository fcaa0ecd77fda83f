// Tensor payload decoders: per-format block decoding and dispatch

pub mod f16;
pub mod kquant;
pub mod linear;
pub mod registry;
pub mod scales;

use std::marker::PhantomData;

use crate::config::DequantConfig;
use crate::error::DequantError;
use crate::gguf::{element_count, tensor_byte_size, GgufTensorType, QK_K};

pub use f16::{bf16_to_f32, f16_to_f32};
pub use registry::DecoderRegistry;
pub use scales::{get_scale_min_k4, unpack_scale_min_k4};

/// Largest block (in elements) of any decodable format.
const MAX_BLOCK_ELEMS: usize = QK_K;

// ---------------------------------------------------------------------------
// Decoder: one instance per tensor format
// ---------------------------------------------------------------------------

/// Turns a raw tensor payload of one format into f32 values.
///
/// Decoders are stateless, so a single instance may decode many tensors
/// concurrently.
pub trait Decoder: Send + Sync {
    /// Short name for logs and conflict reports.
    fn name(&self) -> &'static str;

    /// The tensor format this decoder handles.
    fn dtype(&self) -> GgufTensorType;

    fn can_decode(&self, dtype: GgufTensorType) -> bool {
        dtype == self.dtype()
    }

    /// Decode `raw` into `out`, which holds exactly the tensor's elements.
    ///
    /// Fails with `SizeMismatch` if `raw` is not the exact payload length for
    /// `out.len()` elements; nothing is written in that case.
    fn decode_into(
        &self,
        raw: &[u8],
        out: &mut [f32],
        config: &DequantConfig,
    ) -> Result<(), DequantError>;

    /// Validate `raw` against `dims` and decode it into a new buffer.
    fn decode(&self, dims: &[u64], raw: &[u8]) -> Result<Vec<f32>, DequantError> {
        let n = validate_payload(self.dtype(), dims, raw)?;
        let mut out = vec![0.0f32; n];
        self.decode_into(raw, &mut out, &DequantConfig::default())?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a payload against a shape and return the element count.
///
/// Order: dimension product, super-block alignment (K-quants), byte length.
pub fn validate_payload(
    dtype: GgufTensorType,
    dims: &[u64],
    raw: &[u8],
) -> Result<usize, DequantError> {
    let n = element_count(dims)?;
    check_lengths(dtype, raw.len(), n).map_err(|e| match e {
        DequantError::InvalidDimensions { reason, .. } => DequantError::InvalidDimensions {
            dims: dims.to_vec(),
            reason,
        },
        other => other,
    })?;
    Ok(n)
}

/// Check that `raw_len` bytes hold exactly `n_elements` values of `dtype`.
pub(crate) fn check_lengths(
    dtype: GgufTensorType,
    raw_len: usize,
    n_elements: usize,
) -> Result<(), DequantError> {
    let bs = dtype.block_size();
    if !dtype.allows_partial_block() && n_elements % bs != 0 {
        return Err(DequantError::InvalidDimensions {
            dims: vec![n_elements as u64],
            reason: format!(
                "{} element count {} is not a multiple of the {}-element super-block",
                dtype, n_elements, bs
            ),
        });
    }

    let expected =
        tensor_byte_size(dtype, n_elements).ok_or_else(|| DequantError::InvalidDimensions {
            dims: vec![n_elements as u64],
            reason: format!("{} byte size overflows usize", dtype),
        })?;
    if raw_len != expected {
        return Err(DequantError::SizeMismatch {
            dtype,
            expected,
            actual: raw_len,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// BlockFormat: byte layout of one block
// ---------------------------------------------------------------------------

/// Fixed-stride block layout of a decodable format.
///
/// Geometry comes from the format descriptors so decoders and size checks
/// cannot disagree.
pub trait BlockFormat: Send + Sync + 'static {
    const DTYPE: GgufTensorType;
    const NAME: &'static str = Self::DTYPE.name();
    const BLOCK_ELEMS: usize = Self::DTYPE.block_size();
    const BLOCK_BYTES: usize = Self::DTYPE.type_size();

    /// Decode one block. `block.len() == BLOCK_BYTES`, `out.len() == BLOCK_ELEMS`.
    fn decode_block(block: &[u8], out: &mut [f32]);
}

/// A [`Decoder`] that walks a payload block by block using `F`'s layout.
pub struct BlockDecoder<F: BlockFormat> {
    _format: PhantomData<fn() -> F>,
}

impl<F: BlockFormat> BlockDecoder<F> {
    pub const fn new() -> Self {
        Self {
            _format: PhantomData,
        }
    }
}

impl<F: BlockFormat> Default for BlockDecoder<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: BlockFormat> Decoder for BlockDecoder<F> {
    fn name(&self) -> &'static str {
        F::NAME
    }

    fn dtype(&self) -> GgufTensorType {
        F::DTYPE
    }

    fn decode_into(
        &self,
        raw: &[u8],
        out: &mut [f32],
        config: &DequantConfig,
    ) -> Result<(), DequantError> {
        check_lengths(F::DTYPE, raw.len(), out.len())?;
        decode_blocks::<F>(raw, out, config);
        Ok(())
    }
}

/// Decode a length-checked payload, in parallel when the config allows.
fn decode_blocks<F: BlockFormat>(raw: &[u8], out: &mut [f32], config: &DequantConfig) {
    let n_blocks = out.len().div_ceil(F::BLOCK_ELEMS);
    if config.use_parallel(n_blocks) {
        // No task spans more than the whole tensor, so chunk sizes stay within
        // the payload length.
        let per_task = config.blocks_per_task().min(n_blocks);
        decode_parallel::<F>(raw, out, per_task);
    } else {
        decode_serial::<F>(raw, out);
    }
}

fn decode_serial<F: BlockFormat>(raw: &[u8], out: &mut [f32]) {
    for (block, dst) in raw
        .chunks_exact(F::BLOCK_BYTES)
        .zip(out.chunks_mut(F::BLOCK_ELEMS))
    {
        if dst.len() == F::BLOCK_ELEMS {
            F::decode_block(block, dst);
        } else {
            // Tail block: stored in full, only the first dst.len() values are live.
            let mut tmp = [0.0f32; MAX_BLOCK_ELEMS];
            let tmp = &mut tmp[..F::BLOCK_ELEMS];
            F::decode_block(block, tmp);
            dst.copy_from_slice(&tmp[..dst.len()]);
        }
    }
}

/// Each task owns `blocks_per_task` whole blocks of input and the matching
/// disjoint output range, so no synchronization is needed.
#[cfg(feature = "parallel")]
fn decode_parallel<F: BlockFormat>(raw: &[u8], out: &mut [f32], blocks_per_task: usize) {
    use rayon::prelude::*;

    raw.par_chunks(F::BLOCK_BYTES * blocks_per_task)
        .zip(out.par_chunks_mut(F::BLOCK_ELEMS * blocks_per_task))
        .for_each(|(raw, out)| decode_serial::<F>(raw, out));
}

#[cfg(not(feature = "parallel"))]
fn decode_parallel<F: BlockFormat>(raw: &[u8], out: &mut [f32], _blocks_per_task: usize) {
    decode_serial::<F>(raw, out);
}

// ---------------------------------------------------------------------------
// PendingDecoder: claims a format without decoding it
// ---------------------------------------------------------------------------

/// Placeholder for a format whose layout is known but whose dequantization
/// is not written yet. Always fails with `NotYetImplemented`.
pub struct PendingDecoder {
    dtype: GgufTensorType,
}

impl PendingDecoder {
    pub const fn new(dtype: GgufTensorType) -> Self {
        Self { dtype }
    }
}

impl Decoder for PendingDecoder {
    fn name(&self) -> &'static str {
        "pending"
    }

    fn dtype(&self) -> GgufTensorType {
        self.dtype
    }

    fn decode_into(
        &self,
        _raw: &[u8],
        _out: &mut [f32],
        _config: &DequantConfig,
    ) -> Result<(), DequantError> {
        Err(DequantError::NotYetImplemented(self.dtype))
    }
}

/// Sign-extend the low `bits` bits of `code` (two's complement).
#[inline]
pub(crate) fn signed_code(code: u8, bits: u32) -> i32 {
    let code = code as i32;
    let half = 1 << (bits - 1);
    if code < half {
        code
    } else {
        code - (1 << bits)
    }
}
