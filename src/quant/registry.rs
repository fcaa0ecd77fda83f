// Decoder registry: maps a tensor type tag to the decoder that handles it.

use tracing::trace;

use super::kquant::{BlockQ2K, BlockQ4K, BlockQ5K, BlockQ6K, BlockQ8K};
use super::linear::{
    BlockBF16, BlockF16, BlockF32, BlockQ4_0, BlockQ4_1, BlockQ5_0, BlockQ5_1, BlockQ8_0,
    BlockQ8_1,
};
use super::{BlockDecoder, Decoder, PendingDecoder};
use crate::error::DequantError;
use crate::gguf::types::GGML_TYPE_COUNT;
use crate::gguf::GgufTensorType;

/// Registered decoders plus a type-ID-indexed dispatch table.
///
/// Decoders are kept in registration order; lookups go through the table, so
/// order never affects which decoder is chosen. Each type can be claimed by
/// at most one decoder.
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn Decoder>>,
    by_type: [Option<usize>; GGML_TYPE_COUNT],
}

impl DecoderRegistry {
    /// An empty registry. See [`DecoderRegistry::with_defaults`] for the
    /// built-in decoders.
    pub fn new() -> Self {
        Self {
            decoders: Vec::new(),
            by_type: [None; GGML_TYPE_COUNT],
        }
    }

    /// A registry holding every built-in decoder.
    ///
    /// # Panics
    ///
    /// If two built-in decoders claim the same type.
    pub fn with_defaults() -> Self {
        let defaults: Vec<Box<dyn Decoder>> = vec![
            Box::new(BlockDecoder::<BlockQ4K>::new()),
            Box::new(BlockDecoder::<BlockQ6K>::new()),
            Box::new(BlockDecoder::<BlockQ8_0>::new()),
            Box::new(BlockDecoder::<BlockF16>::new()),
            Box::new(BlockDecoder::<BlockF32>::new()),
            Box::new(BlockDecoder::<BlockQ5K>::new()),
            Box::new(BlockDecoder::<BlockQ4_0>::new()),
            Box::new(BlockDecoder::<BlockQ4_1>::new()),
            Box::new(BlockDecoder::<BlockQ5_0>::new()),
            Box::new(BlockDecoder::<BlockQ5_1>::new()),
            Box::new(BlockDecoder::<BlockBF16>::new()),
            Box::new(BlockDecoder::<BlockQ2K>::new()),
            Box::new(BlockDecoder::<BlockQ8K>::new()),
            Box::new(BlockDecoder::<BlockQ8_1>::new()),
            Box::new(PendingDecoder::new(GgufTensorType::Q3K)),
        ];

        let mut registry = Self::new();
        for decoder in defaults {
            if let Err(e) = registry.register_boxed(decoder) {
                panic!("inconsistent built-in decoder table: {}", e);
            }
        }
        registry
    }

    /// Register a decoder for every type it claims.
    ///
    /// Fails without registering anything if any of those types already has
    /// a decoder.
    pub fn register<D: Decoder + 'static>(&mut self, decoder: D) -> Result<(), DequantError> {
        self.register_boxed(Box::new(decoder))
    }

    pub fn register_boxed(&mut self, decoder: Box<dyn Decoder>) -> Result<(), DequantError> {
        let claimed: Vec<GgufTensorType> = GgufTensorType::ALL
            .iter()
            .copied()
            .filter(|&t| decoder.can_decode(t))
            .collect();

        for &dtype in &claimed {
            if let Some(idx) = self.by_type[dtype.id() as usize] {
                return Err(DequantError::DecoderConflict {
                    dtype,
                    existing: self.decoders[idx].name(),
                });
            }
        }

        let idx = self.decoders.len();
        for &dtype in &claimed {
            self.by_type[dtype.id() as usize] = Some(idx);
        }
        trace!("registered decoder '{}' for {:?}", decoder.name(), claimed);
        self.decoders.push(decoder);
        Ok(())
    }

    /// The decoder registered for `dtype`.
    pub fn get_decoder(&self, dtype: GgufTensorType) -> Result<&dyn Decoder, DequantError> {
        match self.by_type[dtype.id() as usize] {
            Some(idx) => {
                let decoder = self.decoders[idx].as_ref();
                trace!("{} -> decoder '{}'", dtype, decoder.name());
                Ok(decoder)
            }
            None => Err(DequantError::UnsupportedFormat(dtype)),
        }
    }

    /// Whether some decoder claims `dtype`.
    ///
    /// A claiming decoder may still decline with `NotYetImplemented`.
    pub fn is_supported(&self, dtype: GgufTensorType) -> bool {
        self.by_type[dtype.id() as usize].is_some()
    }

    /// All claimed types, in type-ID order.
    pub fn supported_types(&self) -> Vec<GgufTensorType> {
        GgufTensorType::ALL
            .iter()
            .copied()
            .filter(|&t| self.is_supported(t))
            .collect()
    }

    /// Number of registered decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl Default for DecoderRegistry {
    /// Same as [`DecoderRegistry::new`]: no decoders.
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field(
                "decoders",
                &self.decoders.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
