// Validating dequantization entry point

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::config::DequantConfig;
use crate::error::DequantError;
use crate::gguf::TensorDescriptor;
use crate::quant::{validate_payload, DecoderRegistry};

/// Validates tensor payloads and dispatches them to the registered decoders.
///
/// Holds no per-tensor state; share one instance across threads to decode
/// many tensors concurrently.
#[derive(Debug)]
pub struct Dequantizer {
    registry: DecoderRegistry,
    config: DequantConfig,
}

impl Default for Dequantizer {
    /// Built-in decoders with the default config.
    fn default() -> Self {
        Self::new(DequantConfig::default())
    }
}

impl Dequantizer {
    /// Built-in decoders with the given config.
    pub fn new(config: DequantConfig) -> Self {
        Self::with_registry(DecoderRegistry::with_defaults(), config)
    }

    pub fn with_registry(registry: DecoderRegistry, config: DequantConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DequantConfig {
        &self.config
    }

    /// Decode one tensor payload into a row-major `Vec<f32>`.
    ///
    /// Checks, in order: the dimension product, that a decoder exists, and
    /// that `raw` has exactly the byte length the format requires. Nothing is
    /// allocated for the output until all checks pass.
    pub fn dequantize(
        &self,
        desc: &TensorDescriptor,
        raw: &[u8],
    ) -> Result<Vec<f32>, DequantError> {
        let rejected = |e: DequantError| {
            warn!("rejecting {} tensor {:?}: {}", desc.dtype, desc.dims, e);
            e
        };

        desc.n_elements().map_err(rejected)?;
        let decoder = self.registry.get_decoder(desc.dtype).map_err(rejected)?;
        let n_elements = validate_payload(desc.dtype, &desc.dims, raw).map_err(rejected)?;

        let n_blocks = n_elements.div_ceil(desc.dtype.block_size());
        debug!(
            "dequantizing {} tensor {:?}: {} elements, {} bytes, {} path",
            desc.dtype,
            desc.dims,
            n_elements,
            raw.len(),
            if self.config.use_parallel(n_blocks) {
                "parallel"
            } else {
                "serial"
            }
        );

        let mut out = vec![0.0f32; n_elements];
        decoder
            .decode_into(raw, &mut out, &self.config)
            .map_err(rejected)?;
        debug_assert_eq!(out.len(), n_elements);
        Ok(out)
    }
}

/// Decode with the built-in decoders and [`DequantConfig::from_env`].
///
/// The registry and config are built once, on first use.
pub fn dequantize(desc: &TensorDescriptor, raw: &[u8]) -> Result<Vec<f32>, DequantError> {
    static SHARED: OnceLock<Dequantizer> = OnceLock::new();
    SHARED
        .get_or_init(|| Dequantizer::new(DequantConfig::from_env()))
        .dequantize(desc, raw)
}
