pub mod config;
pub mod dequant;
pub mod error;
pub mod gguf;
pub mod quant;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::DequantConfig;
pub use dequant::{dequantize, Dequantizer};
pub use error::DequantError;
pub use gguf::{GgufTensorType, TensorDescriptor};
pub use quant::{f16_to_f32, Decoder, DecoderRegistry};
