//! Shared helpers for the strata-dequant binary.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::error::DequantError;

/// Initialize tracing/logging to stderr.
///
/// If `disable` is true, no output is produced.
/// Otherwise respects `RUST_LOG` env var, defaulting to WARN.
pub fn init_logging(disable: bool) {
    use tracing_subscriber::EnvFilter;

    if disable {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a comma-separated dimension list such as `4096,32`.
pub fn parse_dims(s: &str) -> Result<Vec<u64>, String> {
    s.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u64>()
                .map_err(|_| format!("Invalid dimension '{}' in '{}'", part, s))
        })
        .collect()
}

/// A read-only memory map of a file holding raw tensor bytes.
pub struct PayloadFile {
    _file: File,
    mmap: memmap2::Mmap,
}

impl PayloadFile {
    pub fn open(path: &Path) -> Result<Self, DequantError> {
        let file = File::open(path).map_err(|e| {
            DequantError::Io(format!("Failed to open '{}': {}", path.display(), e))
        })?;
        // SAFETY: the file stays open for the lifetime of the map and is only
        // read through it.
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file) }.map_err(|e| {
            DequantError::Io(format!("Failed to map '{}': {}", path.display(), e))
        })?;
        tracing::debug!("mapped {} ({} bytes)", path.display(), mmap.len());
        Ok(Self { _file: file, mmap })
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// `len` bytes starting at `offset`, without copying.
    pub fn slice(&self, offset: u64, len: usize) -> Result<&[u8], DequantError> {
        let out_of_bounds = || {
            DequantError::Io(format!(
                "Requested {} bytes at offset {} but the file is {} bytes",
                len,
                offset,
                self.mmap.len()
            ))
        };
        let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
        self.mmap.get(start..end).ok_or_else(out_of_bounds)
    }
}

/// Summary statistics of a dequantized tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorSummary {
    pub count: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    /// The first values, in row-major order.
    pub head: Vec<f32>,
}

impl TensorSummary {
    /// NaN values are skipped by `min`/`max` but propagate into `mean`.
    pub fn new(values: &[f32], head: usize) -> Self {
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let sum: f64 = values.iter().map(|&v| v as f64).sum();
        let mean = if values.is_empty() {
            0.0
        } else {
            sum / values.len() as f64
        };
        Self {
            count: values.len(),
            min,
            max,
            mean,
            head: values[..head.min(values.len())].to_vec(),
        }
    }
}
