// Decode tuning: when to fan a tensor's blocks out over the rayon pool.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Env var overriding [`DequantConfig::parallel_min_blocks`].
pub const ENV_PARALLEL_MIN_BLOCKS: &str = "STRATA_DEQUANT_PARALLEL_MIN_BLOCKS";

/// Env var overriding [`DequantConfig::blocks_per_task`].
pub const ENV_BLOCKS_PER_TASK: &str = "STRATA_DEQUANT_BLOCKS_PER_TASK";

const DEFAULT_PARALLEL_MIN_BLOCKS: usize = 4096;
const DEFAULT_BLOCKS_PER_TASK: usize = 256;

/// Dequantization settings.
///
/// Parallel and serial decoding produce bit-identical output; these knobs only
/// trade thread overhead against throughput for large tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DequantConfig {
    /// Tensors with at least this many blocks are decoded in parallel.
    /// 0 disables parallel decoding.
    pub parallel_min_blocks: usize,
    /// Number of consecutive blocks handled by one parallel task.
    pub blocks_per_task: usize,
}

impl Default for DequantConfig {
    fn default() -> Self {
        Self {
            parallel_min_blocks: DEFAULT_PARALLEL_MIN_BLOCKS,
            blocks_per_task: DEFAULT_BLOCKS_PER_TASK,
        }
    }
}

impl DequantConfig {
    /// Always decode on the calling thread.
    pub fn serial() -> Self {
        Self {
            parallel_min_blocks: 0,
            ..Self::default()
        }
    }

    /// Defaults, overridden by `STRATA_DEQUANT_PARALLEL_MIN_BLOCKS` and
    /// `STRATA_DEQUANT_BLOCKS_PER_TASK` when set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            parallel_min_blocks: env_usize(ENV_PARALLEL_MIN_BLOCKS)
                .unwrap_or(defaults.parallel_min_blocks),
            blocks_per_task: env_usize(ENV_BLOCKS_PER_TASK).unwrap_or(defaults.blocks_per_task),
        }
    }

    /// Whether a tensor of `n_blocks` blocks should be decoded in parallel.
    ///
    /// Always false when the crate is built without the `parallel` feature.
    pub fn use_parallel(&self, n_blocks: usize) -> bool {
        cfg!(feature = "parallel")
            && self.parallel_min_blocks > 0
            && n_blocks >= self.parallel_min_blocks
    }

    /// Blocks per parallel task, never zero.
    pub fn blocks_per_task(&self) -> usize {
        self.blocks_per_task.max(1)
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring {}={:?}: not a non-negative integer", key, raw);
            None
        }
    }
}
