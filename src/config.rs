//! Stream configuration applied by `prepare`.

use serde::{Deserialize, Serialize};

use crate::error::NoiseLabError;

/// Sample rate, maximum block size and channel count for a stream.
///
/// Changing any of these is a configuration event: every component is
/// re-prepared before further samples are produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub block_size: usize,
    /// 1 (mono) or 2 (stereo).
    pub channels: usize,
}

impl EngineConfig {
    pub fn new(sample_rate: f64, block_size: usize) -> Self {
        EngineConfig {
            sample_rate,
            block_size,
            ..Self::default()
        }
    }

    /// Reject configurations the DSP path does not define behavior for.
    pub fn validate(&self) -> Result<(), NoiseLabError> {
        let rate_ok = self.sample_rate.is_finite() && self.sample_rate > 0.0;
        if !rate_ok || self.block_size == 0 || !(1..=2).contains(&self.channels) {
            return Err(NoiseLabError::InvalidConfig {
                sample_rate: self.sample_rate,
                block_size: self.block_size,
                channels: self.channels,
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100.0,
            block_size: 512,
            channels: 2,
        }
    }
}
