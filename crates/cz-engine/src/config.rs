//! Engine configuration.

use std::time::Duration;

/// Tunables shared by the transport, the render thread and offline renders.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Frames rendered per block by the real-time render thread
    pub block_size: usize,
    /// Cadence of the playhead poller
    pub poll_interval: Duration,
    /// Tail added after the last note for instruments without a release
    pub sampler_tail_seconds: f64,
    /// Longest offline render accepted
    pub max_render_seconds: f64,
    /// Seed for noise sources, so renders are reproducible
    pub noise_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: cz_ir::BLOCK_SIZE,
            poll_interval: Duration::from_millis(16),
            sampler_tail_seconds: 0.5,
            max_render_seconds: 600.0,
            noise_seed: 0x5EED,
        }
    }
}
