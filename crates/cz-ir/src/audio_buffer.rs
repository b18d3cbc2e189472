//! Multichannel f32 sample buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Maximum number of audio channels per buffer.
pub const MAX_CHANNELS: u16 = 8;

/// Default block size for audio processing.
pub const BLOCK_SIZE: usize = 256;

/// A fixed-length multichannel f32 sample buffer in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
/// Used for loaded samples, audio clips and rendered bounces alike.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    frames: usize,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: usize, sample_rate: u32) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            frames,
            sample_rate,
        }
    }

    /// Wrap a single channel of samples.
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        let frames = samples.len();
        Self {
            data: samples,
            channels: 1,
            frames,
            sample_rate,
        }
    }

    /// Build a buffer from per-channel planes. Planes shorter than the
    /// first are zero-padded.
    pub fn from_planes(planes: &[Vec<f32>], sample_rate: u32) -> Self {
        let frames = planes.first().map_or(0, Vec::len);
        let mut buf = Self::new(planes.len() as u16, frames, sample_rate);
        for (ch, plane) in planes.iter().enumerate().take(buf.channels as usize) {
            let n = plane.len().min(frames);
            buf.channel_mut(ch as u16)[..n].copy_from_slice(&plane[..n]);
        }
        buf
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns true if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.frames;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Sample at `frame` on channel `ch`. Mono buffers answer every
    /// channel; out-of-range frames read as silence.
    pub fn sample(&self, ch: u16, frame: usize) -> f32 {
        if frame >= self.frames {
            return 0.0;
        }
        let ch = if ch >= self.channels { 0 } else { ch };
        self.data[ch as usize * self.frames + frame]
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }
}
