//! Render graph: declared sound sources routed through channel strips.
//!
//! The synthesizers never compute samples themselves. They build an
//! [`Emission`] (sources, an optional filter stage and a gain parameter
//! with scheduled automation) and hand it to the graph with absolute
//! start and stop times. The graph evaluates every live emission one
//! frame at a time, sums them into their bus, applies the bus gain and
//! pan, and advances its own clock.
//!
//! Graph: Emission → Bus (gain, pan) → master, or Emission → master.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arrayvec::ArrayVec;
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use cz_ir::{AudioBuffer, FilterKind, Waveform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;

use crate::frame::Frame;
use crate::param::Param;

slotmap::new_key_type! {
    /// Key of a scheduled emission in the render graph.
    pub struct EmissionKey;

    /// Key of a channel strip in the render graph.
    pub struct BusKey;
}

/// A render graph shared between the control thread and the render thread.
pub type SharedGraph = Arc<Mutex<RenderGraph>>;

/// Lock a shared graph, recovering the data from a poisoned lock.
pub fn lock(graph: &SharedGraph) -> MutexGuard<'_, RenderGraph> {
    graph.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A sound source inside an emission.
#[derive(Clone, Debug)]
pub enum Source {
    /// Periodic oscillator
    Oscillator {
        waveform: Waveform,
        /// Frequency in Hz, automatable
        frequency: Param,
        /// Fixed detune as a frequency ratio
        detune: f64,
        /// Phase in cycles, 0..1
        phase: f64,
    },
    /// Uniform white noise
    Noise { rng: StdRng },
    /// Playback of a sample buffer at its native rate
    Buffer {
        buffer: Arc<AudioBuffer>,
        /// Read position in buffer frames
        position: f64,
    },
}

impl Source {
    /// An oscillator at a fixed frequency.
    pub fn oscillator(waveform: Waveform, frequency_hz: f64, detune_cents: f32) -> Self {
        Source::Oscillator {
            waveform,
            frequency: Param::new(frequency_hz as f32),
            detune: crate::frequency::cents_to_ratio(detune_cents),
            phase: 0.0,
        }
    }

    /// Seeded white noise.
    pub fn noise(seed: u64) -> Self {
        Source::Noise {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Buffer playback starting `offset_seconds` into the buffer.
    pub fn buffer(buffer: Arc<AudioBuffer>, offset_seconds: f64) -> Self {
        let position = offset_seconds.max(0.0) * buffer.sample_rate() as f64;
        Source::Buffer { buffer, position }
    }

    /// Frequency automation of an oscillator.
    pub fn frequency_mut(&mut self) -> Option<&mut Param> {
        match self {
            Source::Oscillator { frequency, .. } => Some(frequency),
            Source::Noise { .. } | Source::Buffer { .. } => None,
        }
    }

    /// Produce the next sample, or `None` once the source has run out.
    fn next(&mut self, time: f64, sample_rate: f64) -> Option<f32> {
        match self {
            Source::Oscillator {
                waveform,
                frequency,
                detune,
                phase,
            } => {
                let value = waveform_value(*waveform, *phase);
                let hz = frequency.value_at(time) as f64 * *detune;
                *phase = (*phase + hz / sample_rate).rem_euclid(1.0);
                Some(value)
            }
            Source::Noise { rng } => Some(rng.gen_range(-1.0f32..1.0)),
            Source::Buffer { buffer, position } => {
                if *position >= buffer.frames() as f64 {
                    return None;
                }
                let value = read_interpolated(buffer, *position);
                *position += buffer.sample_rate() as f64 / sample_rate;
                Some(value)
            }
        }
    }
}

fn waveform_value(waveform: Waveform, phase: f64) -> f32 {
    let v = match waveform {
        Waveform::Sine => (phase * TAU).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    };
    v as f32
}

/// Linearly interpolated read, mixing all channels down to mono.
fn read_interpolated(buffer: &AudioBuffer, position: f64) -> f32 {
    let idx = position as usize;
    let frac = (position - idx as f64) as f32;
    let channels = buffer.channels();
    let mut sum = 0.0;
    for ch in 0..channels {
        let a = buffer.sample(ch, idx);
        let b = buffer.sample(ch, idx + 1);
        sum += a + (b - a) * frac;
    }
    sum / channels as f32
}

/// Build a biquad stage, or `None` (bypass) if the coefficients are invalid.
fn build_filter(
    kind: FilterKind,
    cutoff_hz: f32,
    q: f32,
    sample_rate: u32,
) -> Option<DirectForm2Transposed<f32>> {
    let filter_type = match kind {
        FilterKind::LowPass => Type::LowPass,
        FilterKind::HighPass => Type::HighPass,
        FilterKind::BandPass => Type::BandPass,
        FilterKind::Notch => Type::Notch,
    };
    // biquad accepts q == 0 and cutoffs at Nyquist, both of which yield
    // non-finite coefficients
    if q.is_nan() || q <= 0.0 || cutoff_hz.is_nan() || cutoff_hz <= 0.0 || 2.0 * cutoff_hz >= sample_rate as f32 {
        tracing::warn!(?kind, cutoff_hz, q, sample_rate, "filter out of range, bypassing");
        return None;
    }
    match Coefficients::<f32>::from_params(
        filter_type,
        (sample_rate as f32).hz(),
        cutoff_hz.hz(),
        q,
    ) {
        Ok(coeffs) => Some(DirectForm2Transposed::<f32>::new(coeffs)),
        Err(err) => {
            tracing::warn!(?kind, cutoff_hz, q, ?err, "invalid filter, bypassing");
            None
        }
    }
}

/// One scheduled sound: sources → filter → gain → bus.
#[derive(Clone)]
pub struct Emission {
    sources: ArrayVec<Source, 2>,
    /// Scale applied to the summed sources before the filter
    source_gain: f32,
    filter: Option<DirectForm2Transposed<f32>>,
    gain: Param,
    bus: Option<BusKey>,
    start: f64,
    stop: f64,
    finished: bool,
}

impl Emission {
    /// Create an emission sounding from `start` until the hard `stop`.
    /// `bus: None` routes straight to the master output.
    pub fn new(bus: Option<BusKey>, start: f64, stop: f64) -> Self {
        Self {
            sources: ArrayVec::new(),
            source_gain: 1.0,
            filter: None,
            gain: Param::new(1.0),
            bus,
            start,
            stop: stop.max(start),
            finished: false,
        }
    }

    /// Add a source. Emissions hold at most two.
    pub fn with_source(mut self, source: Source) -> Self {
        if self.sources.try_push(source).is_err() {
            tracing::warn!("emission already has two sources, ignoring extra");
        }
        self
    }

    /// Scale the summed sources.
    pub fn with_source_gain(mut self, gain: f32) -> Self {
        self.source_gain = gain;
        self
    }

    /// Insert a filter stage. Invalid settings leave the signal unfiltered.
    pub fn with_filter(mut self, kind: FilterKind, cutoff_hz: f32, q: f32, sample_rate: u32) -> Self {
        self.filter = build_filter(kind, cutoff_hz, q, sample_rate);
        self
    }

    /// Returns true if a filter stage is active.
    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn gain(&self) -> &Param {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut Param {
        &mut self.gain
    }

    pub fn bus(&self) -> Option<BusKey> {
        self.bus
    }

    pub fn start_time(&self) -> f64 {
        self.start
    }

    pub fn stop_time(&self) -> f64 {
        self.stop
    }

    /// Move the hard stop to `time`, earlier or later.
    pub fn reschedule_stop(&mut self, time: f64) {
        self.stop = time.max(self.start);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn render(&mut self, time: f64, sample_rate: f64) -> f32 {
        if self.finished || time < self.start {
            return 0.0;
        }
        if time >= self.stop {
            self.finished = true;
            return 0.0;
        }

        let mut sum = 0.0;
        let mut live = false;
        for source in &mut self.sources {
            if let Some(v) = source.next(time, sample_rate) {
                sum += v;
                live = true;
            }
        }
        if !live {
            self.finished = true;
            return 0.0;
        }

        sum *= self.source_gain;
        if let Some(filter) = &mut self.filter {
            sum = filter.run(sum);
        }
        sum * self.gain.value_at(time)
    }
}

/// A channel strip: mono sum of its emissions, then gain and pan.
#[derive(Clone, Copy, Debug)]
struct Bus {
    gain: f32,
    pan: f32,
    acc: f32,
}

/// Equal-power pan law for a mono input.
fn pan_gains(pan: f32) -> (f32, f32) {
    let x = (pan.clamp(-1.0, 1.0) as f64 + 1.0) / 2.0 * FRAC_PI_2;
    (x.cos() as f32, x.sin() as f32)
}

/// Owns every in-flight emission and channel strip, plus the clock.
pub struct RenderGraph {
    sample_rate: u32,
    frames_rendered: u64,
    buses: SlotMap<BusKey, Bus>,
    emissions: SlotMap<EmissionKey, Emission>,
    next_seed: u64,
}

impl RenderGraph {
    /// Create an empty graph at time zero.
    pub fn new(sample_rate: u32, noise_seed: u64) -> Self {
        Self {
            sample_rate,
            frames_rendered: 0,
            buses: SlotMap::with_key(),
            emissions: SlotMap::with_key(),
            next_seed: noise_seed,
        }
    }

    /// Wrap in a lock for sharing with a render thread.
    pub fn shared(self) -> SharedGraph {
        Arc::new(Mutex::new(self))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// A fresh seed for a noise source. Deterministic per graph.
    pub fn next_noise_seed(&mut self) -> u64 {
        let seed = self.next_seed;
        self.next_seed = self.next_seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        seed
    }

    // --- Buses ---

    /// Add a channel strip at unity gain, centered.
    pub fn add_bus(&mut self) -> BusKey {
        self.buses.insert(Bus {
            gain: 1.0,
            pan: 0.0,
            acc: 0.0,
        })
    }

    pub fn remove_bus(&mut self, key: BusKey) {
        self.buses.remove(key);
    }

    pub fn set_bus_gain(&mut self, key: BusKey, gain: f32) {
        if let Some(bus) = self.buses.get_mut(key) {
            bus.gain = gain;
        }
    }

    pub fn set_bus_pan(&mut self, key: BusKey, pan: f32) {
        if let Some(bus) = self.buses.get_mut(key) {
            bus.pan = pan.clamp(-1.0, 1.0);
        }
    }

    pub fn bus_gain(&self, key: BusKey) -> Option<f32> {
        self.buses.get(key).map(|b| b.gain)
    }

    pub fn bus_pan(&self, key: BusKey) -> Option<f32> {
        self.buses.get(key).map(|b| b.pan)
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    // --- Emissions ---

    /// Register an emission; it starts sounding at its start time.
    pub fn add_emission(&mut self, emission: Emission) -> EmissionKey {
        self.emissions.insert(emission)
    }

    pub fn emission(&self, key: EmissionKey) -> Option<&Emission> {
        self.emissions.get(key)
    }

    pub fn emission_mut(&mut self, key: EmissionKey) -> Option<&mut Emission> {
        self.emissions.get_mut(key)
    }

    /// Returns true if the emission is still scheduled or sounding.
    pub fn contains(&self, key: EmissionKey) -> bool {
        self.emissions
            .get(key)
            .is_some_and(|e| !e.is_finished())
    }

    /// Remove an emission immediately, whatever its schedule says.
    pub fn kill(&mut self, key: EmissionKey) -> bool {
        self.emissions.remove(key).is_some()
    }

    pub fn emission_count(&self) -> usize {
        self.emissions.len()
    }

    /// Drop finished emissions. Returns how many were removed.
    pub fn reap(&mut self) -> usize {
        let before = self.emissions.len();
        self.emissions.retain(|_, e| !e.is_finished());
        before - self.emissions.len()
    }

    // --- Rendering ---

    /// Render one stereo frame and advance the clock.
    pub fn render_frame(&mut self) -> Frame {
        let time = self.current_time();
        let sample_rate = self.sample_rate as f64;
        let Self {
            buses, emissions, ..
        } = self;

        for bus in buses.values_mut() {
            bus.acc = 0.0;
        }

        let mut direct = 0.0;
        for emission in emissions.values_mut() {
            let sample = emission.render(time, sample_rate);
            match emission.bus {
                None => direct += sample,
                Some(key) => {
                    if let Some(bus) = buses.get_mut(key) {
                        bus.acc += sample;
                    }
                }
            }
        }

        let mut frame = Frame::mono(direct);
        for bus in buses.values() {
            let (left, right) = pan_gains(bus.pan);
            let level = bus.acc * bus.gain;
            frame.mix(Frame {
                left: level * left,
                right: level * right,
            });
        }

        self.frames_rendered += 1;
        frame
    }

    /// Render a block of frames, then drop finished emissions.
    pub fn render_block(&mut self, out: &mut [Frame]) {
        for frame in out.iter_mut() {
            *frame = self.render_frame();
        }
        self.reap();
    }

    /// Render into a planar buffer (left → channel 0, right → channel 1).
    pub fn render_into(&mut self, buffer: &mut AudioBuffer) {
        let stereo = buffer.channels() > 1;
        for i in 0..buffer.frames() {
            let frame = self.render_frame();
            buffer.channel_mut(0)[i] = frame.left;
            if stereo {
                buffer.channel_mut(1)[i] = frame.right;
            }
        }
        self.reap();
    }

    /// Render and discard `frames` frames.
    pub fn advance(&mut self, frames: usize) {
        for _ in 0..frames {
            self.render_frame();
        }
        self.reap();
    }
}
