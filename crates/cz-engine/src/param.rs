//! Automatable parameter with a fixed-capacity event timeline.
//!
//! Evaluation follows the usual audio-graph rules: a ramp event
//! interpolates from the previous event's time and value up to its own,
//! a set event jumps, and after the last event the value holds.

use heapless::Vec as FixedVec;

/// Smallest magnitude an exponential ramp may start from or aim at.
pub const SILENCE_FLOOR: f32 = 0.0001;

/// Events per parameter. Enough for a full ADSR plus one live re-anchor.
const MAX_EVENTS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
enum ParamEvent {
    Set { time: f64, value: f32 },
    Linear { time: f64, value: f32 },
    Exponential { time: f64, value: f32 },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::Set { time, .. }
            | ParamEvent::Linear { time, .. }
            | ParamEvent::Exponential { time, .. } => time,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            ParamEvent::Set { value, .. }
            | ParamEvent::Linear { value, .. }
            | ParamEvent::Exponential { value, .. } => value,
        }
    }
}

/// A parameter value driven by scheduled automation.
#[derive(Clone, Debug)]
pub struct Param {
    default: f32,
    events: FixedVec<ParamEvent, MAX_EVENTS>,
}

impl Param {
    /// Create a parameter holding `default` until automated.
    pub fn new(default: f32) -> Self {
        Self {
            default,
            events: FixedVec::new(),
        }
    }

    /// Jump to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::Set { time, value })
    }

    /// Ramp linearly from the previous event to `value`, arriving at `time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(ParamEvent::Linear { time, value })
    }

    /// Ramp exponentially from the previous event to `value`, arriving at
    /// `time`. Targets closer to zero than [`SILENCE_FLOOR`] are clamped.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        let value = if value.abs() < SILENCE_FLOOR {
            SILENCE_FLOOR.copysign(if value == 0.0 { 1.0 } else { value })
        } else {
            value
        };
        self.insert(ParamEvent::Exponential { time, value })
    }

    /// Drop every event at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) -> &mut Self {
        let keep = self.events.partition_point(|e| e.time() < time);
        self.events.truncate(keep);
        self
    }

    /// Number of scheduled events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Time of the last scheduled event, if any.
    pub fn last_event_time(&self) -> Option<f64> {
        self.events.last().map(ParamEvent::time)
    }

    /// Evaluate the parameter at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut prev_time = f64::NEG_INFINITY;
        let mut prev_value = self.default;

        for event in self.events.iter() {
            let event_time = event.time();
            if event_time <= time {
                prev_time = event_time;
                prev_value = event.value();
                continue;
            }
            return match *event {
                ParamEvent::Set { .. } => prev_value,
                ParamEvent::Linear { value, .. } => {
                    if !prev_time.is_finite() {
                        return prev_value;
                    }
                    let t = ((time - prev_time) / (event_time - prev_time)) as f32;
                    prev_value + (value - prev_value) * t
                }
                ParamEvent::Exponential { value, .. } => {
                    let same_sign = prev_value != 0.0 && (prev_value > 0.0) == (value > 0.0);
                    if !prev_time.is_finite() || !same_sign {
                        return prev_value;
                    }
                    let t = (time - prev_time) / (event_time - prev_time);
                    (prev_value as f64 * (value as f64 / prev_value as f64).powf(t)) as f32
                }
            };
        }

        prev_value
    }

    /// Keep events sorted by time; equal times keep insertion order.
    fn insert(&mut self, event: ParamEvent) -> &mut Self {
        if self.events.push(event).is_err() {
            tracing::warn!(?event, "param automation full, dropping event");
            return self;
        }
        let last = self.events.len() - 1;
        let pos = self.events[..last].partition_point(|e| e.time() <= event.time());
        if pos < last {
            self.events[pos..].rotate_right(1);
        }
        self
    }
}
