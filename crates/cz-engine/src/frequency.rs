//! Pitch-to-frequency conversion.

/// Pitch of A4.
const A4_PITCH: i32 = 69;

/// Frequency of A4 in Hz.
const A4_HZ: f64 = 440.0;

/// Equal-tempered frequency of a MIDI pitch: `440 * 2^((pitch - 69) / 12)`.
pub fn pitch_to_frequency(pitch: u8) -> f64 {
    A4_HZ * 2f64.powf((pitch as i32 - A4_PITCH) as f64 / 12.0)
}

/// Frequency ratio for a detune in cents.
pub fn cents_to_ratio(cents: f32) -> f64 {
    2f64.powf(cents as f64 / 1200.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert_eq!(pitch_to_frequency(69), 440.0);
    }

    #[test]
    fn octaves_double() {
        assert!((pitch_to_frequency(81) - 880.0).abs() < 1e-9);
        assert!((pitch_to_frequency(57) - 220.0).abs() < 1e-9);
    }

    #[test]
    fn middle_c() {
        assert!((pitch_to_frequency(60) - 261.625_565).abs() < 1e-5);
    }

    #[test]
    fn hundred_cents_is_a_semitone() {
        let ratio = cents_to_ratio(100.0);
        assert!((pitch_to_frequency(69) * ratio - pitch_to_frequency(70)).abs() < 1e-9);
        assert_eq!(cents_to_ratio(0.0), 1.0);
    }
}
