//! Speaking-time estimation used to cue the peripheral

/// Average characters spoken per second at rate 1.0
pub const DEFAULT_CHARS_PER_SECOND: f64 = 12.0;

/// Estimate whole seconds needed to speak `text_len` characters at `rate`
///
/// Always at least one second. Non-finite inputs also yield one second.
pub fn estimate_secs(text_len: usize, rate: f64, chars_per_second: f64) -> u64 {
    let secs = (text_len as f64 / chars_per_second * rate).floor();
    if secs.is_finite() && secs >= 1.0 {
        secs as u64
    } else {
        1
    }
}

/// Duration estimator bound to a fixed speaking speed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DurationEstimator {
    chars_per_second: f64,
}

impl Default for DurationEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_SECOND)
    }
}

impl DurationEstimator {
    pub fn new(chars_per_second: f64) -> Self {
        Self { chars_per_second }
    }

    /// Estimate the speaking time of `text` in seconds
    pub fn estimate(&self, text: &str, rate: f64) -> u64 {
        estimate_secs(text.chars().count(), rate, self.chars_per_second)
    }

    pub fn chars_per_second(&self) -> f64 {
        self.chars_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_is_one_second() {
        assert_eq!(estimate_secs(0, 0.9, 12.0), 1);
        assert_eq!(estimate_secs(5, 0.9, 12.0), 1);
        assert_eq!(estimate_secs(100, 0.0, 12.0), 1);
    }

    #[test]
    fn test_floor_of_scaled_length() {
        // 120 / 12 * 1.5 = 15
        assert_eq!(estimate_secs(120, 1.5, 12.0), 15);
        // 50 / 12 * 1.0 = 4.16..
        assert_eq!(estimate_secs(50, 1.0, 12.0), 4);
        // 120 / 12 * 0.9 = 9
        assert_eq!(estimate_secs(120, 0.9, 12.0), 9);
    }

    #[test]
    fn test_monotonic_in_length_and_rate() {
        let rates = [0.9, 1.0, 1.3, 2.0, 2.5, 3.0];
        for &rate in &rates {
            let mut last = 0;
            for len in 0..2000 {
                let secs = estimate_secs(len, rate, DEFAULT_CHARS_PER_SECOND);
                assert!(secs >= 1);
                assert!(secs >= last, "len {} rate {}", len, rate);
                last = secs;
            }
        }
        for len in [0, 11, 12, 250, 801, 1999] {
            let mut last = 0;
            for &rate in &rates {
                let secs = estimate_secs(len, rate, DEFAULT_CHARS_PER_SECOND);
                assert!(secs >= last, "len {} rate {}", len, rate);
                last = secs;
            }
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let estimator = DurationEstimator::new(1.0);
        assert_eq!(estimator.estimate("héllo", 1.0), 5);
    }

    #[test]
    fn test_non_finite_inputs() {
        assert_eq!(estimate_secs(100, f64::NAN, 12.0), 1);
        assert_eq!(estimate_secs(100, 1.0, 0.0), 1);
    }
}
