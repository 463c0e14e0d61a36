//! Core clock speed normalization
//!
//! Maps a core's current clock frequency onto `[0.0, 1.0]` relative to its
//! dynamic range. When the sustained base frequency is known the range is
//! split in two segments so that running exactly at base reports `0.5`.

use serde::{Deserialize, Serialize};

/// One core's clock description at a point in time (all values in Hz)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreFrequencySample {
    /// Lowest frequency the core can run at
    pub min_frequency: i64,
    /// Highest frequency the core can run at
    pub max_frequency: i64,
    /// Sustained (non-boost) frequency, if the platform exposes one
    pub base_frequency: Option<i64>,
    /// Frequency the core is currently running at
    pub current_frequency: i64,
}

impl CoreFrequencySample {
    /// Create a sample from already-typed values
    pub fn new(min: i64, max: i64, base: Option<i64>, current: i64) -> Self {
        Self {
            min_frequency: min,
            max_frequency: max,
            base_frequency: base,
            current_frequency: current,
        }
    }

    /// Create a sample from raw values where `-1` marks an unknown base.
    ///
    /// Other negative base values are kept so that `is_valid` rejects them.
    pub fn from_raw(min: i64, max: i64, base: i64, current: i64) -> Self {
        let base = if base == -1 { None } else { Some(base) };
        Self::new(min, max, base, current)
    }

    /// Whether the sample can be normalized.
    ///
    /// A zero-width range (`min == max`) is rejected.
    pub fn is_valid(&self) -> bool {
        self.min_frequency >= 0
            && self.max_frequency >= 0
            && self.current_frequency >= 0
            && self.base_frequency.map_or(true, |base| base >= 0)
            && self.max_frequency > self.min_frequency
    }

    /// Current speed normalized to `[0.0, 1.0]`.
    ///
    /// Callers must check [`is_valid`](Self::is_valid) first.
    pub fn normalized_speed(&self) -> f64 {
        debug_assert!(self.is_valid(), "normalizing invalid sample {:?}", self);

        let min = self.min_frequency;
        let max = self.max_frequency;
        let current = self.current_frequency.clamp(min, max);

        let speed = match self.base_frequency {
            None => linear(current, min, max),
            Some(base) => {
                let base = base.clamp(min, max);
                if current == base {
                    0.5
                } else if current < base {
                    0.5 * linear(current, min, base)
                } else {
                    0.5 + 0.5 * linear(current, base, max)
                }
            }
        };

        speed.clamp(0.0, 1.0)
    }
}

/// Position of `value` within `[low, high]`; an empty range collapses to its
/// upper boundary.
fn linear(value: i64, low: i64, high: i64) -> f64 {
    if high <= low {
        return 1.0;
    }
    (value - low) as f64 / (high - low) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const MHZ: i64 = 1_000_000;

    #[test]
    fn test_validity() {
        assert!(CoreFrequencySample::from_raw(800 * MHZ, 3000 * MHZ, -1, 1000 * MHZ).is_valid());
        assert!(CoreFrequencySample::new(0, 10, Some(5), 0).is_valid());

        assert!(!CoreFrequencySample::new(-1, 10, None, 5).is_valid());
        assert!(!CoreFrequencySample::new(0, -10, None, 5).is_valid());
        assert!(!CoreFrequencySample::new(0, 10, None, -5).is_valid());
        assert!(!CoreFrequencySample::new(10, 5, None, 7).is_valid());
        assert!(!CoreFrequencySample::new(10, 10, None, 10).is_valid());
        assert!(!CoreFrequencySample::from_raw(0, 10, -2, 5).is_valid());
    }

    #[test]
    fn test_unknown_base_is_linear() {
        let at = |current| CoreFrequencySample::from_raw(1000, 3000, -1, current).normalized_speed();
        assert_eq!(at(1000), 0.0);
        assert_eq!(at(3000), 1.0);
        assert_eq!(at(2000), 0.5);

        let mut last = 0.0;
        for current in (1000..=3000).step_by(100) {
            let speed = at(current);
            assert!(speed >= last);
            last = speed;
        }
    }

    #[test]
    fn test_known_base_splits_range() {
        let at = |current| CoreFrequencySample::new(1000, 5000, Some(2000), current).normalized_speed();
        assert_eq!(at(2000), 0.5);
        assert_eq!(at(1000), 0.0);
        assert_eq!(at(1500), 0.25);
        assert_eq!(at(3500), 0.75);
        assert_eq!(at(5000), 1.0);
        for current in (1000..2000).step_by(50) {
            assert!((0.0..=0.5).contains(&at(current)));
        }
        for current in (2000..=5000).step_by(50) {
            assert!((0.5..=1.0).contains(&at(current)));
        }
    }

    #[test]
    fn test_clamping() {
        let sample = |current| CoreFrequencySample::new(1000, 3000, Some(2000), current);
        assert_eq!(sample(10).normalized_speed(), sample(1000).normalized_speed());
        assert_eq!(sample(9000).normalized_speed(), sample(3000).normalized_speed());

        let unknown = |current| CoreFrequencySample::new(1000, 3000, None, current);
        assert_eq!(unknown(0).normalized_speed(), 0.0);
        assert_eq!(unknown(i64::MAX).normalized_speed(), 1.0);
    }

    #[test]
    fn test_degenerate_base_segments() {
        // Base at min: the lower segment collapses onto 0.5.
        let low = |current| CoreFrequencySample::new(1000, 3000, Some(1000), current);
        assert_eq!(low(1000).normalized_speed(), 0.5);
        assert_eq!(low(500).normalized_speed(), 0.5);
        assert_eq!(low(3000).normalized_speed(), 1.0);

        // Base at max: the upper segment collapses onto 0.5.
        let high = |current| CoreFrequencySample::new(1000, 3000, Some(3000), current);
        assert_eq!(high(3000).normalized_speed(), 0.5);
        assert_eq!(high(9000).normalized_speed(), 0.5);
        assert_eq!(high(1000).normalized_speed(), 0.0);
    }
}
