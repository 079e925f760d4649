//! Smoothed transfer rate.

use std::time::{Duration, Instant};

/// Samples closer together than this are folded into the next one.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Exponential moving average of bytes per second.
#[derive(Debug, Clone)]
pub struct SpeedMeter {
    alpha: f64,
    last: Option<(Instant, u64)>,
    rate: Option<f64>,
}

impl SpeedMeter {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.01, 1.0),
            last: None,
            rate: None,
        }
    }

    /// Start measuring from `position` (a resume offset, usually 0).
    pub fn reset(&mut self, position: u64) {
        self.reset_at(position, Instant::now());
    }

    pub fn reset_at(&mut self, position: u64, now: Instant) {
        self.last = Some((now, position));
        self.rate = None;
    }

    /// Feed the cumulative byte count; returns the smoothed rate.
    pub fn sample(&mut self, position: u64) -> u64 {
        self.sample_at(position, Instant::now())
    }

    pub fn sample_at(&mut self, position: u64, now: Instant) -> u64 {
        let Some((then, prev)) = self.last else {
            self.last = Some((now, position));
            return self.current();
        };

        let elapsed = now.saturating_duration_since(then);
        if elapsed < MIN_SAMPLE_INTERVAL {
            return self.current();
        }

        let instant = position.saturating_sub(prev) as f64 / elapsed.as_secs_f64();
        self.rate = Some(match self.rate {
            Some(rate) => rate * (1.0 - self.alpha) + instant * self.alpha,
            None => instant,
        });
        self.last = Some((now, position));
        self.current()
    }

    pub fn current(&self) -> u64 {
        self.rate.map(|r| r.round() as u64).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_raw_rate() {
        let start = Instant::now();
        let mut meter = SpeedMeter::new(0.3);
        meter.reset_at(0, start);

        assert_eq!(meter.sample_at(1000, start + Duration::from_secs(1)), 1000);
    }

    #[test]
    fn test_ema_smoothing() {
        let start = Instant::now();
        let mut meter = SpeedMeter::new(0.3);
        meter.reset_at(0, start);

        meter.sample_at(1000, start + Duration::from_secs(1));
        // Instantaneous 2000 B/s: 1000 * 0.7 + 2000 * 0.3 = 1300
        assert_eq!(meter.sample_at(3000, start + Duration::from_secs(2)), 1300);
    }

    #[test]
    fn test_close_samples_are_deferred() {
        let start = Instant::now();
        let mut meter = SpeedMeter::new(0.3);
        meter.reset_at(0, start);

        assert_eq!(meter.sample_at(500, start + Duration::from_millis(10)), 0);
        assert_eq!(meter.sample_at(1000, start + Duration::from_secs(1)), 1000);
    }

    #[test]
    fn test_resume_offset_not_counted() {
        let start = Instant::now();
        let mut meter = SpeedMeter::new(0.3);
        meter.reset_at(1_000_000, start);

        assert_eq!(meter.sample_at(1_000_500, start + Duration::from_secs(1)), 500);
    }
}
