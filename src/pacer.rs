//! Wall-clock rate limiter for ring emission.

/// Fires at most once per `period_s` of elapsed time.
///
/// The elapsed time since the last firing is clamped to `[0, max(1, period)]`
/// so a stalled frame or a clock jump never produces a burst of rings.
#[derive(Debug, Clone)]
pub struct LineClock {
    period_s: f32,
    last_s: f32,
}

impl LineClock {
    /// Clock firing every `period_s`, counting from `start_s`
    pub fn new(period_s: f32, start_s: f32) -> Self {
        Self {
            period_s,
            last_s: start_s,
        }
    }

    pub fn period_s(&self) -> f32 {
        self.period_s
    }

    /// Returns true (and restarts the period) when a full period has elapsed
    pub fn tick(&mut self, now_s: f32) -> bool {
        let dt = (now_s - self.last_s).clamp(0.0, self.period_s.max(1.0));
        if dt >= self.period_s {
            self.last_s = now_s;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_period() {
        let mut clock = LineClock::new(0.25, 0.0);
        let fired: Vec<bool> = [0.1, 0.2, 0.26, 0.3, 0.5, 0.52]
            .iter()
            .map(|&t| clock.tick(t))
            .collect();
        assert_eq!(fired, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn test_stall_fires_only_once() {
        let mut clock = LineClock::new(0.1, 0.0);
        assert!(clock.tick(30.0));
        assert!(!clock.tick(30.05));
        assert!(clock.tick(30.2));
    }

    #[test]
    fn test_clock_going_backwards_does_not_fire() {
        let mut clock = LineClock::new(0.5, 10.0);
        assert!(!clock.tick(5.0));
    }

    #[test]
    fn test_slow_periods_still_fire() {
        let mut clock = LineClock::new(4.0, 0.0);
        assert!(!clock.tick(3.0));
        assert!(clock.tick(4.0));
    }
}
