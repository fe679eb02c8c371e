use serde::{Deserialize, Serialize};

/// Monotonic simulation time in seconds since the session was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp(pub f64);

impl Timestamp {
    pub fn secs(self) -> f64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`, never negative.
    pub fn since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }

    pub fn after(self, secs: f32) -> Timestamp {
        Timestamp(self.0 + f64::from(secs))
    }
}

/// Accumulates per-tick `dt` into a monotonic reading captured once per tick.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Timestamp,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Advance by `dt` seconds. Negative or non-finite deltas are ignored so
    /// the reading can never move backwards.
    pub fn advance(&mut self, dt: f32) -> Timestamp {
        if dt.is_finite() && dt > 0.0 {
            self.now = self.now.after(dt);
        }
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_accumulates_dt() {
        let mut clock = SimClock::new();
        clock.advance(0.5);
        clock.advance(0.25);
        assert!((clock.now().secs() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn clock_ignores_bad_dt() {
        let mut clock = SimClock::new();
        clock.advance(1.0);
        clock.advance(-3.0);
        clock.advance(f32::NAN);
        assert!((clock.now().secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn since_is_clamped() {
        assert_eq!(Timestamp(1.0).since(Timestamp(2.0)), 0.0);
        assert!((Timestamp(3.5).since(Timestamp(1.0)) - 2.5).abs() < 1e-9);
    }
}
