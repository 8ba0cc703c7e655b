use std::time::{Duration, Instant};

/// Elapsed-time tracker driving the per-frame animation.
///
/// The first tick has no baseline and reports zero; every later tick reports the time since
/// the previous one and adds it to the accumulated animation time. The clock is never reset.
///
/// Timestamps are supplied by the caller so tests can drive the clock deterministically. A
/// timestamp earlier than the previous one is a caller error and counts as zero elapsed.
#[derive(Debug, Clone, Default)]
pub struct AnimationClock {
    last: Option<Instant>,
    time: Duration,
    ticks: u64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `now` and returns the time elapsed since the previous tick.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let elapsed = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };

        self.last = Some(now);
        self.time += elapsed;
        self.ticks = self.ticks.wrapping_add(1);

        elapsed
    }

    /// Accumulated animation time.
    pub fn time(&self) -> Duration {
        self.time
    }

    /// Number of ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Brightness for the current accumulated time.
    pub fn brightness(&self) -> f32 {
        brightness(self.time.as_secs_f64())
    }
}

/// Cosine wave between 1 and 0: `0.5 * cos(t) + 0.5`.
pub fn brightness(t: f64) -> f32 {
    (0.5 * t.cos() + 0.5) as f32
}
