//! A single timed crossfade between the two decks
//!
//! The audio gain ramp and the crossfader position are both pure functions
//! of the time since the transition started, so whichever timer samples them
//! sees consistent values.

use std::time::Duration;

use crate::types::{DeckId, NUM_DECKS};

/// An in-flight crossfade from one deck to the other
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    from: DeckId,
    to: DeckId,
    start: Duration,
    duration: Duration,
    crossfader_from: f32,
    crossfader_to: f32,
    gain_from_start: f32,
    gain_to_start: f32,
}

impl Transition {
    /// Start a crossfade at `start`
    ///
    /// `crossfader_from` and the two starting gains are the values in effect
    /// when the transition begins.
    pub fn new(
        from: DeckId,
        start: Duration,
        duration: Duration,
        crossfader_from: f32,
        gain_from_start: f32,
        gain_to_start: f32,
    ) -> Self {
        let to = from.other();
        Self {
            from,
            to,
            start,
            duration,
            crossfader_from,
            crossfader_to: to.index() as f32,
            gain_from_start,
            gain_to_start,
        }
    }

    pub fn from(&self) -> DeckId {
        self.from
    }

    pub fn to(&self) -> DeckId {
        self.to
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Crossfader position once the transition completes
    pub fn crossfader_target(&self) -> f32 {
        self.crossfader_to
    }

    /// Fraction of the transition elapsed at `now`, in [0, 1]
    pub fn progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    pub fn is_complete(&self, now: Duration) -> bool {
        self.progress(now) >= 1.0
    }

    /// Crossfader position at `now`
    pub fn crossfader_at(&self, now: Duration) -> f32 {
        lerp(self.crossfader_from, self.crossfader_to, self.progress(now))
    }

    /// Per-deck output gains at `now`
    ///
    /// The outgoing deck ramps linearly to silence, the incoming deck
    /// linearly up to its fader value `to_volume`.
    pub fn gains_at(&self, now: Duration, to_volume: f32) -> [f32; NUM_DECKS] {
        let t = self.progress(now);
        let mut gains = [0.0; NUM_DECKS];
        gains[self.from.index()] = lerp(self.gain_from_start, 0.0, t);
        gains[self.to.index()] = lerp(self.gain_to_start, to_volume, t);
        gains
    }
}

#[inline]
fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition() -> Transition {
        Transition::new(
            DeckId::new(0),
            Duration::from_secs(100),
            Duration::from_secs(5),
            0.0,
            1.0,
            0.0,
        )
    }

    #[test]
    fn test_progress() {
        let t = transition();
        assert_eq!(t.to(), DeckId::new(1));
        assert_eq!(t.progress(Duration::from_secs(90)), 0.0);
        assert_eq!(t.progress(Duration::from_millis(102_500)), 0.5);
        assert!(!t.is_complete(Duration::from_millis(104_900)));
        assert!(t.is_complete(Duration::from_secs(105)));
        assert_eq!(t.progress(Duration::from_secs(200)), 1.0);
    }

    #[test]
    fn test_ramp_and_crossfader_share_one_clock() {
        let t = transition();
        let mid = Duration::from_millis(102_500);
        assert_eq!(t.crossfader_at(mid), 0.5);
        assert_eq!(t.gains_at(mid, 0.8), [0.5, 0.4]);

        let end = Duration::from_secs(105);
        assert_eq!(t.crossfader_at(end), t.crossfader_target());
        assert_eq!(t.gains_at(end, 0.8), [0.0, 0.8]);
    }

    #[test]
    fn test_reverse_direction() {
        let t = Transition::new(
            DeckId::new(1),
            Duration::ZERO,
            Duration::from_secs(4),
            1.0,
            0.9,
            0.0,
        );
        assert_eq!(t.crossfader_target(), 0.0);
        assert_eq!(t.crossfader_at(Duration::from_secs(1)), 0.75);
        assert_eq!(t.gains_at(Duration::from_secs(4), 1.0), [1.0, 0.0]);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let t = Transition::new(DeckId::new(0), Duration::from_secs(3), Duration::ZERO, 0.0, 1.0, 0.0);
        assert!(t.is_complete(Duration::from_secs(3)));
    }
}
