//! Mixer - crossfader curve, per-deck output gain and master volume
//!
//! Output gains are recomputed on every crossfader or deck volume change.
//! During an automix transition the scheduler overrides the gains with its
//! linear ramp until the transition completes.

use std::f32::consts::FRAC_PI_2;

use crate::types::{DeckId, StereoBuffer, NUM_DECKS};

use super::deck::Deck;
use super::playback::PlaybackEngine;

/// Equal-power crossfader gains `(deck 1, deck 2)` for position `x`
///
/// `gainA = cos(x·π/2)`, `gainB = cos((1-x)·π/2)`; the squared gains always
/// sum to one.
pub fn equal_power_gains(x: f32) -> (f32, f32) {
    let x = x.clamp(0.0, 1.0);
    ((x * FRAC_PI_2).cos(), ((1.0 - x) * FRAC_PI_2).cos())
}

/// Crossfader position that makes `deck` fully audible
pub fn crossfader_toward(deck: DeckId) -> f32 {
    deck.index() as f32
}

/// Two-deck mixer
#[derive(Debug, Clone)]
pub struct Mixer {
    /// Crossfader (0 = deck 1 only, 1 = deck 2 only)
    crossfader: f32,
    /// Master volume (0.0 to 1.0)
    master_volume: f32,
    /// Gains forced by an automix transition
    ramp: Option<[f32; NUM_DECKS]>,
    /// Gains written to the decks by the last `apply`
    output_gains: [f32; NUM_DECKS],
}

impl Mixer {
    pub fn new(crossfader: f32, master_volume: f32) -> Self {
        Self {
            crossfader: crossfader.clamp(0.0, 1.0),
            master_volume: master_volume.clamp(0.0, 1.0),
            ramp: None,
            output_gains: [0.0; NUM_DECKS],
        }
    }

    pub fn crossfader(&self) -> f32 {
        self.crossfader
    }

    /// Move the crossfader; call `apply` to push the new gains
    pub fn set_crossfader(&mut self, x: f32) {
        self.crossfader = x.clamp(0.0, 1.0);
    }

    /// Set master volume (0.0 to 1.0)
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Override the crossfader gains until cleared
    pub fn set_ramp(&mut self, gains: [f32; NUM_DECKS]) {
        self.ramp = Some(gains);
    }

    pub fn clear_ramp(&mut self) {
        self.ramp = None;
    }

    pub fn ramp(&self) -> Option<[f32; NUM_DECKS]> {
        self.ramp
    }

    /// Gains for the given fader volumes under the current state
    pub fn compute_gains(&self, volumes: [f32; NUM_DECKS]) -> [f32; NUM_DECKS] {
        if let Some(ramp) = self.ramp {
            return ramp;
        }
        let (a, b) = equal_power_gains(self.crossfader);
        [a * volumes[0], b * volumes[1]]
    }

    /// Recompute and write each deck's output gain
    pub fn apply<P: PlaybackEngine>(&mut self, decks: &mut [Deck<P>; NUM_DECKS]) {
        let volumes = [decks[0].volume(), decks[1].volume()];
        self.output_gains = self.compute_gains(volumes);
        for (deck, gain) in decks.iter_mut().zip(self.output_gains) {
            deck.set_output_gain(gain);
        }
    }

    /// Gain last written to `deck`
    pub fn output_gain(&self, deck: DeckId) -> f32 {
        self.output_gains[deck.index()]
    }

    /// Final stage on the shared bus
    pub fn process_master(&self, bus: &mut StereoBuffer) {
        bus.scale(self.master_volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeckConfig;
    use crate::engine::SimulatedPlayback;
    use crate::types::StereoSample;

    fn decks() -> [Deck<SimulatedPlayback>; NUM_DECKS] {
        let config = DeckConfig::default();
        DeckId::all().map(|id| Deck::new(id, SimulatedPlayback::new(), &config))
    }

    #[test]
    fn test_equal_power_law() {
        for i in 0..=100 {
            let x = i as f32 / 100.0;
            let (a, b) = equal_power_gains(x);
            assert!((a * a + b * b - 1.0).abs() < 1e-5, "x = {}", x);
        }
    }

    #[test]
    fn test_endpoints() {
        let (a, b) = equal_power_gains(0.0);
        assert!((a - 1.0).abs() < 1e-6 && b.abs() < 1e-6);

        let (a, b) = equal_power_gains(1.0);
        assert!(a.abs() < 1e-6 && (b - 1.0).abs() < 1e-6);

        let (a, b) = equal_power_gains(0.5);
        assert!((a - b).abs() < 1e-6);
        assert!((a - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_apply_scales_by_volume() {
        let mut decks = decks();
        let mut mixer = Mixer::new(0.0, 0.8);
        decks[0].set_volume(0.5);
        mixer.apply(&mut decks);

        assert!((decks[0].output_gain() - 0.5).abs() < 1e-6);
        assert!(decks[1].output_gain().abs() < 1e-6);
        assert_eq!(mixer.output_gain(DeckId::new(0)), decks[0].output_gain());
    }

    #[test]
    fn test_ramp_overrides_crossfader() {
        let mut decks = decks();
        let mut mixer = Mixer::new(0.0, 1.0);
        mixer.set_ramp([0.25, 0.75]);
        mixer.apply(&mut decks);
        assert_eq!(decks[1].output_gain(), 0.75);

        mixer.clear_ramp();
        mixer.apply(&mut decks);
        assert!(decks[1].output_gain().abs() < 1e-6);
    }

    #[test]
    fn test_master_volume_and_crossfader_target() {
        let mixer = Mixer::new(crossfader_toward(DeckId::new(1)), 0.5);
        assert_eq!(mixer.crossfader(), 1.0);

        let mut bus = StereoBuffer::filled(4, StereoSample::mono(0.8));
        mixer.process_master(&mut bus);
        assert!((bus[0].left - 0.4).abs() < 1e-6);
    }
}
