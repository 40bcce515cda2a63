//! Contract with the external playback engine
//!
//! Each deck drives one [`PlaybackEngine`]: the component that decodes
//! content, owns the playhead and renders the raw source signal. Decoding is
//! asynchronous: [`PlaybackEngine::load`] returns immediately and the outcome
//! arrives later through [`PlaybackEngine::poll_event`], tagged with the
//! [`LoadTicket`] of the load that produced it.

use std::time::Duration;

use crate::track::TrackRef;
use crate::types::{DeckId, StereoBuffer};

use super::loop_region::Region;

/// Identifies one load request on one deck
///
/// Generations increase with every load on a deck, so a completion carrying
/// an older ticket belongs to a superseded load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    deck: DeckId,
    generation: u64,
}

impl LoadTicket {
    pub fn new(deck: DeckId, generation: u64) -> Self {
        Self { deck, generation }
    }

    pub fn deck(&self) -> DeckId {
        self.deck
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Notifications raised by a playback engine
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Content decoded; duration in seconds
    Ready { ticket: LoadTicket, duration: f64 },
    /// Content could not be decoded
    DecodeFailed { ticket: LoadTicket, reason: String },
    /// Playback reached the end of the track and stopped
    Finished,
    /// The user clicked the waveform at this offset (seconds)
    UserSeek(f64),
    /// Periodic playhead update (seconds)
    Position(f64),
}

/// Per-deck playback primitive
///
/// Times are in seconds. `duration()` is 0 while nothing decoded is loaded.
pub trait PlaybackEngine {
    /// Start decoding `track`; the outcome is reported with `ticket`
    fn load(&mut self, ticket: LoadTicket, track: &TrackRef);

    fn play(&mut self);

    fn pause(&mut self);

    /// Stop and rewind
    fn stop(&mut self);

    /// Seek to a fraction `[0, 1]` of the duration
    fn seek_to_fraction(&mut self, fraction: f64);

    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    fn is_playing(&self) -> bool;

    fn set_playback_rate(&mut self, rate: f64);

    /// Whether a looping region wraps playback
    fn set_looping(&mut self, looping: bool);

    fn add_region(&mut self, region: Region);

    fn clear_regions(&mut self);

    /// Next pending notification, if any
    fn poll_event(&mut self) -> Option<PlaybackEvent>;

    /// Advance an engine that follows the host clock
    ///
    /// Engines running on their own clock ignore this.
    fn elapse(&mut self, _elapsed: Duration) {}

    /// Render the raw source signal for the next block
    fn render(&mut self, out: &mut StereoBuffer) {
        out.fill_silence();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_generations() {
        let first = LoadTicket::new(DeckId::new(1), 1);
        let second = LoadTicket::new(DeckId::new(1), 2);
        assert_eq!(second.deck(), DeckId::new(1));
        assert_eq!(second.generation(), 2);
        assert_ne!(first, second);
    }
}
