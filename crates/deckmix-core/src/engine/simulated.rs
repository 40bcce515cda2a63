//! Deterministic playback engine following the host clock
//!
//! Used for headless hosts and tests. Decoding "succeeds" when the track
//! carries a probed duration, after a configurable latency; rendering emits a
//! constant level while playing.

use std::collections::VecDeque;
use std::time::Duration;

use crate::track::TrackRef;
use crate::types::{StereoBuffer, StereoSample};

use super::loop_region::Region;
use super::playback::{LoadTicket, PlaybackEngine, PlaybackEvent};

/// Level rendered while playing
const DEFAULT_LEVEL: f32 = 0.5;

/// A decode still in flight
#[derive(Debug, Clone)]
struct PendingDecode {
    ticket: LoadTicket,
    remaining: Duration,
    outcome: Result<f64, String>,
}

/// Playback engine driven entirely by [`PlaybackEngine::elapse`]
#[derive(Debug, Clone)]
pub struct SimulatedPlayback {
    decode_latency: Duration,
    level: f32,
    pending: Vec<PendingDecode>,
    /// Latest load; only its completion changes the loaded content
    latest: Option<LoadTicket>,
    events: VecDeque<PlaybackEvent>,
    duration: f64,
    position: f64,
    playing: bool,
    rate: f64,
    looping: bool,
    regions: Vec<Region>,
}

impl Default for SimulatedPlayback {
    fn default() -> Self {
        Self {
            decode_latency: Duration::ZERO,
            level: DEFAULT_LEVEL,
            pending: Vec::new(),
            latest: None,
            events: VecDeque::new(),
            duration: 0.0,
            position: 0.0,
            playing: false,
            rate: 1.0,
            looping: false,
            regions: Vec::new(),
        }
    }
}

impl SimulatedPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between `load` and its completion event
    pub fn with_decode_latency(mut self, latency: Duration) -> Self {
        self.decode_latency = latency;
        self
    }

    /// Constant level rendered while playing
    pub fn with_level(mut self, level: f32) -> Self {
        self.level = level;
        self
    }

    /// Regions currently shown
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn playback_rate(&self) -> f64 {
        self.rate
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Number of decodes not yet completed
    pub fn pending_decodes(&self) -> usize {
        self.pending.len()
    }

    /// Simulate a click on the waveform at `time` seconds
    pub fn user_seek(&mut self, time: f64) {
        let time = time.clamp(0.0, self.duration);
        self.position = time;
        self.events.push_back(PlaybackEvent::UserSeek(time));
    }

    fn decode(track: &TrackRef) -> Result<f64, String> {
        if track.bytes().is_empty() {
            return Err("empty content".to_string());
        }
        match track.duration_hint() {
            Some(duration) if duration.is_finite() && duration > 0.0 => Ok(duration),
            _ => Err(format!("unsupported content in {}", track.name())),
        }
    }

    fn complete(&mut self, decode: PendingDecode) {
        let is_latest = self.latest == Some(decode.ticket);
        let event = match decode.outcome {
            Ok(duration) => {
                if is_latest {
                    self.duration = duration;
                    self.position = 0.0;
                }
                PlaybackEvent::Ready {
                    ticket: decode.ticket,
                    duration,
                }
            }
            Err(reason) => {
                if is_latest {
                    self.duration = 0.0;
                }
                PlaybackEvent::DecodeFailed {
                    ticket: decode.ticket,
                    reason,
                }
            }
        };
        self.events.push_back(event);
    }

    fn loop_region(&self) -> Option<(f64, f64)> {
        if !self.looping {
            return None;
        }
        self.regions
            .iter()
            .find(|region| region.is_looping())
            .map(|region| (region.start(), region.end()))
    }

    fn advance_playhead(&mut self, elapsed: Duration) {
        if !self.playing {
            return;
        }
        let previous = self.position;
        let mut next = previous + elapsed.as_secs_f64() * self.rate;

        if let Some((start, end)) = self.loop_region() {
            if previous < end && next >= end {
                let length = end - start;
                next = start + (next - end) % length;
            }
        }

        if next >= self.duration {
            self.position = self.duration;
            self.playing = false;
            self.events.push_back(PlaybackEvent::Finished);
        } else {
            self.position = next;
            self.events.push_back(PlaybackEvent::Position(next));
        }
    }
}

impl PlaybackEngine for SimulatedPlayback {
    fn load(&mut self, ticket: LoadTicket, track: &TrackRef) {
        self.latest = Some(ticket);
        self.duration = 0.0;
        self.position = 0.0;
        self.playing = false;
        self.regions.clear();

        let decode = PendingDecode {
            ticket,
            remaining: self.decode_latency,
            outcome: Self::decode(track),
        };
        if decode.remaining.is_zero() {
            self.complete(decode);
        } else {
            self.pending.push(decode);
        }
    }

    fn play(&mut self) {
        if self.duration > 0.0 {
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.playing = false;
        self.position = 0.0;
    }

    fn seek_to_fraction(&mut self, fraction: f64) {
        self.position = fraction.clamp(0.0, 1.0) * self.duration;
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate.max(0.0);
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn add_region(&mut self, region: Region) {
        self.regions.retain(|existing| existing.id() != region.id());
        self.regions.push(region);
    }

    fn clear_regions(&mut self) {
        self.regions.clear();
    }

    fn poll_event(&mut self) -> Option<PlaybackEvent> {
        self.events.pop_front()
    }

    fn elapse(&mut self, elapsed: Duration) {
        let mut completed = Vec::new();
        self.pending.retain_mut(|decode| {
            decode.remaining = decode.remaining.saturating_sub(elapsed);
            if decode.remaining.is_zero() {
                completed.push(decode.clone());
                false
            } else {
                true
            }
        });
        for decode in completed {
            self.complete(decode);
        }

        self.advance_playhead(elapsed);
    }

    fn render(&mut self, out: &mut StereoBuffer) {
        if self.playing {
            out.fill(StereoSample::mono(self.level));
        } else {
            out.fill_silence();
        }
    }
}
