//! Deck - one playback unit with its signal chain, loops and hot cues

use std::time::Duration;

use crate::config::DeckConfig;
use crate::error::{DeckError, DeckResult};
use crate::track::TrackRef;
use crate::types::{DeckId, StereoBuffer};

use super::loop_region::{HotCueAction, LoopPhase, LoopRegionModel, Region};
use super::playback::{LoadTicket, PlaybackEngine};
use super::signal_chain::{EqBand, SignalChain};
use super::tempo::{estimate_tempo, pitch_to_rate, sync_pitch};

/// Load state of a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckStatus {
    /// Nothing ever loaded
    Empty,
    /// Decode in flight
    Loading,
    /// Decoded with a positive duration
    Ready,
    /// Last load could not be decoded
    Failed,
}

/// A single deck
///
/// Owns its playback engine, signal chain and loop/hot cue model. All
/// per-track state is reset on every load; decode completions from
/// superseded loads are ignored.
pub struct Deck<P: PlaybackEngine> {
    id: DeckId,
    playback: P,
    chain: SignalChain,
    loops: LoopRegionModel,
    config: DeckConfig,

    status: DeckStatus,
    loaded_track: Option<TrackRef>,
    /// Most recent load; completions for any other ticket are stale
    ticket: Option<LoadTicket>,
    generation: u64,
    failure: Option<String>,

    duration: f64,
    tempo: Option<f64>,
    pitch: f64,
    volume: f32,
    playing: bool,
    synced: bool,
    cue_point: f64,
    /// Auto-pause deadline of a cue / hot cue preview
    preview_until: Option<Duration>,
}

impl<P: PlaybackEngine> Deck<P> {
    /// Create an empty deck
    pub fn new(id: DeckId, playback: P, config: &DeckConfig) -> Self {
        Self {
            id,
            playback,
            chain: SignalChain::new(config),
            loops: LoopRegionModel::new(config.hot_cue_slots),
            config: config.clone(),
            status: DeckStatus::Empty,
            loaded_track: None,
            ticket: None,
            generation: 0,
            failure: None,
            duration: 0.0,
            tempo: None,
            pitch: 0.0,
            volume: config.default_volume.clamp(0.0, 1.0),
            playing: false,
            synced: false,
            cue_point: 0.0,
            preview_until: None,
        }
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    pub fn playback(&self) -> &P {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut P {
        &mut self.playback
    }

    pub fn signal_chain(&self) -> &SignalChain {
        &self.chain
    }

    // --- Loading ---

    /// Load a track, superseding any load still in flight
    ///
    /// Loop points, hot cues, filter, cue point, sync and tempo are reset.
    /// The deck is not ready until the playback engine reports the decode.
    pub fn load(&mut self, track: TrackRef) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket::new(self.id, self.generation);
        log::info!("{}: Loading \"{}\" ({} bytes)", self.id, track.name(), track.size());

        self.loops.reset();
        self.chain.reset_filter();
        self.chain.attach(ticket);
        self.status = DeckStatus::Loading;
        self.ticket = Some(ticket);
        self.failure = None;
        self.duration = 0.0;
        self.tempo = None;
        self.playing = false;
        self.synced = false;
        self.cue_point = 0.0;
        self.preview_until = None;

        self.playback.set_looping(false);
        self.playback.clear_regions();
        self.playback.load(ticket, &track);
        self.loaded_track = Some(track);
        ticket
    }

    /// Decode finished; returns false if the completion was stale
    pub fn on_ready(&mut self, ticket: LoadTicket, duration: f64) -> bool {
        if !self.is_current(ticket) {
            log::debug!("{}: Ignoring stale decode completion {:?}", self.id, ticket);
            return false;
        }

        self.duration = duration.max(0.0);
        self.tempo = estimate_tempo(self.duration, self.config.tempo_min, self.config.tempo_max);
        self.status = if self.duration > 0.0 {
            DeckStatus::Ready
        } else {
            DeckStatus::Failed
        };
        self.playing = false;
        self.playback.set_playback_rate(self.playback_rate());
        self.sync_regions();

        match self.tempo {
            Some(tempo) => log::info!(
                "{}: Ready \"{}\" ({:.2}s, {} BPM)",
                self.id,
                self.track_name(),
                self.duration,
                tempo
            ),
            None => log::warn!("{}: \"{}\" has no playable duration", self.id, self.track_name()),
        }
        true
    }

    /// Decode failed; returns false if the failure was stale
    pub fn on_decode_failed(&mut self, ticket: LoadTicket, reason: &str) -> bool {
        if !self.is_current(ticket) {
            log::debug!("{}: Ignoring stale decode failure {:?}", self.id, ticket);
            return false;
        }

        log::error!("{}: Error decoding \"{}\": {}", self.id, self.track_name(), reason);
        self.status = DeckStatus::Failed;
        self.failure = Some(reason.to_string());
        self.duration = 0.0;
        self.tempo = None;
        self.playing = false;
        true
    }

    fn is_current(&self, ticket: LoadTicket) -> bool {
        self.status == DeckStatus::Loading && self.ticket == Some(ticket)
    }

    /// Playback reached the end of the track
    pub fn on_finished(&mut self) {
        self.playing = false;
        self.preview_until = None;
    }

    /// The user clicked the waveform: that spot becomes the cue point
    pub fn on_user_seek(&mut self, time: f64) {
        self.cue_point = time.clamp(0.0, self.duration);
        log::info!("{}: Cue point set to {:.2}s", self.id, self.cue_point);
    }

    // --- State ---

    pub fn status(&self) -> DeckStatus {
        self.status
    }

    /// Track content is decoded and has a positive duration
    pub fn is_ready(&self) -> bool {
        self.status == DeckStatus::Ready && self.duration > 0.0
    }

    /// A load was issued and has not completed yet
    pub fn is_loading(&self) -> bool {
        self.status == DeckStatus::Loading
    }

    /// Most recently loaded track, even if still decoding
    pub fn loaded_track(&self) -> Option<&TrackRef> {
        self.loaded_track.as_ref()
    }

    /// Ticket of the most recent load
    pub fn current_ticket(&self) -> Option<LoadTicket> {
        self.ticket
    }

    fn track_name(&self) -> &str {
        self.loaded_track.as_ref().map(TrackRef::name).unwrap_or_default()
    }

    /// Text for the deck's track label
    pub fn label(&self) -> String {
        match (&self.loaded_track, self.status) {
            (None, _) => String::new(),
            (Some(track), DeckStatus::Failed) => format!("Error loading: {}", track.name()),
            (Some(track), _) => track.name().to_string(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn position(&self) -> f64 {
        self.playback.current_time()
    }

    /// Seconds left on the track, 0 when not ready
    pub fn remaining(&self) -> f64 {
        if !self.is_ready() {
            return 0.0;
        }
        (self.duration - self.position()).max(0.0)
    }

    /// Playhead within `tolerance` seconds of the end
    pub fn is_at_end(&self, tolerance: f64) -> bool {
        self.is_ready() && self.position() >= self.duration - tolerance
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn tempo(&self) -> Option<f64> {
        self.tempo
    }

    pub fn cue_point(&self) -> f64 {
        self.cue_point
    }

    fn require_ready(&self) -> DeckResult<()> {
        match self.status {
            DeckStatus::Ready if self.duration > 0.0 => Ok(()),
            DeckStatus::Loading => Err(DeckError::NotReady),
            DeckStatus::Failed => Err(DeckError::DecodeFailed(
                self.failure.clone().unwrap_or_else(|| "no playable audio".to_string()),
            )),
            _ => Err(DeckError::NoTrackLoaded),
        }
    }

    // --- Transport ---

    /// Toggle play/pause; returns the new playing state
    pub fn play_pause(&mut self) -> DeckResult<bool> {
        self.require_ready()?;
        if self.playing {
            self.pause();
        } else {
            self.play()?;
        }
        Ok(self.playing)
    }

    pub fn play(&mut self) -> DeckResult<()> {
        self.require_ready()?;
        self.preview_until = None;
        self.playback.play();
        self.playing = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.preview_until = None;
        self.playback.pause();
        self.playing = false;
    }

    /// Stop and rewind
    pub fn stop(&mut self) {
        self.preview_until = None;
        self.playback.stop();
        self.playing = false;
    }

    fn seek(&mut self, time: f64) {
        if self.duration > 0.0 {
            self.playback.seek_to_fraction(time / self.duration);
        }
    }

    /// Play a short preview from `now` if paused
    fn preview(&mut self, now: Duration) {
        self.playback.play();
        self.playing = true;
        self.preview_until = Some(now + self.config.cue_preview());
    }

    /// Jump to the cue point
    ///
    /// While paused this plays a short preview and then pauses again; while
    /// playing the jump is immediate and playback continues.
    pub fn cue(&mut self, now: Duration) -> DeckResult<()> {
        self.require_ready()?;
        self.seek(self.cue_point);
        if self.playing {
            log::info!("{}: Already playing, seeking to cue point {:.2}s", self.id, self.cue_point);
        } else {
            self.preview(now);
            log::info!("{}: Cue triggered to {:.2}s", self.id, self.cue_point);
        }
        Ok(())
    }

    /// Pending preview auto-pause deadline
    pub fn preview_deadline(&self) -> Option<Duration> {
        self.preview_until
    }

    /// Fire a due preview auto-pause; returns true if the deck paused
    pub fn fire_timers(&mut self, now: Duration) -> bool {
        match self.preview_until {
            Some(deadline) if now >= deadline => {
                log::debug!("{}: Preview ended", self.id);
                self.pause();
                true
            }
            _ => false,
        }
    }

    /// Move the playhead by `delta` jog units, clamped to the track
    pub fn nudge(&mut self, delta: f64) -> DeckResult<f64> {
        self.require_ready()?;
        let target = (self.position() + delta * self.config.jog_seconds_per_unit)
            .clamp(0.0, self.duration);
        self.seek(target);
        Ok(target)
    }

    // --- Tempo ---

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn playback_rate(&self) -> f64 {
        pitch_to_rate(self.pitch)
    }

    /// Set the pitch offset in percent, clamped to the fader range
    pub fn set_pitch(&mut self, percent: f64) {
        let range = self.config.pitch_range_percent;
        self.apply_pitch(percent.clamp(-range, range));
    }

    fn apply_pitch(&mut self, percent: f64) {
        self.pitch = percent;
        self.playback.set_playback_rate(self.playback_rate());
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Toggle sync against the tempo of the other deck
    ///
    /// Enabling is a one-shot alignment: the pitch is set so this deck's
    /// tempo matches `peer_tempo`. Rejected (and left off) without a known
    /// tempo on both sides. Returns the new sync state.
    pub fn toggle_sync(&mut self, peer_tempo: Option<f64>) -> DeckResult<bool> {
        if self.synced {
            self.synced = false;
            log::info!("{}: Sync disabled", self.id);
            return Ok(false);
        }

        let tempo = self.tempo.ok_or(DeckError::TempoUnknown)?;
        let target = peer_tempo.ok_or(DeckError::NoSyncPeer)?;

        self.apply_pitch(sync_pitch(tempo, target));
        self.synced = true;
        log::info!(
            "{}: Synced {} -> {} BPM, pitch {:+.1}%",
            self.id,
            tempo,
            target,
            self.pitch
        );
        Ok(true)
    }

    // --- Mixer-facing ---

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Fader value; the mixer must recompute gains afterwards
    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Gain currently applied at the end of the signal chain
    pub fn output_gain(&self) -> f32 {
        self.chain.gain()
    }

    pub(crate) fn set_output_gain(&mut self, gain: f32) {
        self.chain.set_gain(gain);
    }

    // --- EQ / filter ---

    pub fn set_eq(&mut self, band: EqBand, value: f32) {
        self.chain.set_eq(band, value);
    }

    pub fn eq(&self, band: EqBand) -> f32 {
        self.chain.eq(band)
    }

    pub fn set_filter_cutoff(&mut self, hz: f32) {
        self.chain.set_filter_cutoff(hz);
    }

    pub fn filter_cutoff(&self) -> f32 {
        self.chain.filter_cutoff()
    }

    // --- Loops ---

    pub fn loop_phase(&self) -> LoopPhase {
        self.loops.phase()
    }

    pub fn is_looping(&self) -> bool {
        self.loops.is_looping()
    }

    pub fn loop_points(&self) -> (Option<f64>, Option<f64>) {
        (self.loops.loop_start(), self.loops.loop_end())
    }

    pub fn regions(&self) -> Vec<Region> {
        self.loops.regions()
    }

    /// Loop-in at the playhead
    pub fn set_loop_in(&mut self) -> DeckResult<LoopPhase> {
        self.require_ready()?;
        let position = self.position();
        let phase = self.loops.set_loop_in(position);
        log::info!("{}: Loop IN set at {:.2}s", self.id, position);
        self.sync_regions();
        Ok(phase)
    }

    /// Loop-out at the playhead
    pub fn set_loop_out(&mut self) -> DeckResult<LoopPhase> {
        self.require_ready()?;
        let position = self.position();
        let phase = self.loops.set_loop_out(position);
        log::info!("{}: Loop OUT set at {:.2}s", self.id, position);
        self.sync_regions();
        Ok(phase)
    }

    /// Loop of `beats` beats from the playhead
    ///
    /// Clears both points if the loop would pass the end of the track.
    pub fn set_loop_length(&mut self, beats: f64) -> DeckResult<(f64, f64)> {
        self.require_ready()?;
        let tempo = self.tempo.ok_or(DeckError::TempoUnknown)?;
        let position = self.position();
        let result = self.loops.set_beat_loop(position, beats, tempo, self.duration);
        self.sync_regions();
        if let Ok((start, end)) = result {
            log::info!(
                "{}: Loop length set to {} beats ({:.2}s) from {:.2}s",
                self.id,
                beats,
                end - start,
                start
            );
        }
        result
    }

    /// Toggle the loop; returns the new looping state
    ///
    /// Enabling while paused jumps to the loop start and starts playback.
    pub fn toggle_loop(&mut self) -> DeckResult<bool> {
        self.require_ready()?;
        if self.loops.is_looping() {
            self.loops.disable_loop();
            self.sync_regions();
            log::info!("{}: Loop deactivated", self.id);
            return Ok(false);
        }

        let enabled = self.loops.enable_loop();
        self.sync_regions();
        let (start, end) = enabled?;

        if !self.playing {
            self.seek(start);
            self.play()?;
        }
        log::info!("{}: Loop activated from {:.2}s to {:.2}s", self.id, start, end);
        Ok(true)
    }

    // --- Hot cues ---

    pub fn hot_cue(&self, slot: u8) -> Option<f64> {
        self.loops.hot_cue(slot)
    }

    pub fn hot_cues(&self) -> Vec<(u8, f64)> {
        self.loops.hot_cues().collect()
    }

    /// Press a hot cue pad
    ///
    /// An empty slot stores the playhead; an occupied one jumps there, with a
    /// short preview if paused.
    pub fn trigger_hot_cue(&mut self, slot: u8, now: Duration) -> DeckResult<HotCueAction> {
        self.require_ready()?;
        let position = self.position();
        let action = self.loops.trigger_hot_cue(slot, position)?;
        match action {
            HotCueAction::Set(at) => {
                log::info!("{}: Hot cue {} set at {:.2}s", self.id, slot, at);
                self.sync_regions();
            }
            HotCueAction::Jump(at) => {
                log::info!("{}: Jumped to hot cue {} at {:.2}s", self.id, slot, at);
                self.seek(at);
                if !self.playing {
                    self.preview(now);
                }
            }
        }
        Ok(action)
    }

    /// Empty every hot cue slot, keeping the loop region
    pub fn clear_hot_cues(&mut self) {
        self.loops.clear_hot_cues();
        self.sync_regions();
        log::info!("{}: All hot cues cleared", self.id);
    }

    /// Push the current region set to the playback engine
    fn sync_regions(&mut self) {
        self.playback.clear_regions();
        for region in self.loops.regions() {
            self.playback.add_region(region);
        }
        self.playback.set_looping(self.loops.is_looping());
    }

    // --- Audio ---

    /// Render one block of this deck's processed signal
    pub fn render(&mut self, out: &mut StereoBuffer) {
        if let Some(ticket) = self.ticket {
            if self.chain.attached() != Some(ticket) {
                log::warn!("{}: Source was not routed through the chain, re-attaching", self.id);
                self.chain.attach(ticket);
            }
        }
        self.playback.render(out);
        self.chain.process(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedPlayback;
    use crate::engine::PlaybackEvent;
    use crate::track::test_track;

    fn deck() -> Deck<SimulatedPlayback> {
        Deck::new(DeckId::new(0), SimulatedPlayback::new(), &DeckConfig::default())
    }

    /// Feed pending playback events into the deck the way the engine does
    fn pump(deck: &mut Deck<SimulatedPlayback>) {
        while let Some(event) = deck.playback_mut().poll_event() {
            match event {
                PlaybackEvent::Ready { ticket, duration } => {
                    deck.on_ready(ticket, duration);
                }
                PlaybackEvent::DecodeFailed { ticket, reason } => {
                    deck.on_decode_failed(ticket, &reason);
                }
                PlaybackEvent::Finished => deck.on_finished(),
                PlaybackEvent::UserSeek(t) => deck.on_user_seek(t),
                PlaybackEvent::Position(_) => {}
            }
        }
    }

    fn loaded(duration: f64) -> Deck<SimulatedPlayback> {
        let mut deck = deck();
        deck.load(test_track("track.mp3", 64, duration));
        pump(&mut deck);
        deck
    }

    fn advance(deck: &mut Deck<SimulatedPlayback>, secs: f64) {
        deck.playback_mut().elapse(Duration::from_secs_f64(secs));
        pump(deck);
    }

    #[test]
    fn test_empty_deck_rejects_transport() {
        let mut deck = deck();
        assert_eq!(deck.play_pause(), Err(DeckError::NoTrackLoaded));
        assert_eq!(deck.cue(Duration::ZERO), Err(DeckError::NoTrackLoaded));
        assert_eq!(deck.toggle_loop(), Err(DeckError::NoTrackLoaded));
        assert!(!deck.is_playing());
        assert_eq!(deck.label(), "");
    }

    #[test]
    fn test_loading_deck_is_not_ready() {
        let mut deck = Deck::new(
            DeckId::new(0),
            SimulatedPlayback::new().with_decode_latency(Duration::from_millis(500)),
            &DeckConfig::default(),
        );
        deck.load(test_track("slow.mp3", 64, 60.0));
        assert_eq!(deck.status(), DeckStatus::Loading);
        assert_eq!(deck.duration(), 0.0);
        assert_eq!(deck.play_pause(), Err(DeckError::NotReady));

        advance(&mut deck, 0.5);
        assert!(deck.is_ready());
        assert_eq!(deck.tempo(), Some(120.0));
    }

    #[test]
    fn test_play_pause_toggles() {
        let mut deck = loaded(200.0);
        assert_eq!(deck.play_pause(), Ok(true));
        assert!(deck.playback().is_playing());
        assert_eq!(deck.play_pause(), Ok(false));
        assert!(!deck.playback().is_playing());
    }

    #[test]
    fn test_cue_previews_when_paused() {
        let mut deck = loaded(200.0);
        let now = Duration::from_secs(10);
        deck.cue(now).unwrap();
        assert!(deck.is_playing());
        assert_eq!(deck.preview_deadline(), Some(now + Duration::from_millis(500)));

        assert!(!deck.fire_timers(now + Duration::from_millis(499)));
        assert!(deck.fire_timers(now + Duration::from_millis(500)));
        assert!(!deck.is_playing());
    }

    #[test]
    fn test_cue_while_playing_keeps_playing() {
        let mut deck = loaded(200.0);
        deck.play().unwrap();
        advance(&mut deck, 30.0);
        deck.cue(Duration::from_secs(30)).unwrap();
        assert!(deck.is_playing());
        assert_eq!(deck.position(), 0.0);
        assert!(deck.preview_deadline().is_none());
    }

    #[test]
    fn test_user_seek_moves_cue_point() {
        let mut deck = loaded(200.0);
        deck.playback_mut().user_seek(42.0);
        pump(&mut deck);
        assert_eq!(deck.cue_point(), 42.0);
    }

    #[test]
    fn test_sync_sets_pitch_to_match_peer() {
        // 200s estimates at 120 BPM
        let mut deck = loaded(200.0);
        assert_eq!(deck.tempo(), Some(120.0));

        assert_eq!(deck.toggle_sync(Some(140.0)), Ok(true));
        assert!((deck.pitch() - 16.666_666).abs() < 1e-3);
        assert!((120.0 * deck.playback_rate() - 140.0).abs() < 1e-9);
        assert!((deck.playback().playback_rate() - deck.playback_rate()).abs() < 1e-12);

        assert_eq!(deck.toggle_sync(None), Ok(false));
        assert!(!deck.is_synced());
    }

    #[test]
    fn test_sync_without_peer_reverts() {
        let mut deck = loaded(200.0);
        assert_eq!(deck.toggle_sync(None), Err(DeckError::NoSyncPeer));
        assert!(!deck.is_synced());
        assert_eq!(deck.pitch(), 0.0);

        let mut empty = self::deck();
        assert_eq!(empty.toggle_sync(Some(128.0)), Err(DeckError::TempoUnknown));
        assert!(!empty.is_synced());
    }

    #[test]
    fn test_pitch_clamped_to_range() {
        let mut deck = loaded(200.0);
        deck.set_pitch(250.0);
        assert_eq!(deck.pitch(), 100.0);
        deck.set_pitch(-8.0);
        assert!((deck.playback_rate() - 0.92).abs() < 1e-12);
    }

    #[test]
    fn test_manual_loop() {
        let mut deck = loaded(200.0);
        deck.play().unwrap();
        advance(&mut deck, 10.0);
        deck.set_loop_in().unwrap();
        advance(&mut deck, 2.0);
        assert_eq!(deck.set_loop_out(), Ok(LoopPhase::Armed));

        deck.pause();
        assert_eq!(deck.toggle_loop(), Ok(true));
        // Paused deck jumps to the loop start and plays
        assert!(deck.is_playing());
        assert!((deck.position() - 10.0).abs() < 1e-9);
        assert!(deck.playback().is_looping());

        advance(&mut deck, 3.0);
        assert!((deck.position() - 11.0).abs() < 1e-9);

        assert_eq!(deck.toggle_loop(), Ok(false));
        assert_eq!(deck.loop_phase(), LoopPhase::Armed);
    }

    #[test]
    fn test_invalid_loop_is_rejected() {
        let mut deck = loaded(200.0);
        deck.play().unwrap();
        advance(&mut deck, 5.0);
        deck.set_loop_out().unwrap();
        advance(&mut deck, 5.0);
        deck.set_loop_in().unwrap();

        assert!(matches!(deck.toggle_loop(), Err(DeckError::InvalidLoopPoints { .. })));
        assert!(!deck.is_looping());
        assert!(!deck.playback().is_looping());
        assert!(deck.playback().regions().iter().all(|r| !r.is_looping()));
    }

    #[test]
    fn test_loop_length_uses_tempo() {
        let mut deck = loaded(200.0);
        deck.play().unwrap();
        advance(&mut deck, 20.0);
        assert_eq!(deck.set_loop_length(4.0), Ok((20.0, 22.0)));

        // 120 BPM: 16 beats = 8s, past the end from 195s
        advance(&mut deck, 175.0);
        assert!(matches!(deck.set_loop_length(16.0), Err(DeckError::LoopExceedsTrack { .. })));
        assert_eq!(deck.loop_phase(), LoopPhase::NoLoop);
    }

    #[test]
    fn test_loop_length_must_be_positive() {
        let mut deck = loaded(200.0);
        deck.play().unwrap();
        advance(&mut deck, 20.0);

        assert!(matches!(deck.set_loop_length(0.0), Err(DeckError::InvalidLoopPoints { .. })));
        assert!(matches!(deck.set_loop_length(-4.0), Err(DeckError::InvalidLoopPoints { .. })));
        assert_eq!(deck.loop_phase(), LoopPhase::NoLoop);
        assert_eq!(deck.loop_points(), (None, None));
    }

    #[test]
    fn test_hot_cue_set_then_jump() {
        let mut deck = loaded(200.0);
        deck.play().unwrap();
        advance(&mut deck, 12.0);
        assert_eq!(deck.trigger_hot_cue(1, Duration::ZERO), Ok(HotCueAction::Set(12.0)));

        advance(&mut deck, 8.0);
        deck.pause();
        let now = Duration::from_secs(20);
        assert_eq!(deck.trigger_hot_cue(1, now), Ok(HotCueAction::Jump(12.0)));
        assert!((deck.position() - 12.0).abs() < 1e-9);
        assert_eq!(deck.hot_cue(1), Some(12.0));
        assert!(deck.is_playing());
        assert_eq!(deck.preview_deadline(), Some(now + Duration::from_millis(500)));

        assert_eq!(deck.trigger_hot_cue(9, now), Err(DeckError::InvalidHotCueSlot(9)));
    }

    #[test]
    fn test_clear_hot_cues_keeps_loop_region() {
        let mut deck = loaded(200.0);
        deck.play().unwrap();
        deck.trigger_hot_cue(1, Duration::ZERO).unwrap();
        advance(&mut deck, 4.0);
        deck.set_loop_length(4.0).unwrap();
        assert_eq!(deck.playback().regions().len(), 2);

        deck.clear_hot_cues();
        assert!(deck.hot_cues().is_empty());
        assert_eq!(deck.playback().regions().len(), 1);
        assert!(matches!(deck.playback().regions()[0], Region::Loop { .. }));
    }

    #[test]
    fn test_reload_resets_track_state() {
        let mut deck = loaded(200.0);
        deck.play().unwrap();
        advance(&mut deck, 10.0);
        deck.trigger_hot_cue(2, Duration::ZERO).unwrap();
        deck.set_loop_length(4.0).unwrap();
        deck.toggle_loop().unwrap();
        deck.set_filter_cutoff(500.0);
        deck.set_eq(EqBand::Low, 0.5);

        deck.load(test_track("next.mp3", 32, 90.0));
        pump(&mut deck);

        assert!(deck.hot_cues().is_empty());
        assert_eq!(deck.loop_phase(), LoopPhase::NoLoop);
        assert!(!deck.is_looping());
        assert!(!deck.is_playing());
        assert_eq!(deck.filter_cutoff(), 22_000.0);
        assert!(deck.playback().regions().is_empty());
        // EQ is a mixer setting and survives the load
        assert_eq!(deck.eq(EqBand::Low), 0.5);
        assert_eq!(deck.tempo(), Some(125.0));
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut deck = Deck::new(
            DeckId::new(1),
            SimulatedPlayback::new().with_decode_latency(Duration::from_millis(400)),
            &DeckConfig::default(),
        );
        let first = deck.load(test_track("first.mp3", 10, 60.0));
        advance(&mut deck, 0.2);
        let second = deck.load(test_track("second.mp3", 20, 90.0));
        assert_ne!(first, second);

        // First decode completes now but is stale
        advance(&mut deck, 0.2);
        assert!(deck.is_loading());
        assert!(!deck.on_ready(first, 60.0));

        advance(&mut deck, 0.2);
        assert!(deck.is_ready());
        assert_eq!(deck.duration(), 90.0);
        assert_eq!(deck.loaded_track().map(TrackRef::name), Some("second.mp3"));
    }

    #[test]
    fn test_decode_failure_labels_deck() {
        let mut deck = deck();
        deck.load(TrackRef::new("broken.wav", vec![7u8; 16]));
        pump(&mut deck);

        assert_eq!(deck.status(), DeckStatus::Failed);
        assert_eq!(deck.label(), "Error loading: broken.wav");
        assert!(deck.tempo().is_none());
        assert!(matches!(deck.play_pause(), Err(DeckError::DecodeFailed(_))));

        // Still usable afterwards
        deck.load(test_track("fine.wav", 16, 30.0));
        pump(&mut deck);
        assert!(deck.is_ready());
        assert_eq!(deck.label(), "fine.wav");
    }

    #[test]
    fn test_nudge_clamps() {
        let mut deck = loaded(10.0);
        let target = deck.nudge(40.0).unwrap();
        assert!((target - 2.0).abs() < 1e-9);
        assert_eq!(deck.nudge(-1000.0), Ok(0.0));
        assert_eq!(deck.nudge(1000.0), Ok(10.0));
    }

    #[test]
    fn test_render_routes_through_chain() {
        let mut deck = loaded(200.0);
        deck.set_output_gain(0.5);
        deck.play().unwrap();

        let mut out = StereoBuffer::silence(32);
        deck.render(&mut out);
        // Simulated source level 0.5 at gain 0.5
        assert!((out[31].left - 0.25).abs() < 1e-6);
    }
}
