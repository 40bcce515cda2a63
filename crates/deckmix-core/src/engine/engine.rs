//! Mix engine - the single entry point for UI input, clock ticks and audio
//!
//! The engine is sans-IO and single-threaded. The host feeds it:
//! - UI operations (transport, EQ, loops, queue, automix)
//! - `advance(now)` with a monotonic time since session start
//! - `render(bus)` for each audio block
//!
//! and reads back state plus [`EngineEvent`]s for re-rendering.

use std::time::Duration;

use crate::automix::{AutomixQueue, AutomixScheduler, MixContext};
use crate::config::EngineConfig;
use crate::error::{DeckResult, EngineError, EngineResult};
use crate::track::TrackRef;
use crate::types::{DeckId, StereoBuffer, NUM_DECKS};

use super::deck::Deck;
use super::loop_region::{HotCueAction, LoopPhase};
use super::mixer::Mixer;
use super::playback::{LoadTicket, PlaybackEngine, PlaybackEvent};
use super::signal_chain::EqBand;

/// Notifications for the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Queue contents changed
    QueueChanged { len: usize },
    /// A deck finished decoding
    DeckReady { deck: DeckId, tempo: Option<f64> },
    /// A deck's content could not be decoded
    DeckLoadFailed { deck: DeckId, reason: String },
    AutomixStarted,
    /// Automix stopped, by request or because the queue ran out
    AutomixStopped { reason: String },
    CrossfadeStarted { from: DeckId, to: DeckId },
    CrossfadeFinished { active: DeckId },
}

/// Two decks, the mixer and the automix scheduler
pub struct MixEngine<P: PlaybackEngine> {
    config: EngineConfig,
    decks: [Deck<P>; NUM_DECKS],
    mixer: Mixer,
    automix: AutomixScheduler,
    events: Vec<EngineEvent>,
    /// Time of the last `advance`
    now: Duration,
    /// Per-deck render scratch buffer
    scratch: StereoBuffer,
}

impl<P: PlaybackEngine> MixEngine<P> {
    /// Create an engine, building one playback engine per deck
    pub fn new(config: EngineConfig, mut playback: impl FnMut(DeckId) -> P) -> Self {
        let mut decks = DeckId::all().map(|id| Deck::new(id, playback(id), &config.deck));
        let mut mixer = Mixer::new(config.initial_crossfader, config.master_volume);
        mixer.apply(&mut decks);

        log::info!(
            "Mix engine ready (crossfader {:.2}, master {:.2})",
            mixer.crossfader(),
            mixer.master_volume()
        );

        Self {
            automix: AutomixScheduler::new(config.automix.clone()),
            config,
            decks,
            mixer,
            events: Vec::new(),
            now: Duration::ZERO,
            scratch: StereoBuffer::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Engine time of the last `advance`
    pub fn now(&self) -> Duration {
        self.now
    }

    fn deck_id(index: usize) -> EngineResult<DeckId> {
        DeckId::try_new(index).ok_or(EngineError::InvalidDeck(index))
    }

    /// Get a deck by index
    pub fn deck(&self, index: usize) -> EngineResult<&Deck<P>> {
        let id = Self::deck_id(index)?;
        Ok(&self.decks[id.index()])
    }

    /// Direct access to a deck's playback engine
    pub fn playback_mut(&mut self, index: usize) -> EngineResult<&mut P> {
        let id = Self::deck_id(index)?;
        Ok(self.decks[id.index()].playback_mut())
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn automix(&self) -> &AutomixScheduler {
        &self.automix
    }

    pub fn queue(&self) -> &AutomixQueue {
        self.automix.queue()
    }

    /// Take all events raised since the last call
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run a deck operation, logging and wrapping a rejection
    fn with_deck<T>(
        &mut self,
        index: usize,
        op: impl FnOnce(&mut Deck<P>, Duration) -> DeckResult<T>,
    ) -> EngineResult<T> {
        let id = Self::deck_id(index)?;
        let now = self.now;
        op(&mut self.decks[id.index()], now).map_err(|source| {
            log::warn!("{}: {}", id, source);
            EngineError::Deck { deck: id, source }
        })
    }

    /// The scheduler plus everything it may touch
    fn split(&mut self) -> (&mut AutomixScheduler, MixContext<'_, P>) {
        let ctx = MixContext {
            decks: &mut self.decks,
            mixer: &mut self.mixer,
            events: &mut self.events,
            now: self.now,
        };
        (&mut self.automix, ctx)
    }

    // --- Intake and queue ---

    /// Accept tracks from the file picker or a drop
    ///
    /// The first track goes onto `target` when a deck received the drop;
    /// all of them join the queue. Returns how many were new to the queue.
    pub fn intake(&mut self, tracks: Vec<TrackRef>, target: Option<usize>) -> EngineResult<usize> {
        if let (Some(index), Some(first)) = (target, tracks.first()) {
            self.load_track(index, first.clone())?;
        }
        let added = self.automix.queue_mut().extend(tracks);
        self.events.push(EngineEvent::QueueChanged {
            len: self.automix.queue().len(),
        });
        Ok(added)
    }

    /// Add one track to the queue; false if already queued
    pub fn enqueue(&mut self, track: TrackRef) -> bool {
        let added = self.automix.queue_mut().insert(track);
        if added {
            self.events.push(EngineEvent::QueueChanged {
                len: self.automix.queue().len(),
            });
        }
        added
    }

    /// Empty the queue; decks keep their tracks
    pub fn clear_queue(&mut self) {
        self.automix.queue_mut().clear();
        self.events.push(EngineEvent::QueueChanged { len: 0 });
    }

    /// Load a track onto a deck
    pub fn load_track(&mut self, index: usize, track: TrackRef) -> EngineResult<LoadTicket> {
        let id = Self::deck_id(index)?;
        Ok(self.decks[id.index()].load(track))
    }

    /// Load queue entry `queue_index` onto a deck, leaving the cursor alone
    pub fn load_from_queue(&mut self, queue_index: usize, deck: usize) -> EngineResult<LoadTicket> {
        let track = self
            .automix
            .queue()
            .get(queue_index)
            .cloned()
            .ok_or(EngineError::InvalidQueueIndex(queue_index))?;
        log::info!("Loaded \"{}\" to deck {} from playlist", track.name(), deck + 1);
        self.load_track(deck, track)
    }

    // --- Transport ---

    pub fn play_pause(&mut self, deck: usize) -> EngineResult<bool> {
        self.with_deck(deck, |d, _| d.play_pause())
    }

    pub fn cue(&mut self, deck: usize) -> EngineResult<()> {
        self.with_deck(deck, |d, now| d.cue(now))
    }

    /// Jog wheel movement in wheel units
    pub fn nudge(&mut self, deck: usize, delta: f64) -> EngineResult<f64> {
        self.with_deck(deck, |d, _| d.nudge(delta))
    }

    pub fn set_pitch(&mut self, deck: usize, percent: f64) -> EngineResult<()> {
        self.with_deck(deck, |d, _| {
            d.set_pitch(percent);
            Ok(())
        })
    }

    /// Toggle sync of `deck` to the other deck's tempo
    pub fn toggle_sync(&mut self, deck: usize) -> EngineResult<bool> {
        let id = Self::deck_id(deck)?;
        let peer = self.decks[id.other().index()].tempo();
        self.with_deck(deck, |d, _| d.toggle_sync(peer))
    }

    // --- Mixer ---

    /// Deck volume fader; gains are recomputed immediately
    pub fn set_volume(&mut self, deck: usize, volume: f32) -> EngineResult<()> {
        let id = Self::deck_id(deck)?;
        self.decks[id.index()].set_volume(volume);
        self.mixer.apply(&mut self.decks);
        Ok(())
    }

    pub fn set_crossfader(&mut self, x: f32) {
        self.mixer.set_crossfader(x);
        self.mixer.apply(&mut self.decks);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.mixer.set_master_volume(volume);
    }

    pub fn set_eq(&mut self, deck: usize, band: EqBand, value: f32) -> EngineResult<()> {
        self.with_deck(deck, |d, _| {
            d.set_eq(band, value);
            Ok(())
        })
    }

    pub fn set_filter_cutoff(&mut self, deck: usize, hz: f32) -> EngineResult<()> {
        self.with_deck(deck, |d, _| {
            d.set_filter_cutoff(hz);
            Ok(())
        })
    }

    /// Output gain currently applied to a deck
    pub fn output_gain(&self, deck: usize) -> EngineResult<f32> {
        Ok(self.deck(deck)?.output_gain())
    }

    // --- Loops and hot cues ---

    pub fn set_loop_in(&mut self, deck: usize) -> EngineResult<LoopPhase> {
        self.with_deck(deck, |d, _| d.set_loop_in())
    }

    pub fn set_loop_out(&mut self, deck: usize) -> EngineResult<LoopPhase> {
        self.with_deck(deck, |d, _| d.set_loop_out())
    }

    pub fn set_loop_length(&mut self, deck: usize, beats: f64) -> EngineResult<(f64, f64)> {
        self.with_deck(deck, |d, _| d.set_loop_length(beats))
    }

    pub fn toggle_loop(&mut self, deck: usize) -> EngineResult<bool> {
        self.with_deck(deck, |d, _| d.toggle_loop())
    }

    pub fn trigger_hot_cue(&mut self, deck: usize, slot: u8) -> EngineResult<HotCueAction> {
        self.with_deck(deck, |d, now| d.trigger_hot_cue(slot, now))
    }

    pub fn clear_hot_cues(&mut self, deck: usize) -> EngineResult<()> {
        self.with_deck(deck, |d, _| {
            d.clear_hot_cues();
            Ok(())
        })
    }

    // --- Automix ---

    pub fn start_automix(&mut self) -> EngineResult<()> {
        let (automix, mut ctx) = self.split();
        automix.start(&mut ctx).map_err(|e| {
            log::warn!("Automix: {}", e);
            EngineError::from(e)
        })
    }

    pub fn stop_automix(&mut self) -> EngineResult<()> {
        let (automix, mut ctx) = self.split();
        Ok(automix.stop(&mut ctx)?)
    }

    /// Start automix when idle, stop it when running
    pub fn toggle_automix(&mut self) -> EngineResult<bool> {
        let (automix, mut ctx) = self.split();
        automix.toggle(&mut ctx).map_err(|e| {
            log::warn!("Automix: {}", e);
            EngineError::from(e)
        })
    }

    // --- Clock ---

    /// Advance engine time to `now`
    ///
    /// Forwards elapsed time to the playback engines, applies their events
    /// (dropping stale load completions), fires preview timers and drives
    /// automix.
    pub fn advance(&mut self, now: Duration) {
        let elapsed = now.saturating_sub(self.now);
        if now < self.now {
            log::debug!("Clock went backwards ({:?} < {:?}), ignoring", now, self.now);
        }
        self.now = self.now.max(now);

        for deck in &mut self.decks {
            deck.playback_mut().elapse(elapsed);
        }

        for id in DeckId::all() {
            let events: Vec<PlaybackEvent> =
                std::iter::from_fn(|| self.decks[id.index()].playback_mut().poll_event()).collect();
            for event in events {
                self.handle_playback_event(id, event);
            }
        }

        for deck in &mut self.decks {
            deck.fire_timers(self.now);
        }

        let (automix, mut ctx) = self.split();
        automix.tick(&mut ctx);
    }

    fn handle_playback_event(&mut self, id: DeckId, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Ready { ticket, duration } => {
                if !self.decks[id.index()].on_ready(ticket, duration) {
                    return;
                }
                self.events.push(EngineEvent::DeckReady {
                    deck: id,
                    tempo: self.decks[id.index()].tempo(),
                });
                let (automix, mut ctx) = self.split();
                automix.on_deck_ready(&mut ctx, ticket);
            }
            PlaybackEvent::DecodeFailed { ticket, reason } => {
                if !self.decks[id.index()].on_decode_failed(ticket, &reason) {
                    return;
                }
                self.events.push(EngineEvent::DeckLoadFailed { deck: id, reason });
                self.automix.on_deck_failed(ticket);
            }
            PlaybackEvent::Finished => self.decks[id.index()].on_finished(),
            PlaybackEvent::UserSeek(time) => self.decks[id.index()].on_user_seek(time),
            // Position is read from the playback engine on demand
            PlaybackEvent::Position(_) => {}
        }
    }

    // --- Audio ---

    /// Render both decks into `bus` and apply master volume
    pub fn render(&mut self, bus: &mut StereoBuffer) {
        bus.fill_silence();
        self.scratch.resize(bus.len());
        for deck in &mut self.decks {
            deck.render(&mut self.scratch);
            bus.add_buffer(&self.scratch);
        }
        self.mixer.process_master(bus);
    }
}

impl<P: PlaybackEngine + Default> MixEngine<P> {
    /// Engine with default-constructed playback engines
    pub fn with_default_playback(config: EngineConfig) -> Self {
        Self::new(config, |_| P::default())
    }
}
