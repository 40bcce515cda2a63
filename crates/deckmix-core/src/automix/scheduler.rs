//! Automix scheduler
//!
//! Runs off the engine clock: a monitor tick every `monitor_interval` checks
//! the active deck and decides when to replace its track or crossfade to the
//! other deck. While a crossfade is in flight the gain ramp is refreshed on
//! every tick and the crossfader position on every UI step.

use std::time::Duration;

use crate::config::AutomixConfig;
use crate::engine::{crossfader_toward, Deck, DeckStatus, EngineEvent, LoadTicket, Mixer, PlaybackEngine};
use crate::error::{AutomixError, AutomixResult};
use crate::types::{DeckId, NUM_DECKS};

use super::queue::AutomixQueue;
use super::transition::Transition;

/// Smallest timer period, so a zero interval cannot stall the clock
const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// First deadline on the `period` grid from `deadline` that lies after `now`
///
/// Missed deadlines are skipped, not replayed.
fn next_deadline(deadline: Duration, now: Duration, period: Duration) -> Duration {
    if deadline > now {
        return deadline;
    }
    let period_ns = period.as_nanos().max(1);
    let steps = (now - deadline).as_nanos() / period_ns + 1;
    let nanos = deadline.as_nanos().saturating_add(steps.saturating_mul(period_ns));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Everything the scheduler may touch during one call
pub struct MixContext<'a, P: PlaybackEngine> {
    pub decks: &'a mut [Deck<P>; NUM_DECKS],
    pub mixer: &'a mut Mixer,
    pub events: &'a mut Vec<EngineEvent>,
    pub now: Duration,
}

/// Scheduler state as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomixState {
    Idle,
    Running,
    Crossfading,
}

/// What to do once an automix load completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Start the active deck and bring the crossfader to it
    StartPlayback,
    /// Begin the crossfade to the freshly loaded deck
    Crossfade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Awaiting {
    ticket: LoadTicket,
    action: PendingAction,
}

/// Sequences the queue into a continuous set
#[derive(Debug, Clone)]
pub struct AutomixScheduler {
    config: AutomixConfig,
    queue: AutomixQueue,
    running: bool,
    active: DeckId,
    next_monitor: Duration,
    next_ui_step: Duration,
    transition: Option<Transition>,
    awaiting: Option<Awaiting>,
}

impl AutomixScheduler {
    pub fn new(config: AutomixConfig) -> Self {
        Self {
            config,
            queue: AutomixQueue::new(),
            running: false,
            active: DeckId::new(0),
            next_monitor: Duration::ZERO,
            next_ui_step: Duration::ZERO,
            transition: None,
            awaiting: None,
        }
    }

    pub fn config(&self) -> &AutomixConfig {
        &self.config
    }

    pub fn queue(&self) -> &AutomixQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut AutomixQueue {
        &mut self.queue
    }

    pub fn state(&self) -> AutomixState {
        match (self.running, &self.transition) {
            (false, _) => AutomixState::Idle,
            (true, None) => AutomixState::Running,
            (true, Some(_)) => AutomixState::Crossfading,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Deck currently treated as the primary output
    pub fn active_deck(&self) -> DeckId {
        self.active
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    /// Deck and action waiting on a decode, if any
    pub fn awaiting(&self) -> Option<(DeckId, PendingAction)> {
        self.awaiting.map(|a| (a.ticket.deck(), a.action))
    }

    /// When the next monitor tick is due
    pub fn next_monitor(&self) -> Duration {
        self.next_monitor
    }

    // --- Start / stop ---

    /// Start automix
    ///
    /// Needs two tracks: two in the queue, or one ready on each deck. A
    /// ready, paused active deck starts playing; an empty one is filled from
    /// the queue and starts once decoded.
    pub fn start<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>) -> AutomixResult<()> {
        if self.running {
            log::debug!("Automix already running");
            return Ok(());
        }

        let ready_decks = ctx.decks.iter().filter(|deck| deck.is_ready()).count();
        if self.queue.len() < 2 && ready_decks < NUM_DECKS {
            let available = self.queue.len().max(ready_decks);
            log::warn!("Automix requires at least two tracks loaded in the queue or on the decks");
            return Err(AutomixError::NotEnoughTracks { available });
        }

        self.running = true;
        self.transition = None;
        self.awaiting = None;
        self.next_monitor = ctx.now + self.monitor_period();
        log::info!("Automix started (active: {})", self.active);
        ctx.events.push(EngineEvent::AutomixStarted);

        let active = self.active;
        let deck = &mut ctx.decks[active.index()];
        if deck.is_ready() {
            // A cue preview is about to pause itself
            if !deck.is_playing() || deck.preview_deadline().is_some() {
                if let Err(e) = deck.play() {
                    log::warn!("{}: Cannot start playback: {}", active, e);
                    return Ok(());
                }
                self.focus(ctx, active);
            }
        } else if deck.is_loading() {
            if let Some(ticket) = deck.current_ticket() {
                self.awaiting = Some(Awaiting {
                    ticket,
                    action: PendingAction::StartPlayback,
                });
            }
        } else if !self.queue.is_empty() {
            match self.pull_next(ctx, active) {
                Ok(ticket) => {
                    self.awaiting = Some(Awaiting {
                        ticket,
                        action: PendingAction::StartPlayback,
                    })
                }
                Err(e) => log::warn!("Automix could not fill {}: {}", active, e),
            }
        }
        Ok(())
    }

    /// Stop automix
    ///
    /// Abandons any crossfade in progress and hands the gains back to the
    /// crossfader. Decks keep playing.
    pub fn stop<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>) -> AutomixResult<()> {
        if !self.running {
            return Err(AutomixError::NotRunning);
        }
        self.halt(ctx, "stopped by user");
        Ok(())
    }

    /// Start when idle, stop when running; returns the new running state
    pub fn toggle<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>) -> AutomixResult<bool> {
        if self.running {
            self.stop(ctx)?;
        } else {
            self.start(ctx)?;
        }
        Ok(self.running)
    }

    fn halt<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>, reason: &str) {
        self.running = false;
        self.awaiting = None;
        if self.transition.take().is_some() {
            log::info!("Abandoning crossfade in progress");
            ctx.mixer.clear_ramp();
            ctx.mixer.apply(ctx.decks);
        }
        log::info!("Automix stopped: {}", reason);
        ctx.events.push(EngineEvent::AutomixStopped {
            reason: reason.to_string(),
        });
    }

    // --- Clock ---

    fn monitor_period(&self) -> Duration {
        self.config.monitor_interval().max(MIN_TIMER_PERIOD)
    }

    fn ui_period(&self) -> Duration {
        self.config.ui_step().max(MIN_TIMER_PERIOD)
    }

    /// Advance to `ctx.now`: refresh a running crossfade, then run the
    /// monitor if due
    pub fn tick<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>) {
        if !self.running {
            return;
        }

        self.drive_transition(ctx);

        if ctx.now < self.next_monitor {
            return;
        }
        self.next_monitor = next_deadline(self.next_monitor, ctx.now, self.monitor_period());

        if self.transition.is_some() {
            log::debug!("Monitor tick skipped during crossfade");
        } else {
            self.monitor(ctx);
        }
    }

    fn monitor<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>) {
        // A user load may have superseded the one we were waiting for
        if let Some(awaiting) = self.awaiting {
            let deck = &ctx.decks[awaiting.ticket.deck().index()];
            if deck.current_ticket() != Some(awaiting.ticket) {
                log::debug!("Automix load on {} was superseded", awaiting.ticket.deck());
                self.awaiting = None;
            }
        }

        let active = self.active;
        let inactive = active.other();

        let deck = &ctx.decks[active.index()];
        if deck.is_loading() {
            log::debug!("{} still loading", active);
            return;
        }

        let finished = !deck.is_playing() && deck.is_at_end(self.config.end_tolerance_secs);
        if !deck.is_ready() || finished {
            log::warn!("{} is empty or finished, loading next track", active);
            ctx.decks[active.index()].stop();
            match self.pull_next(ctx, active) {
                Ok(ticket) => {
                    self.awaiting = Some(Awaiting {
                        ticket,
                        action: PendingAction::StartPlayback,
                    });
                }
                Err(e) => {
                    log::error!("No more tracks for automix ({}), stopping", e);
                    self.halt(ctx, &e.to_string());
                }
            }
            return;
        }

        let remaining = deck.remaining();
        if remaining <= self.config.min_remaining_secs
            || remaining > self.config.trigger_window_secs()
        {
            return;
        }

        let next = &ctx.decks[inactive.index()];
        if next.is_loading() {
            log::debug!("{} still loading, crossfade waits", inactive);
        } else if !next.is_ready() {
            log::info!("{} needs a track. Loading next from queue", inactive);
            match self.pull_next(ctx, inactive) {
                Ok(ticket) => {
                    self.awaiting = Some(Awaiting {
                        ticket,
                        action: PendingAction::Crossfade,
                    });
                }
                Err(e) => log::warn!("Cannot crossfade to {} yet: {}", inactive, e),
            }
        } else if next.is_playing() {
            log::info!("{} is already playing, waiting for next cycle", inactive);
        } else {
            self.begin_transition(ctx);
        }
    }

    /// Load the next eligible queue track onto `deck`
    fn pull_next<P: PlaybackEngine>(
        &mut self,
        ctx: &mut MixContext<'_, P>,
        deck: DeckId,
    ) -> AutomixResult<LoadTicket> {
        let other = &ctx.decks[deck.other().index()];
        let exclude = other
            .loaded_track()
            .filter(|_| other.status() != DeckStatus::Failed)
            .map(|track| track.key().clone());

        let track = self.queue.next_eligible(exclude.as_ref())?;
        log::info!("Loading \"{}\" into {} for automix", track.name(), deck);
        Ok(ctx.decks[deck.index()].load(track))
    }

    /// Bring the crossfader fully to `deck`
    fn focus<P: PlaybackEngine>(&self, ctx: &mut MixContext<'_, P>, deck: DeckId) {
        ctx.mixer.clear_ramp();
        ctx.mixer.set_crossfader(crossfader_toward(deck));
        ctx.mixer.apply(ctx.decks);
    }

    // --- Decode completions ---

    /// A deck finished decoding
    pub fn on_deck_ready<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>, ticket: LoadTicket) {
        let awaiting = match self.awaiting {
            Some(awaiting) if awaiting.ticket == ticket => awaiting,
            _ => return,
        };
        self.awaiting = None;
        if !self.running {
            return;
        }

        let deck = ticket.deck();
        match awaiting.action {
            PendingAction::StartPlayback => match ctx.decks[deck.index()].play() {
                Ok(()) => {
                    log::info!("Automix playing {}", deck);
                    self.focus(ctx, deck);
                }
                Err(e) => log::warn!("{}: Cannot start playback: {}", deck, e),
            },
            PendingAction::Crossfade => {
                if self.transition.is_none() && !ctx.decks[deck.index()].is_playing() {
                    self.begin_transition(ctx);
                }
            }
        }
    }

    /// A deck failed to decode
    pub fn on_deck_failed(&mut self, ticket: LoadTicket) {
        if self.awaiting.map(|a| a.ticket) == Some(ticket) {
            log::warn!("Automix load on {} failed, retrying on next tick", ticket.deck());
            self.awaiting = None;
        }
    }

    // --- Transition ---

    fn begin_transition<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>) {
        let from = self.active;
        let to = from.other();

        if let Err(e) = ctx.decks[to.index()].play() {
            log::warn!("{}: Cannot start crossfade: {}", to, e);
            return;
        }

        log::info!("Starting automix crossfade from {} to {}", from, to);
        self.transition = Some(Transition::new(
            from,
            ctx.now,
            self.config.crossfade(),
            ctx.mixer.crossfader(),
            ctx.mixer.output_gain(from),
            ctx.mixer.output_gain(to),
        ));
        self.next_ui_step = ctx.now + self.ui_period();
        ctx.events.push(EngineEvent::CrossfadeStarted { from, to });

        self.drive_transition(ctx);
    }

    /// Refresh gains (and the crossfader on UI steps); finish when done
    fn drive_transition<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>) {
        let Some(transition) = self.transition.take() else {
            return;
        };
        let now = ctx.now;

        let to_volume = ctx.decks[transition.to().index()].volume();
        ctx.mixer.set_ramp(transition.gains_at(now, to_volume));

        if now >= self.next_ui_step {
            ctx.mixer.set_crossfader(transition.crossfader_at(now));
            self.next_ui_step = next_deadline(self.next_ui_step, now, self.ui_period());
        }

        if transition.is_complete(now) {
            self.finish_transition(ctx, &transition);
        } else {
            ctx.mixer.apply(ctx.decks);
            self.transition = Some(transition);
        }
    }

    fn finish_transition<P: PlaybackEngine>(&mut self, ctx: &mut MixContext<'_, P>, transition: &Transition) {
        let (from, to) = (transition.from(), transition.to());
        ctx.decks[from.index()].pause();
        self.active = to;

        ctx.mixer.clear_ramp();
        ctx.mixer.set_crossfader(transition.crossfader_target());
        ctx.mixer.apply(ctx.decks);

        log::info!("Crossfade finished, switched active deck to {}", to);
        ctx.events.push(EngineEvent::CrossfadeFinished { active: to });
    }
}
