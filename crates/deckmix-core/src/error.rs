//! Error types for deck, automix and engine operations
//!
//! Every variant here is locally recoverable: a rejected operation is a
//! no-op that leaves state untouched, and a failure on one deck never
//! affects the other.

use thiserror::Error;

use crate::types::DeckId;

/// Rejections and failures of a single deck
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeckError {
    /// No track has been loaded onto the deck
    #[error("No track loaded")]
    NoTrackLoaded,

    /// A track is loaded but still decoding (duration unknown)
    #[error("Track is still loading")]
    NotReady,

    /// Loop in/out points missing or out of order
    #[error("Loop points not set correctly (in: {start:?}, out: {end:?}); set IN and OUT with IN < OUT")]
    InvalidLoopPoints {
        start: Option<f64>,
        end: Option<f64>,
    },

    /// A beat loop would run past the end of the track
    #[error("Loop end {end:.2}s exceeds track duration {duration:.2}s")]
    LoopExceedsTrack { end: f64, duration: f64 },

    /// The deck has no estimated tempo
    #[error("Tempo not available for this deck")]
    TempoUnknown,

    /// No other deck has a known tempo to sync to
    #[error("No other deck with a known tempo to sync to")]
    NoSyncPeer,

    /// Hot cue slot outside the configured range
    #[error("Hot cue slot {0} does not exist")]
    InvalidHotCueSlot(u8),

    /// Content could not be decoded
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
}

/// Result type for deck operations
pub type DeckResult<T> = Result<T, DeckError>;

/// Automix scheduler conditions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomixError {
    /// Start requested with fewer than two available tracks
    #[error("Automix requires at least two tracks in the queue or on the decks (available: {available})")]
    NotEnoughTracks { available: usize },

    /// The queue has no tracks at all
    #[error("Automix queue is empty")]
    QueueEmpty,

    /// Every queued track is already on the other deck
    #[error("No suitable next track in the automix queue")]
    NoEligibleTrack,

    /// Operation needs a running scheduler
    #[error("Automix is not running")]
    NotRunning,
}

/// Result type for automix operations
pub type AutomixResult<T> = Result<T, AutomixError>;

/// Errors surfaced by the engine facade
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Deck index out of range
    #[error("Deck index {0} out of range")]
    InvalidDeck(usize),

    /// Queue index out of range
    #[error("Queue index {0} out of range")]
    InvalidQueueIndex(usize),

    /// A deck rejected the operation
    #[error("{deck}: {source}")]
    Deck {
        deck: DeckId,
        #[source]
        source: DeckError,
    },

    /// The automix scheduler rejected the operation
    #[error("Automix: {0}")]
    Automix(#[from] AutomixError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
