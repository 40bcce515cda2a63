//! Mixing engine - decks, signal chains, mixer and the playback contract
//!
//! - Deck: transport, tempo, loops and hot cues for one track
//! - SignalChain: per-deck EQ, filter and gain
//! - Mixer: equal-power crossfader and master volume
//! - PlaybackEngine: the external decoder/player each deck drives
//! - MixEngine: ties everything together behind one entry point

mod deck;
mod engine;
mod loop_region;
mod mixer;
mod playback;
mod signal_chain;
mod simulated;
mod tempo;

pub use deck::*;
pub use engine::*;
pub use loop_region::*;
pub use mixer::*;
pub use playback::*;
pub use signal_chain::*;
pub use simulated::*;
pub use tempo::*;
