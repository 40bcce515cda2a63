//! Deckmix Core - dual-deck live mixing engine with an automix scheduler
//!
//! The crate decides what is audible on each deck at every instant (EQ,
//! filter, gain, crossfader) and can sequence a queue of tracks into a
//! continuous set without manual deck operation.
//!
//! Decoding and low-level playback are external: hosts implement
//! [`engine::PlaybackEngine`] per deck and drive [`engine::MixEngine`] with
//! UI events, clock ticks and decode completions.

pub mod automix;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod track;
pub mod types;

pub use types::*;
