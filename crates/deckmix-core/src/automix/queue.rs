//! Automix queue with a rotating read cursor

use crate::error::{AutomixError, AutomixResult};
use crate::track::{TrackKey, TrackRef};

/// Ordered, duplicate-free list of tracks for automix
///
/// The cursor marks where the next selection scan starts and wraps modulo
/// the queue length.
#[derive(Debug, Clone, Default)]
pub struct AutomixQueue {
    tracks: Vec<TrackRef>,
    cursor: usize,
}

impl AutomixQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track unless one with the same (name, size) is queued
    ///
    /// Returns true if the track was added.
    pub fn insert(&mut self, track: TrackRef) -> bool {
        if self.contains(track.key()) {
            log::debug!("Skipping duplicate queue entry {}", track.key());
            return false;
        }
        log::info!(
            "Added \"{}\" to automix queue. Total: {} tracks",
            track.name(),
            self.tracks.len() + 1
        );
        self.tracks.push(track);
        true
    }

    /// Insert several tracks; returns how many were new
    pub fn extend<I: IntoIterator<Item = TrackRef>>(&mut self, tracks: I) -> usize {
        let mut added = 0;
        for track in tracks {
            if self.insert(track) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, key: &TrackKey) -> bool {
        self.tracks.iter().any(|track| track.key() == key)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackRef> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackRef> {
        self.tracks.iter()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Empty the queue and rewind the cursor
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = 0;
        log::info!("Automix queue cleared");
    }

    /// Pick the next track, skipping the one on the other deck
    ///
    /// Scans from the cursor; a candidate matching `exclude` by (name, size)
    /// is skipped. The cursor moves past the chosen entry.
    pub fn next_eligible(&mut self, exclude: Option<&TrackKey>) -> AutomixResult<TrackRef> {
        if self.tracks.is_empty() {
            return Err(AutomixError::QueueEmpty);
        }

        let len = self.tracks.len();
        for offset in 0..len {
            let index = (self.cursor + offset) % len;
            let candidate = &self.tracks[index];
            if exclude == Some(candidate.key()) {
                log::debug!("Skipping \"{}\": already on the other deck", candidate.name());
                continue;
            }
            self.cursor = (index + 1) % len;
            return Ok(candidate.clone());
        }

        Err(AutomixError::NoEligibleTrack)
    }
}
