//! Track references handed over by file intake
//!
//! A [`TrackRef`] is an opaque, cheaply clonable handle to audio content.
//! The only identity available for de-duplication is the (name, byte size)
//! pair, captured as a [`TrackKey`].

use std::fmt;
use std::sync::Arc;

/// Identity of a track for de-duplication purposes
///
/// Two tracks are considered the same iff name and size both match. This is
/// not a strong identity, but it is all file intake provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub name: String,
    pub size: u64,
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.size)
    }
}

/// Handle to loaded audio content
#[derive(Debug, Clone)]
pub struct TrackRef {
    key: TrackKey,
    /// Raw encoded content, shared between queue and decks
    bytes: Arc<[u8]>,
    /// Duration in seconds when a probe already knows it
    duration_hint: Option<f64>,
}

impl TrackRef {
    /// Create a track reference from intake content
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            key: TrackKey {
                name: name.into(),
                size: bytes.len() as u64,
            },
            bytes,
            duration_hint: None,
        }
    }

    /// Attach a probed duration (seconds)
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_hint = Some(secs);
        self
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn size(&self) -> u64 {
        self.key.size
    }

    pub fn key(&self) -> &TrackKey {
        &self.key
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn duration_hint(&self) -> Option<f64> {
        self.duration_hint
    }

    /// True if both references denote the same track by (name, size)
    pub fn same_track(&self, other: &TrackRef) -> bool {
        self.key == other.key
    }
}

#[cfg(test)]
pub(crate) fn test_track(name: &str, size: usize, duration: f64) -> TrackRef {
    TrackRef::new(name, vec![0u8; size]).with_duration(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_name_and_size() {
        let a = test_track("intro.mp3", 100, 200.0);
        let b = test_track("intro.mp3", 100, 90.0);
        let c = test_track("intro.mp3", 101, 200.0);
        let d = test_track("outro.mp3", 100, 200.0);

        assert!(a.same_track(&b));
        assert!(!a.same_track(&c));
        assert!(!a.same_track(&d));
    }

    #[test]
    fn test_size_comes_from_content() {
        let track = TrackRef::new("a.wav", vec![1u8, 2, 3]);
        assert_eq!(track.size(), 3);
        assert_eq!(track.bytes(), &[1, 2, 3]);
        assert!(track.duration_hint().is_none());
    }
}
