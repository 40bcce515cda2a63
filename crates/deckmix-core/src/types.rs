//! Common types for Deckmix
//!
//! Fundamental audio types shared by the signal chain, the mixer and the
//! playback contract: stereo samples, stereo buffers and deck identifiers.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Processing sample rate used for filter coefficient design
pub const SAMPLE_RATE: u32 = 48000;

/// Number of decks in the mixer
pub const NUM_DECKS: usize = 2;

/// Audio sample type (32-bit float for processing)
pub type Sample = f32;

/// A single stereo sample (left and right channels)
///
/// `#[repr(C)]` keeps the layout `[left, right]` so a slice of samples can be
/// viewed as interleaved `f32` without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono sample (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Get the peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

impl std::ops::MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, factor: Sample) {
        self.left *= factor;
        self.right *= factor;
    }
}

/// A buffer of stereo samples
///
/// Blocks of deck audio travel through the signal chain and onto the shared
/// output bus in this form.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create a buffer with every frame set to `sample`
    pub fn filled(len: usize, sample: StereoSample) -> Self {
        Self {
            samples: vec![sample; len],
        }
    }

    /// Get the number of stereo samples in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Resize the buffer, filling with silence if growing
    pub fn resize(&mut self, new_len: usize) {
        self.samples.resize(new_len, StereoSample::silence());
    }

    /// Fill the buffer with silence
    pub fn fill_silence(&mut self) {
        self.samples.fill(StereoSample::silence());
    }

    /// Fill the buffer with a constant frame
    pub fn fill(&mut self, sample: StereoSample) {
        self.samples.fill(sample);
    }

    /// Zero-copy view of the samples as interleaved f32 [L, R, L, R, ...]
    ///
    /// Hosts hand this slice straight to their output device.
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.samples)
    }

    /// Add another buffer to this one (summing samples)
    pub fn add_buffer(&mut self, other: &StereoBuffer) {
        assert_eq!(self.len(), other.len(), "Buffer lengths must match");
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            *dst += *src;
        }
    }

    /// Scale all samples by a factor
    pub fn scale(&mut self, factor: Sample) {
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    /// Get an iterator over the samples
    pub fn iter(&self) -> impl Iterator<Item = &StereoSample> {
        self.samples.iter()
    }

    /// Get a mutable iterator over the samples
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StereoSample> {
        self.samples.iter_mut()
    }

    /// Get the peak amplitude in the buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.peak()).fold(0.0, Sample::max)
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

/// Deck identifier (0-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeckId(pub usize);

impl DeckId {
    /// Create a new deck ID (panics if >= NUM_DECKS)
    pub fn new(id: usize) -> Self {
        assert!(id < NUM_DECKS, "Deck ID must be less than {}", NUM_DECKS);
        Self(id)
    }

    /// Create a deck ID, or `None` if out of range
    pub fn try_new(id: usize) -> Option<Self> {
        (id < NUM_DECKS).then_some(Self(id))
    }

    /// Both decks in index order
    pub fn all() -> [DeckId; NUM_DECKS] {
        std::array::from_fn(DeckId)
    }

    /// Index into per-deck arrays
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }

    /// The deck on the other side of the crossfader
    #[inline]
    pub fn other(&self) -> Self {
        Self(NUM_DECKS - 1 - self.0)
    }

    /// Get the deck number (1-2 for display)
    pub fn display_number(&self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deck {}", self.display_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_sample_operations() {
        let a = StereoSample::new(1.0, 2.0);
        let b = StereoSample::new(0.5, 0.5);

        let sum = a + b;
        assert_eq!(sum.left, 1.5);
        assert_eq!(sum.right, 2.5);

        let scaled = a * 0.5;
        assert_eq!(scaled.left, 0.5);
        assert_eq!(scaled.right, 1.0);
    }

    #[test]
    fn test_interleaved_view() {
        let buffer = StereoBuffer::filled(2, StereoSample::new(0.25, -0.5));
        assert_eq!(buffer.as_interleaved(), &[0.25, -0.5, 0.25, -0.5]);
    }

    #[test]
    fn test_deck_id_other_and_display() {
        let a = DeckId::new(0);
        assert_eq!(a.other(), DeckId::new(1));
        assert_eq!(a.other().other(), a);
        assert_eq!(a.to_string(), "Deck 1");
        assert_eq!(DeckId::try_new(1), Some(DeckId::new(1)));
        assert_eq!(DeckId::try_new(2), None);
        assert_eq!(DeckId::all(), [DeckId::new(0), DeckId::new(1)]);
    }
}
