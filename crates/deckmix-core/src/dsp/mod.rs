//! Signal processing primitives used by the deck signal chain

pub mod biquad;

pub use biquad::{BiquadCoeffs, BiquadState};

/// Convert a gain in dB to a linear factor
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}
