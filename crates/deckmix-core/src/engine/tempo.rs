//! Tempo estimation and pitch math
//!
//! The estimate is a deterministic stand-in for beat detection: it depends
//! on track duration only, never on audio content. Sync math downstream
//! relies on its range and determinism, so the formula is kept exact.

/// Tempo used as the centre of the placeholder estimate
const BASE_TEMPO: f64 = 120.0;

/// Estimate a track's tempo (BPM) from its duration in seconds
///
/// `round(120 + (duration mod 20) * 0.5)` clamped to `[min, max]`. Returns
/// `None` for a duration that is not positive and finite.
pub fn estimate_tempo(duration: f64, min: f64, max: f64) -> Option<f64> {
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    let estimate = (BASE_TEMPO + (duration % 20.0) * 0.5).round();
    Some(estimate.clamp(min, max))
}

/// Pitch offset (percent) that makes `this_tempo` play at `target_tempo`
pub fn sync_pitch(this_tempo: f64, target_tempo: f64) -> f64 {
    (target_tempo / this_tempo - 1.0) * 100.0
}

/// Playback rate for a pitch offset in percent
#[inline]
pub fn pitch_to_rate(pitch_percent: f64) -> f64 {
    1.0 + pitch_percent / 100.0
}

/// Length of `beats` beats in seconds at `tempo`
#[inline]
pub fn beats_to_secs(beats: f64, tempo: f64) -> f64 {
    beats * 60.0 / tempo
}
