//! Per-deck audio graph
//!
//! Fixed topology: source -> EQ high -> EQ mid -> EQ low -> low-pass filter
//! -> gain -> shared bus. Every load re-attaches the new source at the head of
//! this chain, so EQ and filter always apply.

use crate::config::DeckConfig;
use crate::dsp::{db_to_linear, BiquadCoeffs, BiquadState};
use crate::types::{StereoBuffer, SAMPLE_RATE};

use super::playback::LoadTicket;

/// EQ band centre frequencies
const EQ_HIGH_FREQ: f32 = 5000.0;
const EQ_MID_FREQ: f32 = 1000.0;
const EQ_LOW_FREQ: f32 = 250.0;
const EQ_MID_Q: f32 = 1.0;

/// Neutral EQ control value
pub const EQ_FLAT: f32 = 1.0;

/// Processing stages in signal order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Source,
    EqHigh,
    EqMid,
    EqLow,
    Filter,
    Gain,
    Bus,
}

/// The only topology a chain ever has
pub const TOPOLOGY: [Stage; 7] = [
    Stage::Source,
    Stage::EqHigh,
    Stage::EqMid,
    Stage::EqLow,
    Stage::Filter,
    Stage::Gain,
    Stage::Bus,
];

/// EQ band selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqBand {
    High,
    Mid,
    Low,
}

impl EqBand {
    fn index(self) -> usize {
        match self {
            EqBand::High => 0,
            EqBand::Mid => 1,
            EqBand::Low => 2,
        }
    }
}

/// One deck's EQ, filter and gain
#[derive(Debug, Clone)]
pub struct SignalChain {
    eq_range_db: f32,
    filter_open_hz: f32,
    filter_closed_hz: f32,
    filter_q: f32,

    /// EQ controls in [0, 2], 1 = flat, indexed high/mid/low
    eq: [f32; 3],
    eq_coeffs: [BiquadCoeffs; 3],
    eq_state: [BiquadState; 3],

    filter_cutoff: f32,
    filter_coeffs: BiquadCoeffs,
    filter_state: BiquadState,

    gain: f32,

    /// Load whose source currently feeds the chain
    source: Option<LoadTicket>,
}

impl SignalChain {
    pub fn new(config: &DeckConfig) -> Self {
        Self {
            eq_range_db: config.eq_range_db,
            filter_open_hz: config.filter_open_hz,
            filter_closed_hz: config.filter_closed_hz,
            filter_q: config.filter_q,
            eq: [EQ_FLAT; 3],
            eq_coeffs: std::array::from_fn(|_| BiquadCoeffs::passthrough()),
            eq_state: Default::default(),
            filter_cutoff: config.filter_open_hz,
            filter_coeffs: BiquadCoeffs::passthrough(),
            filter_state: BiquadState::default(),
            gain: 0.0,
            source: None,
        }
    }

    /// Route a freshly loaded source into the head of the chain
    pub fn attach(&mut self, ticket: LoadTicket) {
        self.source = Some(ticket);
        for state in &mut self.eq_state {
            state.reset();
        }
        self.filter_state.reset();
    }

    /// Load currently routed into the chain
    pub fn attached(&self) -> Option<LoadTicket> {
        self.source
    }

    // --- EQ ---

    /// Set an EQ control, clamped to [0, 2] (1 = flat)
    pub fn set_eq(&mut self, band: EqBand, value: f32) {
        let value = value.clamp(0.0, 2.0);
        let i = band.index();
        self.eq[i] = value;

        let db = self.eq_db(band);
        let sr = SAMPLE_RATE as f32;
        self.eq_coeffs[i] = if db.abs() < 0.01 {
            BiquadCoeffs::passthrough()
        } else {
            match band {
                EqBand::High => BiquadCoeffs::high_shelf(EQ_HIGH_FREQ, db, sr),
                EqBand::Mid => BiquadCoeffs::peaking(EQ_MID_FREQ, db, EQ_MID_Q, sr),
                EqBand::Low => BiquadCoeffs::low_shelf(EQ_LOW_FREQ, db, sr),
            }
        };
    }

    pub fn eq(&self, band: EqBand) -> f32 {
        self.eq[band.index()]
    }

    /// EQ control mapped to dB: 0 -> -range, 1 -> 0 dB, 2 -> +range
    pub fn eq_db(&self, band: EqBand) -> f32 {
        (self.eq[band.index()] - EQ_FLAT) * self.eq_range_db
    }

    // --- Filter ---

    /// Set the low-pass cutoff, clamped to [closed, open]
    pub fn set_filter_cutoff(&mut self, hz: f32) {
        self.filter_cutoff = hz.clamp(self.filter_closed_hz, self.filter_open_hz);
        self.filter_coeffs = if self.is_filter_engaged() {
            BiquadCoeffs::low_pass(self.filter_cutoff, self.filter_q, SAMPLE_RATE as f32)
        } else {
            BiquadCoeffs::passthrough()
        };
    }

    pub fn filter_cutoff(&self) -> f32 {
        self.filter_cutoff
    }

    /// False while the filter sits fully open
    pub fn is_filter_engaged(&self) -> bool {
        self.filter_cutoff < self.filter_open_hz
    }

    /// Open the filter fully
    pub fn reset_filter(&mut self) {
        self.set_filter_cutoff(self.filter_open_hz);
        self.filter_state.reset();
    }

    // --- Gain ---

    /// Final deck output gain, written by the mixer
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Band boost/cut as a linear factor
    pub fn eq_linear(&self, band: EqBand) -> f32 {
        db_to_linear(self.eq_db(band))
    }

    /// Run a source block through every stage up to the bus
    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        for stage in TOPOLOGY {
            match stage {
                Stage::Source | Stage::Bus => {}
                Stage::EqHigh => self.process_eq(EqBand::High, buffer),
                Stage::EqMid => self.process_eq(EqBand::Mid, buffer),
                Stage::EqLow => self.process_eq(EqBand::Low, buffer),
                Stage::Filter => {
                    if self.filter_coeffs.is_passthrough() {
                        continue;
                    }
                    for sample in buffer.iter_mut() {
                        *sample = self.filter_state.process(*sample, &self.filter_coeffs);
                    }
                }
                Stage::Gain => buffer.scale(self.gain),
            }
        }
    }

    fn process_eq(&mut self, band: EqBand, buffer: &mut StereoBuffer) {
        let i = band.index();
        let coeffs = &self.eq_coeffs[i];
        if coeffs.is_passthrough() {
            return;
        }
        let state = &mut self.eq_state[i];
        for sample in buffer.iter_mut() {
            *sample = state.process(*sample, coeffs);
        }
    }
}
