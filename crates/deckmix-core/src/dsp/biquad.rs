//! RBJ cookbook biquads with per-channel stereo state

use crate::types::StereoSample;

/// Biquad filter state for one stereo stage
#[derive(Debug, Clone, Default)]
pub struct BiquadState {
    x1_l: f32, x2_l: f32, y1_l: f32, y2_l: f32,
    x1_r: f32, x2_r: f32, y1_r: f32, y2_r: f32,
}

impl BiquadState {
    /// Run one stereo frame through the filter
    pub fn process(&mut self, input: StereoSample, coeffs: &BiquadCoeffs) -> StereoSample {
        let out_l = coeffs.b0 * input.left + coeffs.b1 * self.x1_l + coeffs.b2 * self.x2_l
                  - coeffs.a1 * self.y1_l - coeffs.a2 * self.y2_l;
        self.x2_l = self.x1_l;
        self.x1_l = input.left;
        self.y2_l = self.y1_l;
        self.y1_l = out_l;

        let out_r = coeffs.b0 * input.right + coeffs.b1 * self.x1_r + coeffs.b2 * self.x2_r
                  - coeffs.a1 * self.y1_r - coeffs.a2 * self.y2_r;
        self.x2_r = self.x1_r;
        self.x1_r = input.right;
        self.y2_r = self.y1_r;
        self.y1_r = out_r;

        StereoSample::new(out_l, out_r)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Normalised biquad coefficients (a0 = 1)
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadCoeffs {
    b0: f32, b1: f32, b2: f32,
    a1: f32, a2: f32,
}

impl BiquadCoeffs {
    /// Low shelf, boost/cut of `gain_db` below `freq`
    pub fn low_shelf(freq: f32, gain_db: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let (cos_w0, sin_w0) = Self::omega(freq, sample_rate);
        let alpha = sin_w0 / 2.0 * ((a + 1.0 / a) * (1.0 / 0.9 - 1.0) + 2.0).sqrt();

        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha;
        Self {
            b0: (a * ((a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha)) / a0,
            b1: (2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0)) / a0,
            b2: (a * ((a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha)) / a0,
            a1: (-2.0 * ((a - 1.0) + (a + 1.0) * cos_w0)) / a0,
            a2: ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha) / a0,
        }
    }

    /// Peaking bell around `freq`
    pub fn peaking(freq: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let (cos_w0, sin_w0) = Self::omega(freq, sample_rate);
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    /// High shelf, boost/cut of `gain_db` above `freq`
    pub fn high_shelf(freq: f32, gain_db: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let (cos_w0, sin_w0) = Self::omega(freq, sample_rate);
        let alpha = sin_w0 / 2.0 * ((a + 1.0 / a) * (1.0 / 0.9 - 1.0) + 2.0).sqrt();

        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha;
        Self {
            b0: (a * ((a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha)) / a0,
            b1: (-2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0)) / a0,
            b2: (a * ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha)) / a0,
            a1: (2.0 * ((a - 1.0) - (a + 1.0) * cos_w0)) / a0,
            a2: ((a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha) / a0,
        }
    }

    /// Second-order low-pass at `freq`
    ///
    /// The cutoff is kept below Nyquist.
    pub fn low_pass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let freq = freq.clamp(1.0, sample_rate * 0.49);
        let (cos_w0, sin_w0) = Self::omega(freq, sample_rate);
        let alpha = sin_w0 / (2.0 * q.max(0.01));

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_w0) / 2.0) / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: ((1.0 - cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Passthrough (unity gain, no filtering)
    pub fn passthrough() -> Self {
        Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 }
    }

    pub fn is_passthrough(&self) -> bool {
        *self == Self::passthrough()
    }

    fn omega(freq: f32, sample_rate: f32) -> (f32, f32) {
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        (w0.cos(), w0.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SAMPLE_RATE;

    /// Feed a constant signal long enough for the filter to settle
    fn settle(coeffs: &BiquadCoeffs, value: f32) -> f32 {
        let mut state = BiquadState::default();
        let mut out = StereoSample::silence();
        for _ in 0..SAMPLE_RATE {
            out = state.process(StereoSample::mono(value), coeffs);
        }
        out.left
    }

    #[test]
    fn test_passthrough_is_identity() {
        let coeffs = BiquadCoeffs::passthrough();
        let mut state = BiquadState::default();
        let out = state.process(StereoSample::new(0.3, -0.7), &coeffs);
        assert_eq!(out, StereoSample::new(0.3, -0.7));
        assert!(coeffs.is_passthrough());
    }

    #[test]
    fn test_low_pass_keeps_dc() {
        let coeffs = BiquadCoeffs::low_pass(1000.0, 1.0, SAMPLE_RATE as f32);
        assert!((settle(&coeffs, 0.5) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_low_pass_attenuates_nyquist() {
        let coeffs = BiquadCoeffs::low_pass(200.0, 1.0, SAMPLE_RATE as f32);
        let mut state = BiquadState::default();
        let mut peak: f32 = 0.0;
        for i in 0..SAMPLE_RATE as usize {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let out = state.process(StereoSample::mono(x), &coeffs);
            if i > SAMPLE_RATE as usize / 2 {
                peak = peak.max(out.left.abs());
            }
        }
        assert!(peak < 1e-3, "nyquist leaked through: {}", peak);
    }

    #[test]
    fn test_low_shelf_scales_dc() {
        // DC sits fully inside the shelf, so it picks up the whole gain
        let coeffs = BiquadCoeffs::low_shelf(250.0, 6.0, SAMPLE_RATE as f32);
        let expected = 10.0_f32.powf(6.0 / 20.0);
        assert!((settle(&coeffs, 1.0) - expected).abs() < 1e-2);
    }

    #[test]
    fn test_high_shelf_and_peaking_leave_dc() {
        let sr = SAMPLE_RATE as f32;
        let shelf = BiquadCoeffs::high_shelf(5000.0, -12.0, sr);
        let bell = BiquadCoeffs::peaking(1000.0, 12.0, 1.0, sr);
        assert!((settle(&shelf, 1.0) - 1.0).abs() < 1e-2);
        assert!((settle(&bell, 1.0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_low_pass_cutoff_clamped_below_nyquist() {
        let coeffs = BiquadCoeffs::low_pass(100_000.0, 1.0, SAMPLE_RATE as f32);
        assert!(settle(&coeffs, 1.0).is_finite());
    }
}
