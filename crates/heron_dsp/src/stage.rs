//! Filter Stage and the Audio Stage Trait
//!
//! Defines the interface every link of a channel chain implements, and the
//! single biquad unit the chain is built from.

use biquad::{Biquad, Coefficients, DirectForm2Transposed};

use crate::design::{magnitude_for_frequency, IDENTITY};

/// A link in a channel processing chain
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - Constant or O(n) time complexity where n = block size
pub trait AudioStage: Send {
    /// Process a mono block in place
    fn process(&mut self, block: &mut [f32]);

    /// Clear delay registers
    fn reset(&mut self);

    fn set_bypassed(&mut self, bypassed: bool);

    fn is_bypassed(&self) -> bool;

    /// Install designed sections in cascade order
    ///
    /// A stage with fewer slots than `sections` ignores the excess; an empty
    /// slice installs pass-through.
    fn set_coefficients(&mut self, sections: &[Coefficients<f32>]);

    /// Magnitude response at `frequency`; 1.0 when bypassed
    fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64;

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;
}

/// One biquad section with its own delay state
///
/// Coefficients are a `Copy` value replaced as a unit, so the stage always
/// runs either the complete old set or the complete new one. Delay state
/// survives coefficient changes and is only cleared by `reset()`.
pub struct FilterStage {
    // DirectForm2Transposed: better numerical stability than DF1
    filter: DirectForm2Transposed<f32>,
    coefficients: Coefficients<f32>,
    bypassed: bool,
}

impl FilterStage {
    pub fn new(coefficients: Coefficients<f32>) -> Self {
        Self {
            filter: DirectForm2Transposed::<f32>::new(coefficients),
            coefficients,
            bypassed: false,
        }
    }

    /// Replace the coefficient set in one step
    #[inline]
    pub fn set_section(&mut self, coefficients: Coefficients<f32>) {
        self.filter.update_coefficients(coefficients);
        self.coefficients = coefficients;
    }

    pub fn coefficients(&self) -> &Coefficients<f32> {
        &self.coefficients
    }

    /// Run one sample through the difference equation
    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        self.filter.run(sample)
    }
}

impl Default for FilterStage {
    fn default() -> Self {
        Self::new(IDENTITY)
    }
}

impl AudioStage for FilterStage {
    #[inline]
    fn process(&mut self, block: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for sample in block.iter_mut() {
            *sample = self.filter.run(*sample);
        }
    }

    fn reset(&mut self) {
        self.filter.reset_state();
    }

    fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    fn set_coefficients(&mut self, sections: &[Coefficients<f32>]) {
        self.set_section(sections.first().copied().unwrap_or(IDENTITY));
    }

    fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        if self.bypassed {
            1.0
        } else {
            magnitude_for_frequency(&self.coefficients, frequency, sample_rate)
        }
    }

    fn name(&self) -> &'static str {
        "Biquad"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::coefficient_bits;
    use biquad::{ToHertz, Type};

    fn low_pass(freq: f32) -> Coefficients<f32> {
        Coefficients::<f32>::from_params(Type::LowPass, 48000.0_f32.hz(), freq.hz(), 0.707).unwrap()
    }

    #[test]
    fn test_identity_passthrough() {
        let mut stage = FilterStage::default();
        let mut block = vec![0.5, -0.25, 1.0, 0.0];
        stage.process(&mut block);
        assert_eq!(block, vec![0.5, -0.25, 1.0, 0.0]);
    }

    #[test]
    fn test_bypassed_stage_untouched() {
        let mut stage = FilterStage::new(low_pass(100.0));
        stage.set_bypassed(true);
        let mut block = vec![1.0, -1.0, 1.0, -1.0];
        stage.process(&mut block);
        assert_eq!(block, vec![1.0, -1.0, 1.0, -1.0]);
        assert_eq!(stage.magnitude(10000.0, 48000.0), 1.0);
    }

    #[test]
    fn test_set_coefficients_replaces_whole_set() {
        let mut stage = FilterStage::default();
        let lp = low_pass(1000.0);
        stage.set_section(lp);
        assert_eq!(coefficient_bits(stage.coefficients()), coefficient_bits(&lp));
    }

    #[test]
    fn test_low_pass_attenuates_nyquist() {
        let mut stage = FilterStage::new(low_pass(500.0));
        // Alternating signal sits at Nyquist
        let mut block: Vec<f32> = (0..2000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        stage.process(&mut block);
        let tail_peak = block[1900..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(tail_peak < 0.01, "Nyquist should be removed: {}", tail_peak);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut stage = FilterStage::new(low_pass(100.0));
        let mut block = vec![1.0; 256];
        stage.process(&mut block);

        stage.reset();
        let mut silence = vec![0.0; 16];
        stage.process(&mut silence);
        assert!(silence.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_state_persists_across_blocks() {
        let mut split = FilterStage::new(low_pass(300.0));
        let mut whole = FilterStage::new(low_pass(300.0));

        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut a = input[..200].to_vec();
        let mut b = input[200..].to_vec();
        split.process(&mut a);
        split.process(&mut b);

        let mut full = input.clone();
        whole.process(&mut full);

        a.extend_from_slice(&b);
        assert_eq!(a, full);
    }
}
