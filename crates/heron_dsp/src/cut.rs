//! Cut Filter Cascade
//!
//! Four biquad sections in series. The selected slope decides how many of
//! them run; the rest stay in place as pass-through stages so changing the
//! slope never reallocates.

use biquad::Coefficients;

use crate::design::{CutDesign, CutKind, MAX_CUT_STAGES};
use crate::stage::{AudioStage, FilterStage};

pub struct CutFilter {
    stages: [FilterStage; MAX_CUT_STAGES],
    kind: CutKind,
    bypassed: bool,
}

impl CutFilter {
    /// Create a cascade with only the first section enabled (12 dB/octave)
    pub fn new(kind: CutKind) -> Self {
        let mut cut = Self {
            stages: core::array::from_fn(|_| FilterStage::default()),
            kind,
            bypassed: false,
        };
        cut.set_active_order(1);
        cut
    }

    pub fn kind(&self) -> CutKind {
        self.kind
    }

    /// Enable stages `0..stage_count` and disable the rest
    pub fn set_active_order(&mut self, stage_count: usize) {
        let stage_count = stage_count.min(MAX_CUT_STAGES);
        for (i, stage) in self.stages.iter_mut().enumerate() {
            stage.set_bypassed(i >= stage_count);
        }
    }

    /// Number of enabled sections
    pub fn active_stages(&self) -> usize {
        self.stages.iter().filter(|s| !s.is_bypassed()).count()
    }

    pub fn is_stage_enabled(&self, index: usize) -> bool {
        self.stages.get(index).is_some_and(|s| !s.is_bypassed())
    }

    pub fn stage(&self, index: usize) -> Option<&FilterStage> {
        self.stages.get(index)
    }

    /// Install a new design
    ///
    /// The order change and the coefficient replacement happen in the same
    /// call, so a newly enabled section never runs stale coefficients and a
    /// section left over from a larger order is disabled before the next block.
    pub fn apply(&mut self, design: &CutDesign) {
        self.set_coefficients(design.sections());
        self.bypassed = design.bypassed;
    }
}

impl AudioStage for CutFilter {
    #[inline]
    fn process(&mut self, block: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for stage in self.stages.iter_mut() {
            stage.process(block);
        }
    }

    fn reset(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.reset();
        }
    }

    fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Enables exactly `sections.len()` stages (at most four) and installs
    /// the sections into them
    fn set_coefficients(&mut self, sections: &[Coefficients<f32>]) {
        self.set_active_order(sections.len());
        for (stage, coeffs) in self.stages.iter_mut().zip(sections) {
            stage.set_section(*coeffs);
        }
    }

    fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        if self.bypassed {
            return 1.0;
        }
        self.stages
            .iter()
            .map(|s| s.magnitude(frequency, sample_rate))
            .product()
    }

    fn name(&self) -> &'static str {
        match self.kind {
            CutKind::LowCut => "Low Cut",
            CutKind::HighCut => "High Cut",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{coefficient_bits, cut_coefficients, IDENTITY};
    use crate::settings::{CutSettings, Slope};

    fn design(slope: Slope) -> CutDesign {
        let cut = CutSettings {
            frequency: 200.0,
            slope,
            bypassed: false,
        };
        cut_coefficients(CutKind::LowCut, &cut, 48000.0).unwrap()
    }

    #[test]
    fn test_new_enables_one_stage() {
        let cut = CutFilter::new(CutKind::LowCut);
        assert_eq!(cut.active_stages(), 1);
        assert!(cut.is_stage_enabled(0));
        assert!(!cut.is_stage_enabled(1));
    }

    #[test]
    fn test_set_active_order_enables_prefix() {
        let mut cut = CutFilter::new(CutKind::HighCut);
        for n in 0..=MAX_CUT_STAGES {
            cut.set_active_order(n);
            for i in 0..MAX_CUT_STAGES {
                assert_eq!(cut.is_stage_enabled(i), i < n, "order {} stage {}", n, i);
            }
        }
    }

    #[test]
    fn test_apply_every_slope() {
        let mut cut = CutFilter::new(CutKind::LowCut);
        for slope in Slope::ALL {
            let d = design(slope);
            cut.apply(&d);
            assert_eq!(cut.active_stages(), slope.stage_count());
            for (i, coeffs) in d.sections().iter().enumerate() {
                let stage = cut.stage(i).unwrap();
                assert_eq!(coefficient_bits(stage.coefficients()), coefficient_bits(coeffs));
            }
        }
    }

    #[test]
    fn test_decreasing_order_disables_upper_stages() {
        let mut cut = CutFilter::new(CutKind::LowCut);
        cut.apply(&design(Slope::Db48));
        assert_eq!(cut.active_stages(), 4);

        cut.apply(&design(Slope::Db12));
        assert_eq!(cut.active_stages(), 1);
        for i in 1..MAX_CUT_STAGES {
            assert!(!cut.is_stage_enabled(i));
        }
    }

    #[test]
    fn test_disabled_stages_do_not_affect_magnitude() {
        let mut cut = CutFilter::new(CutKind::LowCut);
        cut.apply(&design(Slope::Db48));
        cut.apply(&design(Slope::Db12));

        let single = design(Slope::Db12);
        let expected =
            crate::design::magnitude_for_frequency(&single.sections()[0], 100.0, 48000.0);
        assert!((cut.magnitude(100.0, 48000.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bypassed_cascade_passes_through() {
        let mut cut = CutFilter::new(CutKind::LowCut);
        cut.apply(&design(Slope::Db48));
        cut.set_bypassed(true);

        let mut block = vec![0.3; 64];
        cut.process(&mut block);
        assert!(block.iter().all(|&s| s == 0.3));
        assert_eq!(cut.magnitude(20.0, 48000.0), 1.0);
    }

    #[test]
    fn test_set_coefficients_through_trait() {
        let d = design(Slope::Db36);
        let mut cut = CutFilter::new(CutKind::LowCut);
        let mut band = FilterStage::default();

        let stages: [&mut dyn AudioStage; 2] = [&mut cut, &mut band];
        for stage in stages {
            stage.set_coefficients(d.sections());
        }

        assert_eq!(cut.active_stages(), 3);
        assert_eq!(
            coefficient_bits(cut.stage(2).unwrap().coefficients()),
            coefficient_bits(&d.sections()[2])
        );
        // A single biquad takes the first section only
        assert_eq!(
            coefficient_bits(band.coefficients()),
            coefficient_bits(&d.sections()[0])
        );

        band.set_coefficients(&[]);
        assert_eq!(coefficient_bits(band.coefficients()), coefficient_bits(&IDENTITY));
        cut.set_coefficients(&[]);
        assert_eq!(cut.active_stages(), 0);
    }

    #[test]
    fn test_fresh_stages_are_identity() {
        let cut = CutFilter::new(CutKind::LowCut);
        let stage = cut.stage(3).unwrap();
        assert_eq!(coefficient_bits(stage.coefficients()), coefficient_bits(&IDENTITY));
    }
}
