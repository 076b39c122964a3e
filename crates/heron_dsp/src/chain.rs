//! Channel Processing Chain
//!
//! The fixed-order per-channel filter chain:
//! low-cut cascade → band 1 → band 2 → band 3 → high-cut cascade.
//!
//! One instance per audio channel. Instances share nothing, so the left and
//! right chains can be driven independently from the same `ChainDesign`.

use crate::cut::CutFilter;
use crate::design::{design_chain, ChainDesign, CutKind};
use crate::settings::{ChainSettings, NUM_BANDS};
use crate::stage::{AudioStage, FilterStage};

/// Positions in the chain, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPosition {
    LowCut,
    Band1,
    Band2,
    Band3,
    HighCut,
}

impl ChainPosition {
    pub const ALL: [ChainPosition; 5] = [
        ChainPosition::LowCut,
        ChainPosition::Band1,
        ChainPosition::Band2,
        ChainPosition::Band3,
        ChainPosition::HighCut,
    ];
}

pub struct MonoChain {
    low_cut: CutFilter,
    bands: [FilterStage; NUM_BANDS],
    high_cut: CutFilter,
}

impl Default for MonoChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoChain {
    /// Create a chain of pass-through stages; call `apply` before use
    pub fn new() -> Self {
        Self {
            low_cut: CutFilter::new(CutKind::LowCut),
            bands: core::array::from_fn(|_| FilterStage::default()),
            high_cut: CutFilter::new(CutKind::HighCut),
        }
    }

    /// Create a chain already tuned to `settings`
    pub fn with_settings(settings: &ChainSettings, sample_rate: f32) -> Self {
        let mut chain = Self::new();
        chain.apply(&design_chain(settings, sample_rate));
        chain
    }

    /// Install a full set of coefficients
    ///
    /// Replacement is unconditional: applying the same design twice leaves
    /// bit-identical coefficients and untouched delay state.
    pub fn apply(&mut self, design: &ChainDesign) {
        self.low_cut.apply(&design.low_cut);
        for (stage, band) in self.bands.iter_mut().zip(design.bands.iter()) {
            stage.set_coefficients(core::slice::from_ref(&band.coefficients));
            stage.set_bypassed(band.bypassed);
        }
        self.high_cut.apply(&design.high_cut);
    }

    /// Stages in processing order
    fn stages_mut(&mut self) -> [&mut dyn AudioStage; 5] {
        let [b1, b2, b3] = &mut self.bands;
        [&mut self.low_cut, b1, b2, b3, &mut self.high_cut]
    }

    fn stages(&self) -> [&dyn AudioStage; 5] {
        let [b1, b2, b3] = &self.bands;
        [&self.low_cut, b1, b2, b3, &self.high_cut]
    }

    pub fn stage(&self, position: ChainPosition) -> &dyn AudioStage {
        match position {
            ChainPosition::LowCut => &self.low_cut,
            ChainPosition::Band1 => &self.bands[0],
            ChainPosition::Band2 => &self.bands[1],
            ChainPosition::Band3 => &self.bands[2],
            ChainPosition::HighCut => &self.high_cut,
        }
    }

    pub fn low_cut(&self) -> &CutFilter {
        &self.low_cut
    }

    pub fn high_cut(&self) -> &CutFilter {
        &self.high_cut
    }

    pub fn band(&self, index: usize) -> Option<&FilterStage> {
        self.bands.get(index)
    }

    /// Bypass a whole position (band or cascade)
    pub fn set_bypassed(&mut self, position: ChainPosition, bypassed: bool) {
        match position {
            ChainPosition::LowCut => self.low_cut.set_bypassed(bypassed),
            ChainPosition::Band1 => self.bands[0].set_bypassed(bypassed),
            ChainPosition::Band2 => self.bands[1].set_bypassed(bypassed),
            ChainPosition::Band3 => self.bands[2].set_bypassed(bypassed),
            ChainPosition::HighCut => self.high_cut.set_bypassed(bypassed),
        }
    }

    /// Process a mono block in place
    ///
    /// Each stage runs over the entire block before the next one starts.
    ///
    /// # Real-time Safety
    /// No allocations. O(n) where n = block length.
    #[inline]
    pub fn process(&mut self, block: &mut [f32]) {
        for stage in self.stages_mut() {
            if !stage.is_bypassed() {
                stage.process(block);
            }
        }
    }

    /// Combined magnitude response of every enabled stage
    pub fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.stages()
            .iter()
            .map(|s| s.magnitude(frequency, sample_rate))
            .product()
    }

    /// Clear all delay registers
    pub fn reset(&mut self) {
        for stage in self.stages_mut() {
            stage.reset();
        }
    }
}
