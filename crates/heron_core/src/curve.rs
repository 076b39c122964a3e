//! Response Curve Monitor
//!
//! UI-timer side of the response curve. Owns a private mono chain, so it
//! never touches the audio thread's filters.

use std::sync::Arc;

use heron_dsp::{design_chain, response_curve, MonoChain, PathBounds, SpectrumPath};

use crate::params::ParameterStore;

pub struct CurveMonitor {
    params: Arc<ParameterStore>,
    chain: MonoChain,
    sample_rate: f32,
    bounds: PathBounds,
    curve: SpectrumPath,
    dirty: bool,
}

impl CurveMonitor {
    pub fn new(params: Arc<ParameterStore>, sample_rate: f32) -> Self {
        Self {
            params,
            chain: MonoChain::new(),
            sample_rate,
            bounds: PathBounds::default(),
            curve: SpectrumPath::default(),
            dirty: true,
        }
    }

    pub fn set_bounds(&mut self, bounds: PathBounds) {
        if bounds != self.bounds {
            self.bounds = bounds;
            self.dirty = true;
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.dirty = true;
        }
    }

    /// Timer tick
    ///
    /// Consumes the store's changed flag and rebuilds the curve if it was
    /// set, if the bounds or sample rate moved, or on the first call.
    /// Returns true when the curve was rebuilt.
    pub fn poll(&mut self) -> bool {
        let changed = self.params.take_changed();
        if !changed && !self.dirty {
            return false;
        }

        let settings = self.params.chain_settings();
        self.chain.apply(&design_chain(&settings, self.sample_rate));
        self.curve = response_curve(&self.chain, self.sample_rate as f64, &self.bounds);
        self.dirty = false;
        true
    }

    pub fn curve(&self) -> &SpectrumPath {
        &self.curve
    }

    pub fn chain(&self) -> &MonoChain {
        &self.chain
    }
}
