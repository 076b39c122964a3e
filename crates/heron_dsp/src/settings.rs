//! Chain Settings - the immutable parameter snapshot
//!
//! A `ChainSettings` value captures every control of the EQ at one point in
//! time. The audio thread reads one snapshot per block; a new snapshot
//! replaces the old one as a whole, so there is no identity beyond the values.

use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Lowest frequency any filter may be tuned to (Hz)
pub const MIN_FREQUENCY: f32 = 20.0;

/// Highest frequency any filter may be tuned to (Hz)
pub const MAX_FREQUENCY: f32 = 20000.0;

/// Band gain limit in dB (symmetric)
pub const MAX_GAIN_DB: f32 = 24.0;

pub const MIN_QUALITY: f32 = 0.1;
pub const MAX_QUALITY: f32 = 10.0;

/// Number of parametric bands between the two cut filters
pub const NUM_BANDS: usize = 3;

/// Fraction of Nyquist a filter corner may reach after clamping
const NYQUIST_HEADROOM: f32 = 0.99;

/// Cut filter steepness
///
/// Each step adds one second-order section (12 dB/octave) to the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    pub const ALL: [Slope; 4] = [Slope::Db12, Slope::Db24, Slope::Db36, Slope::Db48];

    /// Build a slope from its parameter index (0..=3)
    pub fn from_index(index: u8) -> Result<Self, DspError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(DspError::InvalidSlope(index))
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Number of biquad sections this slope needs (1..=4)
    pub fn stage_count(self) -> usize {
        self.index() as usize + 1
    }

    /// Butterworth filter order (2, 4, 6 or 8 poles)
    pub fn order(self) -> usize {
        2 * self.stage_count()
    }

    pub fn db_per_octave(self) -> u32 {
        12 * self.stage_count() as u32
    }
}

/// Shape of a parametric band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BandType {
    #[default]
    Peak,
    LowShelf,
    HighShelf,
}

impl BandType {
    pub const ALL: [BandType; 3] = [BandType::Peak, BandType::LowShelf, BandType::HighShelf];
}

/// One parametric band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSettings {
    pub frequency: f32,
    pub gain_db: f32,
    pub quality: f32,
    #[serde(default)]
    pub band_type: BandType,
    #[serde(default)]
    pub bypassed: bool,
}

impl BandSettings {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            gain_db: 0.0,
            quality: 1.0,
            band_type: BandType::Peak,
            bypassed: false,
        }
    }

    /// Linear amplitude for the band gain: 10^(dB/20)
    pub fn gain_linear(&self) -> f32 {
        10.0_f32.powf(self.gain_db / 20.0)
    }
}

/// One cut filter (low-cut or high-cut)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutSettings {
    pub frequency: f32,
    pub slope: Slope,
    #[serde(default)]
    pub bypassed: bool,
}

impl CutSettings {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            slope: Slope::Db12,
            bypassed: false,
        }
    }
}

/// Complete value snapshot of every EQ control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainSettings {
    pub low_cut: CutSettings,
    pub bands: [BandSettings; NUM_BANDS],
    pub high_cut: CutSettings,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            low_cut: CutSettings::new(MIN_FREQUENCY),
            bands: [
                BandSettings::new(250.0),
                BandSettings::new(2500.0),
                BandSettings::new(8000.0),
            ],
            high_cut: CutSettings::new(MAX_FREQUENCY),
        }
    }
}

impl ChainSettings {
    /// Return a copy with every value pulled into its legal range
    ///
    /// Frequencies are limited to `[20, min(20000, 0.99 * Nyquist)]` so the
    /// designer never sees a corner at or above Nyquist. Non-finite inputs
    /// fall back to the nearest safe value.
    pub fn clamped(&self, sample_rate: f32) -> Self {
        let max_freq = max_frequency(sample_rate);
        let freq = |f: f32| finite_or(f, MIN_FREQUENCY).clamp(MIN_FREQUENCY, max_freq);

        let mut out = *self;
        out.low_cut.frequency = freq(self.low_cut.frequency);
        out.high_cut.frequency = freq(self.high_cut.frequency);
        for (band, src) in out.bands.iter_mut().zip(self.bands.iter()) {
            band.frequency = freq(src.frequency);
            band.gain_db = finite_or(src.gain_db, 0.0).clamp(-MAX_GAIN_DB, MAX_GAIN_DB);
            band.quality = finite_or(src.quality, 1.0).clamp(MIN_QUALITY, MAX_QUALITY);
        }
        out
    }
}

/// Highest corner frequency usable at this sample rate
///
/// A non-finite or non-positive sample rate yields `MIN_FREQUENCY`.
pub fn max_frequency(sample_rate: f32) -> f32 {
    finite_or(sample_rate * 0.5 * NYQUIST_HEADROOM, MIN_FREQUENCY)
        .clamp(MIN_FREQUENCY, MAX_FREQUENCY)
}

#[inline]
fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
