//! Coefficient Designer
//!
//! Pure functions turning a `ChainSettings` snapshot into biquad coefficients.
//! Peak and shelf bands follow the RBJ (Robert Bristow-Johnson) Audio EQ
//! Cookbook; cut filters are high-order Butterworth designs split into
//! cascaded second-order sections.
//!
//! Same inputs always produce bit-identical coefficients: nothing here keeps
//! state, and nothing allocates, so the designer is safe to call from the
//! audio callback.

use biquad::{Coefficients, ToHertz, Type};

use crate::error::DspError;
use crate::settings::{BandSettings, BandType, ChainSettings, CutSettings, NUM_BANDS};

/// Maximum number of biquad sections in one cut filter (48 dB/octave)
pub const MAX_CUT_STAGES: usize = 4;

/// Pass-through biquad, used for disabled stages and failed designs
pub const IDENTITY: Coefficients<f32> = Coefficients {
    a1: 0.0,
    a2: 0.0,
    b0: 1.0,
    b1: 0.0,
    b2: 0.0,
};

/// Which side of the spectrum a cut filter removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutKind {
    /// High-pass response: removes content below the corner
    LowCut,
    /// Low-pass response: removes content above the corner
    HighCut,
}

/// Butterworth cascade: the first `stage_count` sections are meaningful
#[derive(Debug, Clone, Copy)]
pub struct CutDesign {
    sections: [Coefficients<f32>; MAX_CUT_STAGES],
    stage_count: usize,
    pub bypassed: bool,
}

impl CutDesign {
    /// The designed sections, in cascade order
    pub fn sections(&self) -> &[Coefficients<f32>] {
        &self.sections[..self.stage_count]
    }

    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// A single identity section; what a failed design degrades to
    fn identity(bypassed: bool) -> Self {
        Self {
            sections: [IDENTITY; MAX_CUT_STAGES],
            stage_count: 1,
            bypassed,
        }
    }
}

/// Coefficients for one parametric band
#[derive(Debug, Clone, Copy)]
pub struct BandDesign {
    pub coefficients: Coefficients<f32>,
    pub bypassed: bool,
}

/// Every coefficient a channel chain needs for one settings snapshot
#[derive(Debug, Clone, Copy)]
pub struct ChainDesign {
    pub low_cut: CutDesign,
    pub bands: [BandDesign; NUM_BANDS],
    pub high_cut: CutDesign,
}

impl ChainDesign {
    /// Pass-through everywhere, keeping the bypass flags of `settings`
    fn identity(settings: &ChainSettings) -> Self {
        Self {
            low_cut: CutDesign::identity(settings.low_cut.bypassed),
            bands: core::array::from_fn(|i| BandDesign {
                coefficients: IDENTITY,
                bypassed: settings.bands[i].bypassed,
            }),
            high_cut: CutDesign::identity(settings.high_cut.bypassed),
        }
    }
}

fn check_sample_rate(sample_rate: f32) -> Result<(), DspError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(DspError::InvalidSampleRate(sample_rate))
    }
}

/// Design one parametric band (peak or shelf)
///
/// Fails when the band frequency is at or above Nyquist; callers clamp their
/// inputs with [`ChainSettings::clamped`] first.
pub fn band_coefficients(
    band: &BandSettings,
    sample_rate: f32,
) -> Result<Coefficients<f32>, DspError> {
    check_sample_rate(sample_rate)?;

    let filter = match band.band_type {
        BandType::Peak => Type::PeakingEQ(band.gain_db),
        BandType::LowShelf => Type::LowShelf(band.gain_db),
        BandType::HighShelf => Type::HighShelf(band.gain_db),
    };

    let coeffs = Coefficients::<f32>::from_params(
        filter,
        sample_rate.hz(),
        band.frequency.hz(),
        band.quality,
    )
    .map_err(|_| DspError::InvalidCoefficients {
        frequency: band.frequency,
        sample_rate,
    })?;

    if is_finite(&coeffs) && band.frequency < sample_rate * 0.5 {
        Ok(coeffs)
    } else {
        Err(DspError::InvalidCoefficients {
            frequency: band.frequency,
            sample_rate,
        })
    }
}

/// Q of section `index` in an even-order Butterworth cascade
///
/// Poles sit at angles (2k + 1)π / 2n, each conjugate pair giving one
/// second-order section with Q = 1 / (2 cos θ).
pub fn butterworth_q(order: usize, index: usize) -> f32 {
    let theta = (2 * index + 1) as f64 * std::f64::consts::PI / (2 * order) as f64;
    (1.0 / (2.0 * theta.cos())) as f32
}

/// Design a Butterworth cut filter as `slope.stage_count()` biquad sections
///
/// Cascading every returned section yields a maximally flat high-pass
/// (`LowCut`) or low-pass (`HighCut`) of order `2 * stage_count` at the
/// requested corner.
pub fn cut_coefficients(
    kind: CutKind,
    cut: &CutSettings,
    sample_rate: f32,
) -> Result<CutDesign, DspError> {
    check_sample_rate(sample_rate)?;
    if cut.frequency >= sample_rate * 0.5 || !cut.frequency.is_finite() {
        return Err(DspError::InvalidCoefficients {
            frequency: cut.frequency,
            sample_rate,
        });
    }

    let order = cut.slope.order();
    let stage_count = cut.slope.stage_count();
    let mut sections = [IDENTITY; MAX_CUT_STAGES];

    for (index, section) in sections.iter_mut().take(stage_count).enumerate() {
        let filter = match kind {
            CutKind::LowCut => Type::HighPass,
            CutKind::HighCut => Type::LowPass,
        };
        let coeffs = Coefficients::<f32>::from_params(
            filter,
            sample_rate.hz(),
            cut.frequency.hz(),
            butterworth_q(order, index),
        )
        .map_err(|_| DspError::InvalidCoefficients {
            frequency: cut.frequency,
            sample_rate,
        })?;
        *section = coeffs;
    }

    Ok(CutDesign {
        sections,
        stage_count,
        bypassed: cut.bypassed,
    })
}

/// Design a whole channel chain from a settings snapshot
///
/// Inputs are clamped to their legal ranges first. A sample rate that is
/// not finite and positive yields pass-through coefficients so the audio
/// path never has to handle an error.
pub fn design_chain(settings: &ChainSettings, sample_rate: f32) -> ChainDesign {
    if check_sample_rate(sample_rate).is_err() {
        return ChainDesign::identity(settings);
    }
    let settings = settings.clamped(sample_rate);

    let bands = core::array::from_fn(|i| {
        let band = &settings.bands[i];
        BandDesign {
            coefficients: band_coefficients(band, sample_rate).unwrap_or(IDENTITY),
            bypassed: band.bypassed,
        }
    });

    let low_cut = cut_coefficients(CutKind::LowCut, &settings.low_cut, sample_rate)
        .unwrap_or_else(|_| CutDesign::identity(settings.low_cut.bypassed));
    let high_cut = cut_coefficients(CutKind::HighCut, &settings.high_cut, sample_rate)
        .unwrap_or_else(|_| CutDesign::identity(settings.high_cut.bypassed));

    ChainDesign {
        low_cut,
        bands,
        high_cut,
    }
}

/// Magnitude |H(e^jω)| of one biquad at `frequency`
pub fn magnitude_for_frequency(coeffs: &Coefficients<f32>, frequency: f64, sample_rate: f64) -> f64 {
    let omega = 2.0 * std::f64::consts::PI * frequency / sample_rate;
    // z^-1 = cos ω - j sin ω, z^-2 = cos 2ω - j sin 2ω
    let (s1, c1) = omega.sin_cos();
    let (s2, c2) = (2.0 * omega).sin_cos();

    let (b0, b1, b2) = (coeffs.b0 as f64, coeffs.b1 as f64, coeffs.b2 as f64);
    let (a1, a2) = (coeffs.a1 as f64, coeffs.a2 as f64);

    let num_re = b0 + b1 * c1 + b2 * c2;
    let num_im = -(b1 * s1 + b2 * s2);
    let den_re = 1.0 + a1 * c1 + a2 * c2;
    let den_im = -(a1 * s1 + a2 * s2);

    let num = num_re.hypot(num_im);
    let den = den_re.hypot(den_im);
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Raw bit patterns of a coefficient set, for exact comparisons
pub fn coefficient_bits(coeffs: &Coefficients<f32>) -> [u32; 5] {
    [
        coeffs.b0.to_bits(),
        coeffs.b1.to_bits(),
        coeffs.b2.to_bits(),
        coeffs.a1.to_bits(),
        coeffs.a2.to_bits(),
    ]
}

#[inline]
fn is_finite(coeffs: &Coefficients<f32>) -> bool {
    coeffs.b0.is_finite()
        && coeffs.b1.is_finite()
        && coeffs.b2.is_finite()
        && coeffs.a1.is_finite()
        && coeffs.a2.is_finite()
}
