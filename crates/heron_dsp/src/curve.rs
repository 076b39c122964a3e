//! Response Curve
//!
//! The EQ's combined magnitude response as a polyline, one vertex per pixel
//! column, for drawing behind the spectrum.

use crate::chain::MonoChain;
use crate::path::{jmap, map_to_log10, PathBounds, SpectrumPath};
use crate::settings::{MAX_FREQUENCY, MAX_GAIN_DB, MIN_FREQUENCY};

/// Curve dB range is clamped to ±this
pub const CURVE_RANGE_DB: f64 = MAX_GAIN_DB as f64;

/// Combined response of `chain` in dB at each pixel column
///
/// Column `i` of `width` samples the frequency `map_to_log10(i / width)` in
/// [20, 20000] Hz. Values are clamped to ±24 dB.
pub fn response_magnitudes(chain: &MonoChain, sample_rate: f64, width: usize) -> Vec<f64> {
    (0..width)
        .map(|i| {
            let frequency = map_to_log10(
                i as f64 / width as f64,
                MIN_FREQUENCY as f64,
                MAX_FREQUENCY as f64,
            );
            let magnitude = chain.magnitude(frequency, sample_rate);
            let db = if magnitude > 0.0 && magnitude.is_finite() {
                20.0 * magnitude.log10()
            } else {
                -CURVE_RANGE_DB
            };
            db.clamp(-CURVE_RANGE_DB, CURVE_RANGE_DB)
        })
        .collect()
}

/// Response curve path inside `bounds`
///
/// x = left + column, y maps [-24, 24] dB onto [bottom, top].
pub fn response_curve(chain: &MonoChain, sample_rate: f64, bounds: &PathBounds) -> SpectrumPath {
    if bounds.is_empty() {
        return SpectrumPath::default();
    }

    let width = bounds.width as usize;
    let magnitudes = response_magnitudes(chain, sample_rate, width);

    let top = bounds.top();
    let bottom = bounds.bottom();
    let range = CURVE_RANGE_DB as f32;

    let mut path = SpectrumPath::with_capacity(width);
    for (i, db) in magnitudes.into_iter().enumerate() {
        path.line_to(
            bounds.left() + i as f32,
            jmap(db as f32, -range, range, bottom, top),
        );
    }
    path
}
