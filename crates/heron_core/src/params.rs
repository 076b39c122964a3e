//! Parameter Layout and Store
//!
//! The named controls a host or GUI reads and writes, and the lock-free
//! store holding their current values.
//!
//! # Threading
//!
//! Writers (UI, host automation) do atomic stores under a sequence counter.
//! Readers never get pushed to: the audio thread checks the generation
//! counter, the curve monitor consumes the `changed` flag with a
//! compare-and-set. Only one party should consume `changed`.
//!
//! Snapshots are published whole. The sequence counter is odd while a write
//! is in progress; a reader retries until it loaded every cell between two
//! identical even counter values, so it sees either all of a write or none
//! of it. Writers exclude each other on the same counter.

use std::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread;

use heron_dsp::{
    BandSettings, BandType, ChainSettings, CutSettings, Slope, MAX_FREQUENCY, MAX_GAIN_DB,
    MAX_QUALITY, MIN_FREQUENCY, MIN_QUALITY, NUM_BANDS,
};

use crate::error::{EngineError, EngineResult};

/// Labels of the two slope choices
pub const SLOPE_CHOICES: [&str; 4] = ["12 db/Oct", "24 db/Oct", "36 db/Oct", "48 db/Oct"];

/// Labels of the band shape choices
pub const BAND_TYPE_CHOICES: [&str; 3] = ["Peak", "Low Shelf", "High Shelf"];

/// Number of host-visible parameters
pub const NUM_PARAMETERS: usize = 21;

/// Continuous range with step and skew
///
/// `skew < 1` spends more of the normalized range on the low end, which is
/// what frequency controls want.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub start: f32,
    pub end: f32,
    pub interval: f32,
    pub skew: f32,
}

impl ParameterRange {
    pub const fn new(start: f32, end: f32, interval: f32, skew: f32) -> Self {
        Self {
            start,
            end,
            interval,
            skew,
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.start, self.end)
    }

    /// Plain value to host-normalized [0, 1]
    pub fn convert_to_0to1(&self, value: f32) -> f32 {
        let proportion = ((value - self.start) / (self.end - self.start)).clamp(0.0, 1.0);
        if self.skew == 1.0 {
            proportion
        } else {
            proportion.powf(self.skew)
        }
    }

    /// Host-normalized [0, 1] to plain value
    pub fn convert_from_0to1(&self, proportion: f32) -> f32 {
        let mut proportion = proportion.clamp(0.0, 1.0);
        if self.skew != 1.0 && proportion > 0.0 {
            proportion = (proportion.ln() / self.skew).exp();
        }
        self.start + (self.end - self.start) * proportion
    }

    /// Round to the nearest interval step, then clamp
    pub fn snap_to_legal_value(&self, value: f32) -> f32 {
        // f64 keeps on-grid values such as 1.0 with a 0.05 step exact
        let value = if self.interval > 0.0 {
            let (start, interval) = (self.start as f64, self.interval as f64);
            let steps = ((value as f64 - start) / interval + 0.5).floor();
            (start + interval * steps) as f32
        } else {
            value
        };
        self.clamp(value)
    }
}

const FREQUENCY_RANGE: ParameterRange =
    ParameterRange::new(MIN_FREQUENCY, MAX_FREQUENCY, 1.0, 0.25);
const GAIN_RANGE: ParameterRange = ParameterRange::new(-MAX_GAIN_DB, MAX_GAIN_DB, 0.5, 1.0);
const QUALITY_RANGE: ParameterRange = ParameterRange::new(MIN_QUALITY, MAX_QUALITY, 0.05, 1.0);

/// What kind of value a parameter holds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    Float(ParameterRange),
    /// Index into the labels
    Choice(&'static [&'static str]),
    Bool,
}

impl ParameterKind {
    /// Clamp and snap a raw write to something storable
    pub fn legalize(&self, value: f32) -> f32 {
        let value = if value.is_finite() { value } else { 0.0 };
        match self {
            ParameterKind::Float(range) => range.snap_to_legal_value(value),
            ParameterKind::Choice(labels) => value.round().clamp(0.0, (labels.len() - 1) as f32),
            ParameterKind::Bool => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn convert_to_0to1(&self, value: f32) -> f32 {
        match self {
            ParameterKind::Float(range) => range.convert_to_0to1(value),
            ParameterKind::Choice(labels) if labels.len() > 1 => {
                value / (labels.len() - 1) as f32
            }
            ParameterKind::Choice(_) => 0.0,
            ParameterKind::Bool => value,
        }
    }

    pub fn convert_from_0to1(&self, proportion: f32) -> f32 {
        let proportion = proportion.clamp(0.0, 1.0);
        match self {
            ParameterKind::Float(range) => range.convert_from_0to1(proportion),
            ParameterKind::Choice(labels) => proportion * (labels.len() - 1) as f32,
            ParameterKind::Bool => proportion,
        }
    }
}

/// Every host-visible control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    LowCutFreq,
    LowCutSlope,
    LowCutBypassed,
    Band1Freq,
    Band1Gain,
    Band1Quality,
    Band1Type,
    Band1Bypassed,
    Band2Freq,
    Band2Gain,
    Band2Quality,
    Band2Type,
    Band2Bypassed,
    Band3Freq,
    Band3Gain,
    Band3Quality,
    Band3Type,
    Band3Bypassed,
    HighCutFreq,
    HighCutSlope,
    HighCutBypassed,
}

/// The five controls of one band, in layout order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandControl {
    Freq,
    Gain,
    Quality,
    Type,
    Bypassed,
}

impl ParameterId {
    pub const ALL: [ParameterId; NUM_PARAMETERS] = [
        ParameterId::LowCutFreq,
        ParameterId::LowCutSlope,
        ParameterId::LowCutBypassed,
        ParameterId::Band1Freq,
        ParameterId::Band1Gain,
        ParameterId::Band1Quality,
        ParameterId::Band1Type,
        ParameterId::Band1Bypassed,
        ParameterId::Band2Freq,
        ParameterId::Band2Gain,
        ParameterId::Band2Quality,
        ParameterId::Band2Type,
        ParameterId::Band2Bypassed,
        ParameterId::Band3Freq,
        ParameterId::Band3Gain,
        ParameterId::Band3Quality,
        ParameterId::Band3Type,
        ParameterId::Band3Bypassed,
        ParameterId::HighCutFreq,
        ParameterId::HighCutSlope,
        ParameterId::HighCutBypassed,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Control of band `band` (0-based)
    pub fn band(band: usize, control: BandControl) -> Option<Self> {
        if band >= NUM_BANDS {
            return None;
        }
        Some(Self::ALL[3 + band * 5 + control as usize])
    }

    /// Host-facing identifier, e.g. `"Band2 Gain"`
    pub fn name(self) -> &'static str {
        match self {
            ParameterId::LowCutFreq => "LowCut Freq",
            ParameterId::LowCutSlope => "LowCut Slope",
            ParameterId::LowCutBypassed => "LowCut Bypassed",
            ParameterId::Band1Freq => "Band1 Freq",
            ParameterId::Band1Gain => "Band1 Gain",
            ParameterId::Band1Quality => "Band1 Quality",
            ParameterId::Band1Type => "Band1 Type",
            ParameterId::Band1Bypassed => "Band1 Bypassed",
            ParameterId::Band2Freq => "Band2 Freq",
            ParameterId::Band2Gain => "Band2 Gain",
            ParameterId::Band2Quality => "Band2 Quality",
            ParameterId::Band2Type => "Band2 Type",
            ParameterId::Band2Bypassed => "Band2 Bypassed",
            ParameterId::Band3Freq => "Band3 Freq",
            ParameterId::Band3Gain => "Band3 Gain",
            ParameterId::Band3Quality => "Band3 Quality",
            ParameterId::Band3Type => "Band3 Type",
            ParameterId::Band3Bypassed => "Band3 Bypassed",
            ParameterId::HighCutFreq => "HighCut Freq",
            ParameterId::HighCutSlope => "HighCut Slope",
            ParameterId::HighCutBypassed => "HighCut Bypassed",
        }
    }

    pub fn from_name(name: &str) -> EngineResult<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == name)
            .ok_or_else(|| EngineError::UnknownParameter(name.to_string()))
    }

    pub fn kind(self) -> ParameterKind {
        use ParameterId::*;
        match self {
            LowCutFreq | HighCutFreq | Band1Freq | Band2Freq | Band3Freq => {
                ParameterKind::Float(FREQUENCY_RANGE)
            }
            Band1Gain | Band2Gain | Band3Gain => ParameterKind::Float(GAIN_RANGE),
            Band1Quality | Band2Quality | Band3Quality => ParameterKind::Float(QUALITY_RANGE),
            LowCutSlope | HighCutSlope => ParameterKind::Choice(&SLOPE_CHOICES),
            Band1Type | Band2Type | Band3Type => ParameterKind::Choice(&BAND_TYPE_CHOICES),
            LowCutBypassed | HighCutBypassed | Band1Bypassed | Band2Bypassed | Band3Bypassed => {
                ParameterKind::Bool
            }
        }
    }

    pub fn default_value(self) -> f32 {
        use ParameterId::*;
        match self {
            LowCutFreq => MIN_FREQUENCY,
            HighCutFreq => MAX_FREQUENCY,
            Band1Freq => 250.0,
            Band2Freq => 2500.0,
            Band3Freq => 8000.0,
            Band1Quality | Band2Quality | Band3Quality => 1.0,
            _ => 0.0,
        }
    }
}

/// Current value of every parameter, readable and writable from any thread
///
/// f32 values are kept as bit patterns in `AtomicU32`, since there is no
/// `AtomicF32` in std.
pub struct ParameterStore {
    values: [AtomicU32; NUM_PARAMETERS],
    sequence: AtomicU64,
    changed: AtomicBool,
    generation: AtomicU64,
}

/// Attempts `try_chain_settings` makes before giving up
pub const SNAPSHOT_RETRIES: usize = 64;

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self {
            values: core::array::from_fn(|i| {
                AtomicU32::new(ParameterId::ALL[i].default_value().to_bits())
            }),
            sequence: AtomicU64::new(0),
            changed: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn get(&self, id: ParameterId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Store a plain value; returns what was actually stored after clamping
    /// and snapping
    pub fn set(&self, id: ParameterId, value: f32) -> f32 {
        let value = id.kind().legalize(value);
        let sequence = self.begin_write();
        self.store(id, value);
        self.end_write(sequence);
        value
    }

    /// Make the sequence odd, waiting out any other writer
    pub(crate) fn begin_write(&self) -> u64 {
        loop {
            let current = self.sequence.load(Ordering::Relaxed);
            if current & 1 == 0
                && self
                    .sequence
                    .compare_exchange_weak(current, current + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                fence(Ordering::Release);
                return current + 1;
            }
            thread::yield_now();
        }
    }

    pub(crate) fn end_write(&self, sequence: u64) {
        self.sequence.store(sequence + 1, Ordering::Release);
        self.generation.fetch_add(1, Ordering::Release);
        self.changed.store(true, Ordering::Release);
    }

    #[inline]
    fn store(&self, id: ParameterId, value: f32) {
        self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Store without touching the sequence, to stage a write in tests
    #[cfg(test)]
    pub(crate) fn store_raw(&self, id: ParameterId, value: f32) {
        self.store(id, value);
    }

    pub fn set_by_name(&self, name: &str, value: f32) -> EngineResult<f32> {
        Ok(self.set(ParameterId::from_name(name)?, value))
    }

    pub fn get_normalized(&self, id: ParameterId) -> f32 {
        id.kind().convert_to_0to1(self.get(id))
    }

    /// Store a host-normalized [0, 1] value
    pub fn set_normalized(&self, id: ParameterId, proportion: f32) -> f32 {
        self.set(id, id.kind().convert_from_0to1(proportion))
    }

    pub fn set_bool(&self, id: ParameterId, value: bool) {
        self.set(id, if value { 1.0 } else { 0.0 });
    }

    /// Consume the changed flag
    ///
    /// True at most once per batch of writes.
    pub fn take_changed(&self) -> bool {
        self.changed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Bumped on every write
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// A consistent settings snapshot, waiting for a writer if needed
    ///
    /// Not for the audio thread; use [`ParameterStore::try_chain_settings`]
    /// there.
    pub fn chain_settings(&self) -> ChainSettings {
        loop {
            if let Some(settings) = self.try_chain_settings() {
                return settings;
            }
            thread::yield_now();
        }
    }

    /// A consistent settings snapshot, or `None` if writers kept the store
    /// busy for `SNAPSHOT_RETRIES` attempts
    ///
    /// Never blocks; callers keep their previous snapshot on `None`.
    pub fn try_chain_settings(&self) -> Option<ChainSettings> {
        for _ in 0..SNAPSHOT_RETRIES {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let settings = self.load_settings();
            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return Some(settings);
            }
        }
        None
    }

    fn load_settings(&self) -> ChainSettings {
        let cut = |freq: ParameterId, slope: ParameterId, bypassed: ParameterId| CutSettings {
            frequency: self.get(freq),
            slope: Slope::ALL[self.get(slope) as usize % Slope::ALL.len()],
            bypassed: self.get(bypassed) >= 0.5,
        };

        let band = |b: usize| {
            let id = |control: BandControl| ParameterId::ALL[3 + b * 5 + control as usize];
            BandSettings {
                frequency: self.get(id(BandControl::Freq)),
                gain_db: self.get(id(BandControl::Gain)),
                quality: self.get(id(BandControl::Quality)),
                band_type: BandType::ALL
                    [self.get(id(BandControl::Type)) as usize % BandType::ALL.len()],
                bypassed: self.get(id(BandControl::Bypassed)) >= 0.5,
            }
        };

        ChainSettings {
            low_cut: cut(
                ParameterId::LowCutFreq,
                ParameterId::LowCutSlope,
                ParameterId::LowCutBypassed,
            ),
            bands: core::array::from_fn(band),
            high_cut: cut(
                ParameterId::HighCutFreq,
                ParameterId::HighCutSlope,
                ParameterId::HighCutBypassed,
            ),
        }
    }

    /// Write a whole snapshot, e.g. when loading a preset
    ///
    /// Readers see all of it or none of it; the generation moves once.
    pub fn set_chain_settings(&self, settings: &ChainSettings) {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };

        let mut values = [0.0f32; NUM_PARAMETERS];
        let mut put = |id: ParameterId, value: f32| values[id.index()] = id.kind().legalize(value);

        put(ParameterId::LowCutFreq, settings.low_cut.frequency);
        put(ParameterId::LowCutSlope, settings.low_cut.slope.index() as f32);
        put(ParameterId::LowCutBypassed, flag(settings.low_cut.bypassed));

        for (b, band) in settings.bands.iter().enumerate() {
            let id = |control: BandControl| ParameterId::ALL[3 + b * 5 + control as usize];
            let band_type = BandType::ALL
                .iter()
                .position(|t| *t == band.band_type)
                .unwrap_or(0);
            put(id(BandControl::Freq), band.frequency);
            put(id(BandControl::Gain), band.gain_db);
            put(id(BandControl::Quality), band.quality);
            put(id(BandControl::Type), band_type as f32);
            put(id(BandControl::Bypassed), flag(band.bypassed));
        }

        put(ParameterId::HighCutFreq, settings.high_cut.frequency);
        put(ParameterId::HighCutSlope, settings.high_cut.slope.index() as f32);
        put(ParameterId::HighCutBypassed, flag(settings.high_cut.bypassed));

        let sequence = self.begin_write();
        for (id, value) in ParameterId::ALL.iter().zip(values) {
            self.store(*id, value);
        }
        self.end_write(sequence);
    }
}
