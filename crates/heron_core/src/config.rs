//! Engine, Stream and Analyzer Configuration

use heron_dsp::{FftOrder, DEFAULT_FLOOR_DB, DEFAULT_PATH_RESOLUTION, FIFO_CAPACITY};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// Session audio format, fixed between `prepare` calls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Largest block the host will ever pass to `process`
    pub max_block_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            max_block_size: 512,
        }
    }
}

impl StreamConfig {
    /// Calculate latency in milliseconds of one full block
    pub fn block_latency_ms(&self) -> f32 {
        (self.max_block_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.max_block_size < 16 || self.max_block_size > 8192 {
            return Err(format!("Invalid block size: {}", self.max_block_size));
        }
        Ok(())
    }
}

/// Spectrum analyzer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub fft_order: FftOrder,

    /// Lowest level shown, in dBFS
    pub floor_db: f32,

    /// Bins stepped per path vertex
    pub path_resolution: usize,

    /// Analyzer timer rate in Hz
    pub refresh_hz: u32,

    /// Slots in every analysis Fifo
    pub fifo_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_order: FftOrder::default(),
            floor_db: DEFAULT_FLOOR_DB,
            path_resolution: DEFAULT_PATH_RESOLUTION,
            refresh_hz: 60,
            fifo_capacity: FIFO_CAPACITY,
        }
    }
}

impl AnalyzerConfig {
    /// Timer period between analyzer ticks
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.refresh_hz.max(1) as f64)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.floor_db.is_nan() || self.floor_db >= 0.0 {
            return Err(format!("Analyzer floor must be below 0 dB: {}", self.floor_db));
        }
        if self.path_resolution == 0 {
            return Err("Path resolution must be at least 1".into());
        }
        if self.refresh_hz == 0 || self.refresh_hz > 240 {
            return Err(format!("Invalid refresh rate: {}", self.refresh_hz));
        }
        if self.fifo_capacity == 0 {
            return Err("Fifo capacity must be at least 1".into());
        }
        Ok(())
    }
}

/// When the audio thread redesigns coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Every callback, unconditionally
    #[default]
    Always,
    /// Only when the parameter store reports a new generation
    OnChange,
}

/// Overall engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub stream: StreamConfig,
    pub analyzer: AnalyzerConfig,
    pub update_mode: UpdateMode,
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                max_block_size: 128, // ~2.6ms
            },
            ..Default::default()
        }
    }

    /// Finer analyzer resolution, cheaper updates
    pub fn high_resolution() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                max_block_size: 1024,
            },
            analyzer: AnalyzerConfig {
                fft_order: FftOrder::Order8192,
                path_resolution: 1,
                ..Default::default()
            },
            update_mode: UpdateMode::OnChange,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.stream
            .validate()
            .and_then(|_| self.analyzer.validate())
            .map_err(|reason| {
                warn!(%reason, "Rejected engine configuration");
                EngineError::ConfigError(reason)
            })
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.stream.sample_rate, 48000);
        assert_eq!(config.stream.max_block_size, 512);
        assert_eq!(config.analyzer.fft_order, FftOrder::Order2048);
        assert_eq!(config.analyzer.floor_db, -48.0);
        assert_eq!(config.analyzer.path_resolution, 2);
        assert_eq!(config.analyzer.fifo_capacity, 32);
        assert_eq!(config.update_mode, UpdateMode::Always);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_latency_calculation() {
        let config = StreamConfig {
            sample_rate: 48000,
            max_block_size: 480, // Exactly 10ms at 48kHz
        };
        assert!((config.block_latency_ms() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_validation() {
        let invalid_rate = StreamConfig {
            sample_rate: 100,
            ..Default::default()
        };
        assert!(invalid_rate.validate().is_err());

        let invalid_block = StreamConfig {
            max_block_size: 10,
            ..Default::default()
        };
        assert!(invalid_block.validate().is_err());

        let invalid_floor = AnalyzerConfig {
            floor_db: 3.0,
            ..Default::default()
        };
        assert!(invalid_floor.validate().is_err());
        for floor_db in [0.0, f32::NAN] {
            let config = AnalyzerConfig {
                floor_db,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "floor {}", floor_db);
        }
        let negative_infinity = AnalyzerConfig {
            floor_db: f32::NEG_INFINITY,
            ..Default::default()
        };
        assert!(negative_infinity.validate().is_ok());

        let invalid_refresh = AnalyzerConfig {
            refresh_hz: 0,
            ..Default::default()
        };
        assert!(invalid_refresh.validate().is_err());

        let config = EngineConfig {
            analyzer: AnalyzerConfig {
                path_resolution: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::ConfigError(_))));
    }

    #[test]
    fn test_preset_configs() {
        let low_latency = EngineConfig::low_latency();
        let high_res = EngineConfig::high_resolution();

        assert!(low_latency.validate().is_ok());
        assert!(high_res.validate().is_ok());
        assert!(low_latency.stream.block_latency_ms() < high_res.stream.block_latency_ms());
        assert!(high_res.analyzer.fft_order.size() > low_latency.analyzer.fft_order.size());
    }

    #[test]
    fn test_tick_interval() {
        let config = AnalyzerConfig::default();
        let interval = config.tick_interval();
        assert!(interval.as_millis() >= 16 && interval.as_millis() <= 17);
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::high_resolution();
        let json = config.to_json().unwrap();
        let deserialized = EngineConfig::from_json(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(EngineConfig::from_json("{ not json").is_err());

        let mut config = EngineConfig::default();
        config.stream.sample_rate = 1;
        let json = serde_json::to_string(&config).unwrap();
        assert!(matches!(
            EngineConfig::from_json(&json),
            Err(EngineError::ConfigError(_))
        ));
    }
}
