//! Configuration module

use serde::{Deserialize, Serialize};

use crate::chase::ELEMENT;
use crate::error::ProbeError;
use crate::topology::{DEFAULT_L1_SIZE, DEFAULT_L2_SIZE, DEFAULT_L3_SIZE};

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chase steps timed per level
    pub iterations: u64,

    /// Bytes between consecutive chase targets
    pub stride: usize,

    /// Sizes used when the OS does not report one
    pub defaults: DefaultSizes,

    /// Pin the measuring thread to this core
    pub pin_core: Option<usize>,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSizes {
    pub l1: usize,
    pub l2: usize,
    pub l3: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: 10_000_000,
            stride: 64,
            defaults: DefaultSizes::default(),
            pin_core: Some(0),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DefaultSizes {
    fn default() -> Self {
        Self {
            l1: DEFAULT_L1_SIZE,
            l2: DEFAULT_L2_SIZE,
            l3: DEFAULT_L3_SIZE,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_output: false,
        }
    }
}

impl Config {
    /// Load config from environment
    pub fn from_env() -> anyhow::Result<Self> {
        // Try to load from file first
        let config_path = std::env::var("CACHE_LATENCY_CONFIG")
            .unwrap_or_else(|_| "config/cache-latency.json".to_string());

        let mut config = if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        if let Ok(iterations) = std::env::var("CACHE_LATENCY_ITERATIONS") {
            config.iterations = iterations.trim().parse()?;
        }
        if let Ok(stride) = std::env::var("CACHE_LATENCY_STRIDE") {
            config.stride = stride.trim().parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(dir) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the probe cannot run with
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.iterations == 0 {
            return Err(ProbeError::ZeroIterations);
        }
        if self.stride == 0 || self.stride % ELEMENT != 0 {
            return Err(ProbeError::InvalidStride {
                stride: self.stride,
                element: ELEMENT,
            });
        }
        for size in [self.defaults.l1, self.defaults.l2, self.defaults.l3] {
            if size < ELEMENT {
                return Err(ProbeError::BufferTooSmall {
                    size,
                    element: ELEMENT,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.iterations, 10_000_000);
        assert_eq!(config.stride, 64);
        assert_eq!(config.defaults.l1, 32_768);
        assert_eq!(config.defaults.l2, 262_144);
        assert_eq!(config.defaults.l3, 8_388_608);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"iterations": 500, "defaults": {"l3": 4096}}"#).unwrap();
        assert_eq!(config.iterations, 500);
        assert_eq!(config.stride, 64);
        assert_eq!(config.defaults.l1, DEFAULT_L1_SIZE);
        assert_eq!(config.defaults.l3, 4096);
    }

    #[test]
    fn test_validate_rejects_degenerate() {
        let mut config = Config::default();
        config.iterations = 0;
        assert_eq!(config.validate(), Err(ProbeError::ZeroIterations));

        let mut config = Config::default();
        config.stride = 12;
        assert!(matches!(config.validate(), Err(ProbeError::InvalidStride { stride: 12, .. })));

        let mut config = Config::default();
        config.defaults.l2 = 1;
        assert!(matches!(config.validate(), Err(ProbeError::BufferTooSmall { size: 1, .. })));
    }

    #[test]
    fn test_save_roundtrip() {
        let path = std::env::temp_dir().join(format!("cache-latency-{}.json", std::process::id()));
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.pin_core = None;
        config.save(path).unwrap();

        let loaded: Config = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        std::fs::remove_file(path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = std::env::temp_dir().join(format!("cache-latency-dir-{}", std::process::id()));
        let path = dir.join("nested").join("cache-latency.json");
        let path_str = path.to_str().unwrap();

        Config::default().save(path_str).unwrap();
        let loaded: Config = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(loaded, Config::default());
    }
}
