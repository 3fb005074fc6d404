//! Front-end configuration.
//!
//! All sections deserialize with defaults for missing fields, so a partial
//! JSON document such as `{"watchdog": {"stall_threshold": 5}}` is valid.

use std::time::Duration;

use rxfe_clock::SynthConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// DMA transfer sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Size of each DMA buffer in bytes.
    pub buffer_size: u32,
    /// Number of DMA buffers in the ring.
    pub buffer_count: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            buffer_size: 16_384,
            buffer_count: 4,
        }
    }
}

/// Stall watchdog timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Tick period in milliseconds.
    pub period_ms: u64,
    /// Consecutive stalled ticks that trigger a recovery.
    pub stall_threshold: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            period_ms: 100,
            stall_threshold: 3,
        }
    }
}

impl WatchdogConfig {
    /// Tick period.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// Complete front-end configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// DMA transfer sizing.
    pub transfer: TransferConfig,
    /// Stall watchdog timing.
    pub watchdog: WatchdogConfig,
    /// Sample clock reference.
    pub clock: SynthConfig,
}

impl FrontendConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let TransferConfig {
            buffer_size,
            buffer_count,
        } = self.transfer;
        if !(1024..=65_536).contains(&buffer_size) {
            return Err(ConfigError::invalid(format!(
                "transfer.buffer_size must be within 1024..=65536, got {buffer_size}"
            )));
        }
        if !buffer_size.is_multiple_of(16) {
            return Err(ConfigError::invalid(format!(
                "transfer.buffer_size must be a multiple of 16, got {buffer_size}"
            )));
        }
        if !(2..=32).contains(&buffer_count) {
            return Err(ConfigError::invalid(format!(
                "transfer.buffer_count must be within 2..=32, got {buffer_count}"
            )));
        }
        if !(10..=10_000).contains(&self.watchdog.period_ms) {
            return Err(ConfigError::invalid(format!(
                "watchdog.period_ms must be within 10..=10000, got {}",
                self.watchdog.period_ms
            )));
        }
        if self.watchdog.stall_threshold == 0 {
            return Err(ConfigError::invalid(
                "watchdog.stall_threshold must be greater than 0",
            ));
        }
        self.clock
            .validate()
            .map_err(|e| ConfigError::invalid(format!("clock: {e}")))?;
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rxfe_stream::FrontendConfig;
    ///
    /// let config = FrontendConfig::from_json_str(r#"{"watchdog": {"stall_threshold": 5}}"#)?;
    /// assert_eq!(config.watchdog.stall_threshold, 5);
    /// assert_eq!(config.transfer.buffer_count, 4);
    /// # Ok::<(), rxfe_stream::ConfigError>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> FrontendConfigBuilder {
        FrontendConfigBuilder::default()
    }
}

/// Builder for `FrontendConfig`.
#[derive(Debug, Default)]
pub struct FrontendConfigBuilder {
    config: FrontendConfig,
}

impl FrontendConfigBuilder {
    /// Set DMA buffer size in bytes.
    #[must_use]
    pub fn buffer_size(mut self, bytes: u32) -> Self {
        self.config.transfer.buffer_size = bytes;
        self
    }

    /// Set number of DMA buffers.
    #[must_use]
    pub fn buffer_count(mut self, count: u32) -> Self {
        self.config.transfer.buffer_count = count;
        self
    }

    /// Set watchdog tick period.
    #[must_use]
    pub fn watchdog_period(mut self, period: Duration) -> Self {
        self.config.watchdog.period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set consecutive stalled ticks before recovery.
    #[must_use]
    pub fn stall_threshold(mut self, ticks: u32) -> Self {
        self.config.watchdog.stall_threshold = ticks;
        self
    }

    /// Set nominal crystal frequency.
    #[must_use]
    pub fn crystal_hz(mut self, hz: u32) -> Self {
        self.config.clock.crystal_hz = hz;
        self
    }

    /// Set crystal correction in parts per billion.
    #[must_use]
    pub fn correction_ppb(mut self, ppb: i32) -> Self {
        self.config.clock.correction_ppb = ppb;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<FrontendConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = FrontendConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transfer.buffer_size, 16_384);
        assert_eq!(config.watchdog.period(), Duration::from_millis(100));
        assert_eq!(config.clock.crystal_hz, 27_000_000);
    }

    #[test]
    fn test_builder() -> Result<(), ConfigError> {
        let config = FrontendConfig::builder()
            .buffer_size(8192)
            .buffer_count(8)
            .watchdog_period(Duration::from_millis(50))
            .stall_threshold(5)
            .correction_ppb(-1500)
            .build()?;
        assert_eq!(config.transfer.buffer_count, 8);
        assert_eq!(config.watchdog.period_ms, 50);
        assert_eq!(config.clock.correction_ppb, -1500);
        Ok(())
    }

    #[test]
    fn test_invalid_buffer_size() {
        assert!(FrontendConfig::builder().buffer_size(1000).build().is_err());
        assert!(FrontendConfig::builder().buffer_size(1032).build().is_ok());
        assert!(FrontendConfig::builder().buffer_size(1036).build().is_err());
        assert!(FrontendConfig::builder().buffer_size(131_072).build().is_err());
    }

    #[test]
    fn test_invalid_buffer_count() {
        assert!(FrontendConfig::builder().buffer_count(1).build().is_err());
        assert!(FrontendConfig::builder().buffer_count(33).build().is_err());
    }

    #[test]
    fn test_invalid_watchdog() {
        assert!(FrontendConfig::builder().stall_threshold(0).build().is_err());
        assert!(
            FrontendConfig::builder()
                .watchdog_period(Duration::from_millis(5))
                .build()
                .is_err()
        );
        assert!(
            FrontendConfig::builder()
                .watchdog_period(Duration::from_secs(11))
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_invalid_clock() {
        let result = FrontendConfig::builder().correction_ppb(200_000).build();
        assert!(matches!(result, Err(ConfigError::Invalid(msg)) if msg.starts_with("clock:")));
    }

    #[test]
    fn test_partial_json() -> Result<(), ConfigError> {
        let config = FrontendConfig::from_json_str(r#"{"transfer": {"buffer_count": 16}}"#)?;
        assert_eq!(config.transfer.buffer_count, 16);
        assert_eq!(config.transfer.buffer_size, 16_384);
        assert_eq!(config.watchdog, WatchdogConfig::default());
        Ok(())
    }

    #[test]
    fn test_json_round_trip() -> Result<(), ConfigError> {
        let config = FrontendConfig::builder().stall_threshold(7).build()?;
        let parsed = FrontendConfig::from_json_str(&config.to_json_string()?)?;
        assert_eq!(parsed, config);
        Ok(())
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            FrontendConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_json_out_of_range() {
        assert!(matches!(
            FrontendConfig::from_json_str(r#"{"watchdog": {"period_ms": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
    }
}
