//! Engine Configuration
//!
//! The host hands over a flat record of numbers and flags. Every field is
//! optional there (older entries predate newer options), so the record is
//! deserialized as [`ConfigRecord`] and turned into a validated, immutable
//! [`AdjacencyConfig`] with defaults filled in.
//!
//! Validation happens before any computation:
//! - thresholds, accuracy and speed must be finite and non-negative
//! - `exit_threshold_m >= entry_threshold_m`, otherwise the hysteresis band
//!   is inverted and proximity would flap
//! - a counting window is required when updates are counted
//!
//! ```rust
//! use adjacency_core::config::AdjacencyConfig;
//! use adjacency_core::ConfigError;
//!
//! let err = AdjacencyConfig::builder()
//!     .thresholds(700.0, 500.0)
//!     .build()
//!     .unwrap_err();
//! assert!(matches!(err, ConfigError::ThresholdOrder { .. }));
//! ```

use crate::constants::defaults::*;
use crate::errors::{ConfigError, ConfigResult};
use crate::time::secs_to_ms;

/// Configuration record as stored by the host, every field optional
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConfigRecord {
    pub entry_threshold_m: Option<f64>,
    pub exit_threshold_m: Option<f64>,
    pub debounce_seconds: Option<u64>,
    pub max_accuracy_m: Option<f64>,
    pub force_meters: Option<bool>,
    pub resync_silence_s: Option<u64>,
    pub resync_hold_s: Option<u64>,
    pub max_speed_kmh: Option<f64>,
    pub min_updates_for_proximity: Option<u32>,
    pub update_window_s: Option<u64>,
    pub require_reliable_proximity: Option<bool>,
}

/// Validated engine configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AdjacencyConfig {
    entry_threshold_m: f64,
    exit_threshold_m: f64,
    debounce_seconds: u64,
    max_accuracy_m: f64,
    force_meters: bool,
    resync_silence_s: u64,
    resync_hold_s: u64,
    max_speed_kmh: f64,
    min_updates_for_proximity: u32,
    update_window_s: u64,
    require_reliable_proximity: bool,
}

impl Default for AdjacencyConfig {
    fn default() -> Self {
        Self {
            entry_threshold_m: DEFAULT_ENTRY_THRESHOLD_M,
            exit_threshold_m: DEFAULT_EXIT_THRESHOLD_M,
            debounce_seconds: DEFAULT_DEBOUNCE_SECONDS,
            max_accuracy_m: DEFAULT_MAX_ACCURACY_M,
            force_meters: DEFAULT_FORCE_METERS,
            resync_silence_s: DEFAULT_RESYNC_SILENCE_S,
            resync_hold_s: DEFAULT_RESYNC_HOLD_S,
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
            min_updates_for_proximity: DEFAULT_MIN_UPDATES_FOR_PROXIMITY,
            update_window_s: DEFAULT_UPDATE_WINDOW_S,
            require_reliable_proximity: DEFAULT_REQUIRE_RELIABLE_PROXIMITY,
        }
    }
}

impl AdjacencyConfig {
    /// Start from defaults
    pub fn builder() -> AdjacencyConfigBuilder {
        AdjacencyConfigBuilder {
            config: Self::default(),
        }
    }

    /// Fill missing fields with defaults and validate
    pub fn from_record(record: &ConfigRecord) -> ConfigResult<Self> {
        let defaults = Self::default();
        let config = Self {
            entry_threshold_m: record.entry_threshold_m.unwrap_or(defaults.entry_threshold_m),
            exit_threshold_m: record.exit_threshold_m.unwrap_or(defaults.exit_threshold_m),
            debounce_seconds: record.debounce_seconds.unwrap_or(defaults.debounce_seconds),
            max_accuracy_m: record.max_accuracy_m.unwrap_or(defaults.max_accuracy_m),
            force_meters: record.force_meters.unwrap_or(defaults.force_meters),
            resync_silence_s: record.resync_silence_s.unwrap_or(defaults.resync_silence_s),
            resync_hold_s: record.resync_hold_s.unwrap_or(defaults.resync_hold_s),
            max_speed_kmh: record.max_speed_kmh.unwrap_or(defaults.max_speed_kmh),
            min_updates_for_proximity: record
                .min_updates_for_proximity
                .unwrap_or(defaults.min_updates_for_proximity),
            update_window_s: record.update_window_s.unwrap_or(defaults.update_window_s),
            require_reliable_proximity: record
                .require_reliable_proximity
                .unwrap_or(defaults.require_reliable_proximity),
        };
        config.validate()
    }

    /// Record holding every field of this configuration
    pub fn to_record(&self) -> ConfigRecord {
        ConfigRecord {
            entry_threshold_m: Some(self.entry_threshold_m),
            exit_threshold_m: Some(self.exit_threshold_m),
            debounce_seconds: Some(self.debounce_seconds),
            max_accuracy_m: Some(self.max_accuracy_m),
            force_meters: Some(self.force_meters),
            resync_silence_s: Some(self.resync_silence_s),
            resync_hold_s: Some(self.resync_hold_s),
            max_speed_kmh: Some(self.max_speed_kmh),
            min_updates_for_proximity: Some(self.min_updates_for_proximity),
            update_window_s: Some(self.update_window_s),
            require_reliable_proximity: Some(self.require_reliable_proximity),
        }
    }

    fn validate(self) -> ConfigResult<Self> {
        non_negative("entry_threshold_m", self.entry_threshold_m)?;
        non_negative("exit_threshold_m", self.exit_threshold_m)?;
        non_negative("max_accuracy_m", self.max_accuracy_m)?;
        non_negative("max_speed_kmh", self.max_speed_kmh)?;

        if self.exit_threshold_m < self.entry_threshold_m {
            return Err(ConfigError::ThresholdOrder {
                entry_m: self.entry_threshold_m,
                exit_m: self.exit_threshold_m,
            });
        }

        if self.min_updates_for_proximity > 0 && self.update_window_s == 0 {
            return Err(ConfigError::InvalidValue { field: "update_window_s" });
        }

        // The per-subject history holds at most this many acceptances
        if self.min_updates_for_proximity as usize > MAX_UPDATE_HISTORY {
            return Err(ConfigError::InvalidValue { field: "min_updates_for_proximity" });
        }

        Ok(self)
    }

    pub fn entry_threshold_m(&self) -> f64 {
        self.entry_threshold_m
    }

    pub fn exit_threshold_m(&self) -> f64 {
        self.exit_threshold_m
    }

    pub fn debounce_seconds(&self) -> u64 {
        self.debounce_seconds
    }

    /// Debounce delay in milliseconds
    pub fn debounce_ms(&self) -> u64 {
        secs_to_ms(self.debounce_seconds)
    }

    /// Accuracy ceiling, `None` when the filter is disabled
    pub fn accuracy_ceiling_m(&self) -> Option<f64> {
        (self.max_accuracy_m > 0.0).then_some(self.max_accuracy_m)
    }

    pub fn max_accuracy_m(&self) -> f64 {
        self.max_accuracy_m
    }

    pub fn force_meters(&self) -> bool {
        self.force_meters
    }

    pub fn resync_silence_s(&self) -> u64 {
        self.resync_silence_s
    }

    pub fn resync_hold_s(&self) -> u64 {
        self.resync_hold_s
    }

    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    /// Speed ceiling, `None` when the filter is disabled
    pub fn speed_ceiling_kmh(&self) -> Option<f64> {
        (self.max_speed_kmh > 0.0).then_some(self.max_speed_kmh)
    }

    pub fn min_updates_for_proximity(&self) -> u32 {
        self.min_updates_for_proximity
    }

    pub fn update_window_s(&self) -> u64 {
        self.update_window_s
    }

    pub fn require_reliable_proximity(&self) -> bool {
        self.require_reliable_proximity
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field })
    }
}

/// Builder for [`AdjacencyConfig`]
#[derive(Debug, Clone)]
pub struct AdjacencyConfigBuilder {
    config: AdjacencyConfig,
}

impl AdjacencyConfigBuilder {
    /// Entry and exit thresholds in meters
    pub fn thresholds(mut self, entry_m: f64, exit_m: f64) -> Self {
        self.config.entry_threshold_m = entry_m;
        self.config.exit_threshold_m = exit_m;
        self
    }

    pub fn debounce_seconds(mut self, seconds: u64) -> Self {
        self.config.debounce_seconds = seconds;
        self
    }

    /// Accuracy ceiling in meters, 0 disables the filter
    pub fn max_accuracy_m(mut self, meters: f64) -> Self {
        self.config.max_accuracy_m = meters;
        self
    }

    pub fn force_meters(mut self, force: bool) -> Self {
        self.config.force_meters = force;
        self
    }

    /// Silence that triggers a resync and the hold that follows, in seconds
    pub fn resync(mut self, silence_s: u64, hold_s: u64) -> Self {
        self.config.resync_silence_s = silence_s;
        self.config.resync_hold_s = hold_s;
        self
    }

    /// Speed ceiling in km/h, 0 disables the filter
    pub fn max_speed_kmh(mut self, kmh: f64) -> Self {
        self.config.max_speed_kmh = kmh;
        self
    }

    /// Updates each side needs within `window_s` seconds
    pub fn min_updates(mut self, count: u32, window_s: u64) -> Self {
        self.config.min_updates_for_proximity = count;
        self.config.update_window_s = window_s;
        self
    }

    pub fn require_reliable_proximity(mut self, require: bool) -> Self {
        self.config.require_reliable_proximity = require;
        self
    }

    pub fn build(self) -> ConfigResult<AdjacencyConfig> {
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AdjacencyConfig::from_record(&ConfigRecord::default()).unwrap();
        assert_eq!(config, AdjacencyConfig::default());
        assert_eq!(config.entry_threshold_m(), 500.0);
        assert_eq!(config.exit_threshold_m(), 700.0);
        assert_eq!(config.debounce_ms(), 2000);
        assert!(config.require_reliable_proximity());
    }

    #[test]
    fn exit_below_entry_is_rejected() {
        let record = ConfigRecord {
            entry_threshold_m: Some(500.0),
            exit_threshold_m: Some(499.0),
            ..Default::default()
        };
        assert_eq!(
            AdjacencyConfig::from_record(&record),
            Err(ConfigError::ThresholdOrder { entry_m: 500.0, exit_m: 499.0 })
        );
    }

    #[test]
    fn equal_thresholds_are_allowed() {
        assert!(AdjacencyConfig::builder().thresholds(300.0, 300.0).build().is_ok());
    }

    #[test]
    fn negative_and_nan_values_are_rejected() {
        let err = AdjacencyConfig::builder().max_speed_kmh(-1.0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidValue { field: "max_speed_kmh" });

        let err = AdjacencyConfig::builder().thresholds(f64::NAN, 700.0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidValue { field: "entry_threshold_m" });
    }

    #[test]
    fn zero_window_needs_zero_min_updates() {
        assert!(AdjacencyConfig::builder().min_updates(3, 0).build().is_err());
        assert!(AdjacencyConfig::builder().min_updates(0, 0).build().is_ok());
    }

    #[test]
    fn min_updates_capped_by_history() {
        let limit = MAX_UPDATE_HISTORY as u32;
        assert!(AdjacencyConfig::builder().min_updates(limit, 300).build().is_ok());

        let err = AdjacencyConfig::builder().min_updates(limit + 1, 300).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidValue { field: "min_updates_for_proximity" });
    }

    #[test]
    fn huge_debounce_saturates() {
        let config = AdjacencyConfig::builder().debounce_seconds(u64::MAX).build().unwrap();
        assert_eq!(config.debounce_ms(), u64::MAX);
    }

    #[test]
    fn disabled_filters() {
        let config = AdjacencyConfig::builder()
            .max_accuracy_m(0.0)
            .max_speed_kmh(0.0)
            .build()
            .unwrap();
        assert_eq!(config.accuracy_ceiling_m(), None);
        assert_eq!(config.speed_ceiling_kmh(), None);
    }

    #[test]
    fn partial_record_from_json() {
        let record: ConfigRecord =
            serde_json::from_str(r#"{"entry_threshold_m": 300, "require_reliable_proximity": false}"#).unwrap();
        let config = AdjacencyConfig::from_record(&record).unwrap();
        assert_eq!(config.entry_threshold_m(), 300.0);
        assert_eq!(config.exit_threshold_m(), DEFAULT_EXIT_THRESHOLD_M);
        assert!(!config.require_reliable_proximity());
        assert_eq!(AdjacencyConfig::from_record(&config.to_record()), Ok(config));
    }
}
