//! # System Configuration
//!
//! Unified configuration for all subsystems and runtime intervals.
//!
//! ## Security Requirements
//!
//! - `security.access.jwt_secret` MUST NOT be empty or the shipped default
//! - Every periodic interval must be non-zero
//!
//! ## Sources
//!
//! Defaults, then an optional JSON file (`PK_CONFIG_FILE`), then individual
//! `PK_*` environment overrides.

use std::path::Path;
use std::time::Duration;

use pk_01_resource_manager::ZoneSpec;
use pk_02_transaction_processor::{PaymentConfig, RoundingPolicy};
use pk_03_access_controller::{AccessConfig, DEFAULT_JWT_SECRET};
use pk_04_telemetry_cache::TelemetryCacheConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub payment: PaymentConfig,
    pub security: SecurityConfig,
    /// Cache, pool and metrics-history settings.
    pub telemetry: TelemetryCacheConfig,
    pub intervals: IntervalConfig,
    pub coordination: CoordinationConfig,
    /// Zones created at startup.
    pub lot: Vec<ZoneSpec>,
}

/// Access Controller settings plus the session sweep period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub access: AccessConfig,
    pub sweep_interval_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            access: AccessConfig::default(),
            sweep_interval_secs: 60,
        }
    }
}

/// Periods of the scheduler jobs not owned by a subsystem config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub metrics_interval_secs: u64,
    /// Cross-domain view refresh.
    pub snapshot_refresh_secs: u64,
    /// Report schedule evaluation.
    pub schedule_tick_secs: u64,
    /// Period of the stale payment binding sweep.
    pub binding_reconcile_secs: u64,
    /// Age after which a binding is checked against the ledger.
    pub stale_binding_secs: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            metrics_interval_secs: 60,
            snapshot_refresh_secs: 300,
            schedule_tick_secs: 60,
            binding_reconcile_secs: 60,
            stale_binding_secs: 120,
        }
    }
}

/// Payment/parking protocol options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Open the space's gate once its payment settles.
    pub auto_open_gate: bool,
    /// Keep the gate closed after settlement until `confirm_exit`.
    pub require_confirmation: bool,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            auto_open_gate: true,
            require_confirmation: false,
        }
    }
}

impl SystemConfig {
    /// Loads defaults, `PK_CONFIG_FILE` and `PK_*` overrides from the process
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("PK_CONFIG_FILE") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        Ok(config)
    }

    /// Parses a JSON configuration file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("PK_JWT_SECRET") {
            self.security.access.jwt_secret = secret;
        }
        override_parsed(lookup, "PK_JWT_EXPIRY_SECS", &mut self.security.access.jwt_expiry_secs)?;
        override_parsed(lookup, "PK_SESSION_TTL_SECS", &mut self.security.access.session_ttl_secs)?;
        override_parsed(lookup, "PK_BCRYPT_COST", &mut self.security.access.bcrypt_cost)?;
        override_parsed(
            lookup,
            "PK_MAX_LOGIN_ATTEMPTS",
            &mut self.security.access.max_login_attempts,
        )?;
        override_parsed(
            lookup,
            "PK_LOCKOUT_WINDOW_SECS",
            &mut self.security.access.lockout_window_secs,
        )?;
        override_parsed(lookup, "PK_SWEEP_INTERVAL_SECS", &mut self.security.sweep_interval_secs)?;

        override_parsed(lookup, "PK_TAX_RATE_BPS", &mut self.payment.tax_rate_bps)?;
        override_parsed(lookup, "PK_MIN_AMOUNT", &mut self.payment.min_amount)?;
        override_parsed(lookup, "PK_MAX_AMOUNT", &mut self.payment.max_amount)?;
        if let Some(raw) = lookup("PK_ROUNDING") {
            self.payment.rounding = match raw.trim() {
                "up" => RoundingPolicy::Up,
                "down" => RoundingPolicy::Down,
                "nearest" => RoundingPolicy::Nearest,
                _ => return Err(ConfigError::InvalidValue { var: "PK_ROUNDING", value: raw }),
            };
        }

        override_parsed(lookup, "PK_CACHE_TTL_SECS", &mut self.telemetry.cache.default_ttl_secs)?;
        override_parsed(
            lookup,
            "PK_CACHE_CHECK_PERIOD_SECS",
            &mut self.telemetry.cache.check_period_secs,
        )?;
        override_parsed(lookup, "PK_CACHE_MAX_KEYS", &mut self.telemetry.cache.max_keys)?;
        override_parsed(lookup, "PK_POOL_SIZE", &mut self.telemetry.pool.size)?;

        override_parsed(
            lookup,
            "PK_METRICS_INTERVAL_SECS",
            &mut self.intervals.metrics_interval_secs,
        )?;
        override_parsed(
            lookup,
            "PK_SNAPSHOT_REFRESH_SECS",
            &mut self.intervals.snapshot_refresh_secs,
        )?;
        override_parsed(lookup, "PK_SCHEDULE_TICK_SECS", &mut self.intervals.schedule_tick_secs)?;
        override_parsed(
            lookup,
            "PK_BINDING_RECONCILE_SECS",
            &mut self.intervals.binding_reconcile_secs,
        )?;
        override_parsed(lookup, "PK_STALE_BINDING_SECS", &mut self.intervals.stale_binding_secs)?;

        override_parsed(lookup, "PK_AUTO_OPEN_GATE", &mut self.coordination.auto_open_gate)?;
        override_parsed(
            lookup,
            "PK_REQUIRE_CONFIRMATION",
            &mut self.coordination.require_confirmation,
        )?;
        Ok(())
    }

    /// Validate configuration for production readiness.
    ///
    /// # Errors
    ///
    /// - `InsecureJwtSecret`: empty or default JWT secret
    /// - `ZeroSetting`: an interval, TTL, pool size or attempt limit is zero
    /// - `AmountRange`: `min_amount > max_amount`
    /// - `TaxRate`: tax rate outside 0..=100%
    /// - `NoPaymentMethods`: no enabled payment method
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.security.access.jwt_secret.trim();
        if secret.is_empty() || secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }

        let access = &self.security.access;
        let settings: [(&'static str, bool); 11] = [
            ("security.sweep_interval_secs", self.security.sweep_interval_secs == 0),
            ("security.access.jwt_expiry_secs", access.jwt_expiry_secs <= 0),
            ("security.access.session_ttl_secs", access.session_ttl_secs <= 0),
            ("security.access.max_login_attempts", access.max_login_attempts == 0),
            ("telemetry.cache.check_period_secs", self.telemetry.cache.check_period_secs == 0),
            ("telemetry.pool.size", self.telemetry.pool.size == 0),
            ("intervals.metrics_interval_secs", self.intervals.metrics_interval_secs == 0),
            ("intervals.snapshot_refresh_secs", self.intervals.snapshot_refresh_secs == 0),
            ("intervals.schedule_tick_secs", self.intervals.schedule_tick_secs == 0),
            ("intervals.binding_reconcile_secs", self.intervals.binding_reconcile_secs == 0),
            ("telemetry.history_capacity", self.telemetry.history_capacity == 0),
        ];
        if let Some((name, _)) = settings.iter().find(|(_, zero)| *zero) {
            return Err(ConfigError::ZeroSetting(name));
        }

        if self.payment.min_amount > self.payment.max_amount {
            return Err(ConfigError::AmountRange {
                min: self.payment.min_amount,
                max: self.payment.max_amount,
            });
        }
        if self.payment.tax_rate_bps > 10_000 {
            return Err(ConfigError::TaxRate(self.payment.tax_rate_bps));
        }
        if !self.payment.methods.iter().any(|method| method.enabled) {
            return Err(ConfigError::NoPaymentMethods);
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.security.sweep_interval_secs)
    }

    pub fn cache_purge_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry.cache.check_period_secs)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.intervals.metrics_interval_secs)
    }

    pub fn snapshot_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.intervals.snapshot_refresh_secs)
    }

    pub fn schedule_tick_interval(&self) -> Duration {
        Duration::from_secs(self.intervals.schedule_tick_secs)
    }

    pub fn binding_reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.intervals.binding_reconcile_secs)
    }

    /// A zero age reconciles every binding whose payment has finished.
    pub fn stale_binding_age(&self) -> Duration {
        Duration::from_secs(self.intervals.stale_binding_secs)
    }
}

fn override_parsed<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(var) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw })?;
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "SECURITY VIOLATION: JWT secret is empty or the shipped default. \
         Set PK_JWT_SECRET or provide security.access.jwt_secret in the config file."
    )]
    InsecureJwtSecret,

    #[error("{0} must be greater than zero")]
    ZeroSetting(&'static str),

    #[error("min_amount {min} exceeds max_amount {max}")]
    AmountRange { min: u64, max: u64 },

    #[error("Tax rate {0} bps outside 0..=10000")]
    TaxRate(u32),

    #[error("No enabled payment method configured")]
    NoPaymentMethods,

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Cannot load config file {path}: {reason}")]
    File { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid() -> SystemConfig {
        SystemConfig::from_lookup(lookup(&[("PK_JWT_SECRET", "s3cret-for-tests")])).unwrap()
    }

    #[test]
    fn test_defaults_reject_shipped_secret() {
        let config = SystemConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::InsecureJwtSecret));
        assert!(config.coordination.auto_open_gate);
        assert!(!config.coordination.require_confirmation);
    }

    #[test]
    fn test_env_overrides() {
        let config = SystemConfig::from_lookup(lookup(&[
            ("PK_JWT_SECRET", "abc"),
            ("PK_TAX_RATE_BPS", "800"),
            ("PK_ROUNDING", "down"),
            ("PK_REQUIRE_CONFIRMATION", "true"),
            ("PK_SNAPSHOT_REFRESH_SECS", "30"),
            ("PK_STALE_BINDING_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.security.access.jwt_secret, "abc");
        assert_eq!(config.payment.tax_rate_bps, 800);
        assert_eq!(config.payment.rounding, RoundingPolicy::Down);
        assert!(config.coordination.require_confirmation);
        assert_eq!(config.snapshot_refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.stale_binding_age(), Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparseable_override_is_an_error() {
        let err = SystemConfig::from_lookup(lookup(&[("PK_POOL_SIZE", "ten")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "PK_POOL_SIZE",
                value: "ten".into()
            }
        );

        let err = SystemConfig::from_lookup(lookup(&[("PK_ROUNDING", "banker")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "PK_ROUNDING", .. }));
    }

    #[test]
    fn test_rejects_zero_intervals() {
        let mut config = valid();
        config.intervals.schedule_tick_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroSetting("intervals.schedule_tick_secs"))
        );

        let mut config = valid();
        config.intervals.binding_reconcile_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroSetting("intervals.binding_reconcile_secs"))
        );

        let mut config = valid();
        config.security.sweep_interval_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroSetting("security.sweep_interval_secs"))
        );
    }

    #[test]
    fn test_rejects_bad_payment_settings() {
        let mut config = valid();
        config.payment.min_amount = 500;
        config.payment.max_amount = 100;
        assert_eq!(
            config.validate(),
            Err(ConfigError::AmountRange { min: 500, max: 100 })
        );

        let mut config = valid();
        config.payment.tax_rate_bps = 10_001;
        assert_eq!(config.validate(), Err(ConfigError::TaxRate(10_001)));

        let mut config = valid();
        for method in &mut config.payment.methods {
            method.enabled = false;
        }
        assert_eq!(config.validate(), Err(ConfigError::NoPaymentMethods));
    }

    #[test]
    fn test_json_config_uses_defaults_for_missing_fields() {
        let raw = r#"{
            "security": { "access": { "jwt_secret": "from-file" } },
            "coordination": { "require_confirmation": true },
            "lot": [ { "id": "A", "name": "Level A", "vehicle_type": "car", "capacity": 3, "gate_id": "G1" } ]
        }"#;
        let config: SystemConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.security.access.jwt_secret, "from-file");
        assert_eq!(config.security.sweep_interval_secs, 60);
        assert!(config.coordination.auto_open_gate);
        assert!(config.coordination.require_confirmation);
        assert_eq!(config.lot.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_file() {
        let err =
            SystemConfig::from_lookup(lookup(&[("PK_CONFIG_FILE", "/nonexistent/pk.json")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::File { .. }));
    }
}
