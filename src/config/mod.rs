//! Configuration management.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, `LOCKOUT_CONFIG_PATH`, or the platform
//!    config dir, e.g. `~/.config/lockout/config.toml`)
//! 3. Environment variables (a `.env` file in the working directory is loaded
//!    first)
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `LOCKOUT_STORE` | Store location (path or URL) |
//! | `LOCKOUT_CREDENTIALS` | Path to the store credential bundle |
//! | `LOCKOUT_ADMIN_PIN` | Admin PIN; unset disables admin actions |
//! | `LOCKOUT_TIMEZONE` | `Europe/London` or `UTC` |
//! | `LOCKOUT_FUZZY_THRESHOLD` | Fuzzy company threshold, 70-95 |
//! | `LOCKOUT_FUZZY_ENABLED` | `false` to turn fuzzy matching off |
//! | `LOCKOUT_HASH_SALT` | Salt for email/phone digests |
//! | `LOCKOUT_PII_MODE` | `hashed` (default) or `raw` |
//! | `LOCKOUT_LEDGER_TIMEOUT_MS` | Per-call ledger timeout |
//! | `LOCKOUT_LOG_FORMAT` | `pretty` or `json` |
//! | `LOCKOUT_LOG` | Log filter directive, e.g. `lockout=debug` |

mod features;

pub use features::Capabilities;

use crate::models::StoreTimezone;
use crate::observability::{LogFormat, LoggingSettings};
use crate::services::deduplication::FuzzyThreshold;
use crate::storage::{StorageResilienceConfig, WriterGateConfig};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How email and phone are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PiiMode {
    /// Salted digests only (privacy-hardened schema).
    #[default]
    Hashed,
    /// Raw values (legacy schema). Enables the email-domain signal.
    Raw,
}

impl PiiMode {
    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hashed => "hashed",
            Self::Raw => "raw",
        }
    }

    /// Parses a mode string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hashed" | "hash" | "private" => Some(Self::Hashed),
            "raw" | "legacy" => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Salt for email/phone digests.
#[derive(Debug, Clone)]
pub enum HashSalt {
    /// Operator-supplied salt.
    Configured(SecretString),
    /// Well-known fallback. Digests are still one-way but trivially
    /// dictionary-attackable, so this is reported as degraded security.
    Fallback,
}

impl HashSalt {
    /// Salt used when none is configured.
    pub const FALLBACK: &'static str = "lockout-public-fallback-salt";

    /// Builds a salt from an optional configured value; blank counts as absent.
    #[must_use]
    pub fn from_option(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Self::Configured(SecretString::from(v)),
            _ => Self::Fallback,
        }
    }

    /// Returns true when the fallback salt is in use.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    /// Returns the salt text.
    #[must_use]
    pub fn expose(&self) -> &str {
        match self {
            Self::Configured(secret) => secret.expose_secret(),
            Self::Fallback => Self::FALLBACK,
        }
    }
}

impl Default for HashSalt {
    fn default() -> Self {
        Self::Fallback
    }
}

/// Store location and credentials.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Store location identifier (directory path or URL).
    pub location: Option<String>,
    /// Path to the credential bundle for the store transport.
    pub credentials: Option<PathBuf>,
}

/// Main configuration for lockout.
#[derive(Debug, Clone, Default)]
pub struct LockoutConfig {
    /// Store location and credentials.
    pub store: StoreConfig,
    /// Admin PIN. `None` disables every admin action.
    pub admin_pin: Option<SecretString>,
    /// Timezone used for `Date` and "today".
    pub timezone: StoreTimezone,
    /// Fuzzy company match threshold.
    pub fuzzy_threshold: FuzzyThreshold,
    /// Optional capabilities.
    pub capabilities: Capabilities,
    /// Salt for email/phone digests.
    pub hash_salt: HashSalt,
    /// How email and phone are persisted.
    pub pii_mode: PiiMode,
    /// Ledger call timeout and circuit breaker.
    pub resilience: StorageResilienceConfig,
    /// Single-writer gate settings.
    pub writer_gate: WriterGateConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Store location.
    pub store: Option<String>,
    /// Credential bundle path.
    pub credentials: Option<String>,
    /// Admin PIN.
    pub admin_pin: Option<String>,
    /// Timezone name.
    pub timezone: Option<String>,
    /// Fuzzy threshold.
    pub fuzzy_threshold: Option<i64>,
    /// Hash salt.
    pub hash_salt: Option<String>,
    /// PII mode.
    pub pii_mode: Option<String>,
    /// Feature switches.
    pub features: Option<ConfigFileFeatures>,
    /// Ledger settings.
    pub ledger: Option<ConfigFileLedger>,
    /// Logging settings.
    pub logging: Option<ConfigFileLogging>,
}

/// Features section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFeatures {
    /// Fuzzy company matching.
    pub fuzzy_matching: Option<bool>,
}

/// Ledger section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLedger {
    /// Per-call timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Consecutive failures before the breaker opens.
    pub breaker_failure_threshold: Option<u32>,
    /// Breaker reset timeout in milliseconds.
    pub breaker_reset_ms: Option<u64>,
    /// Maximum wait for the writer gate in milliseconds.
    pub writer_wait_ms: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl LockoutConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        let config = Self::from_toml(&contents)?;
        Ok(config.with_env_overrides())
    }

    /// Parses configuration from TOML text (no environment overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`].
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks, in order, `LOCKOUT_CONFIG_PATH`, the platform config dir, and
    /// `~/.config/lockout/config.toml`. Falls back to defaults when no file is
    /// found. Environment overrides are always applied.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but is invalid.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var("LOCKOUT_CONFIG_PATH")
            && !path.trim().is_empty()
        {
            return Self::load_from_file(Path::new(&path));
        }

        if let Some(base_dirs) = directories::BaseDirs::new() {
            let candidates = [
                base_dirs.config_dir().join("lockout").join("config.toml"),
                base_dirs
                    .home_dir()
                    .join(".config")
                    .join("lockout")
                    .join("config.toml"),
            ];
            for candidate in candidates {
                if candidate.exists() {
                    return Self::load_from_file(&candidate);
                }
            }
        }

        Ok(Self::default().with_env_overrides())
    }

    /// Converts a `ConfigFile` to `LockoutConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        config.store.location = file.store.filter(|s| !s.trim().is_empty());
        config.store.credentials = file.credentials.map(PathBuf::from);
        config.admin_pin = file
            .admin_pin
            .filter(|p| !p.is_empty())
            .map(SecretString::from);
        if let Some(tz) = file.timezone {
            config.timezone = StoreTimezone::parse(&tz)
                .ok_or_else(|| Error::InvalidInput(format!("unsupported timezone '{tz}'")))?;
        }
        if let Some(threshold) = file.fuzzy_threshold {
            config.fuzzy_threshold = FuzzyThreshold::clamped(threshold);
        }
        config.hash_salt = HashSalt::from_option(file.hash_salt);
        if let Some(mode) = file.pii_mode {
            config.pii_mode = PiiMode::parse(&mode)
                .ok_or_else(|| Error::InvalidInput(format!("unknown pii_mode '{mode}'")))?;
        }
        if let Some(features) = file.features
            && let Some(fuzzy) = features.fuzzy_matching
        {
            config.capabilities = Capabilities::resolve(fuzzy);
        }
        if let Some(ledger) = file.ledger {
            if let Some(v) = ledger.timeout_ms {
                config.resilience = config.resilience.with_call_timeout_ms(v);
            }
            if let Some(v) = ledger.breaker_failure_threshold {
                config.resilience = config.resilience.with_failure_threshold(v);
            }
            if let Some(v) = ledger.breaker_reset_ms {
                config.resilience = config.resilience.with_reset_timeout_ms(v);
            }
            if let Some(v) = ledger.writer_wait_ms {
                config.writer_gate = config.writer_gate.with_acquire_timeout_ms(v);
            }
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            if logging.filter.is_some() {
                config.logging.filter = logging.filter;
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }

        Ok(config)
    }

    /// Applies environment variable overrides.
    ///
    /// Invalid values are logged and ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("LOCKOUT_STORE")
            && !v.trim().is_empty()
        {
            self.store.location = Some(v);
        }
        if let Ok(v) = std::env::var("LOCKOUT_CREDENTIALS")
            && !v.trim().is_empty()
        {
            self.store.credentials = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("LOCKOUT_ADMIN_PIN")
            && !v.is_empty()
        {
            self.admin_pin = Some(SecretString::from(v));
        }
        if let Ok(v) = std::env::var("LOCKOUT_TIMEZONE") {
            match StoreTimezone::parse(&v) {
                Some(tz) => self.timezone = tz,
                None => tracing::warn!(value = %v, "Ignoring unsupported LOCKOUT_TIMEZONE"),
            }
        }
        if let Ok(v) = std::env::var("LOCKOUT_FUZZY_THRESHOLD") {
            match v.trim().parse::<i64>() {
                Ok(parsed) => self.fuzzy_threshold = FuzzyThreshold::clamped(parsed),
                Err(_) => tracing::warn!(value = %v, "Ignoring non-numeric LOCKOUT_FUZZY_THRESHOLD"),
            }
        }
        if let Ok(v) = std::env::var("LOCKOUT_FUZZY_ENABLED") {
            self.capabilities =
                Capabilities::resolve(!(v.eq_ignore_ascii_case("false") || v == "0"));
        }
        if let Ok(v) = std::env::var("LOCKOUT_HASH_SALT")
            && !v.trim().is_empty()
        {
            self.hash_salt = HashSalt::from_option(Some(v));
        }
        if let Ok(v) = std::env::var("LOCKOUT_PII_MODE") {
            match PiiMode::parse(&v) {
                Some(mode) => self.pii_mode = mode,
                None => tracing::warn!(value = %v, "Ignoring unknown LOCKOUT_PII_MODE"),
            }
        }
        if let Ok(v) = std::env::var("LOCKOUT_LEDGER_TIMEOUT_MS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            self.resilience = self.resilience.with_call_timeout_ms(parsed);
        }
        if let Ok(v) = std::env::var("LOCKOUT_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&v);
        }
        if let Ok(v) = std::env::var("LOCKOUT_LOG")
            && !v.trim().is_empty()
        {
            self.logging.filter = Some(v);
        }
        self
    }

    /// Returns the store location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no store is configured.
    pub fn store_location(&self) -> Result<&str> {
        self.store.location.as_deref().ok_or_else(|| {
            Error::InvalidInput(
                "no store configured; set LOCKOUT_STORE or `store` in config.toml".to_string(),
            )
        })
    }

    /// Returns warnings an operator should see on every start.
    #[must_use]
    pub fn security_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.hash_salt.is_degraded() {
            warnings.push(
                "LOCKOUT_HASH_SALT is not set: using the public fallback salt. \
                 Email/phone digests are not protected against dictionary attacks."
                    .to_string(),
            );
        }
        if self.admin_pin.is_none() {
            warnings.push("No admin PIN configured: admin actions are disabled.".to_string());
        }
        warnings
    }

    /// Sets the store location.
    #[must_use]
    pub fn with_store(mut self, location: impl Into<String>) -> Self {
        self.store.location = Some(location.into());
        self
    }

    /// Sets the admin PIN.
    #[must_use]
    pub fn with_admin_pin(mut self, pin: impl Into<String>) -> Self {
        self.admin_pin = Some(SecretString::from(pin.into()));
        self
    }

    /// Sets the hash salt.
    #[must_use]
    pub fn with_hash_salt(mut self, salt: impl Into<String>) -> Self {
        self.hash_salt = HashSalt::from_option(Some(salt.into()));
        self
    }

    /// Sets the timezone.
    #[must_use]
    pub const fn with_timezone(mut self, timezone: StoreTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Sets the fuzzy threshold.
    #[must_use]
    pub const fn with_fuzzy_threshold(mut self, threshold: FuzzyThreshold) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Sets the PII mode.
    #[must_use]
    pub const fn with_pii_mode(mut self, mode: PiiMode) -> Self {
        self.pii_mode = mode;
        self
    }

    /// Sets the capabilities.
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the ledger resilience settings.
    #[must_use]
    pub const fn with_resilience(mut self, resilience: StorageResilienceConfig) -> Self {
        self.resilience = resilience;
        self
    }
}
