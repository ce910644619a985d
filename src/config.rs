use std::env;
use std::time::Duration;

use crate::lookahead::DEFAULT_LOOKAHEAD_LIMIT;

/// Complete configuration, loaded from environment variables or default values.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub lookahead: LookaheadConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    /// Reads a `.env` file if present, then the environment.
    pub fn load() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            let missing = matches!(
                err,
                dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound
            );
            if !missing {
                log::warn!("Could not load .env: {}", err);
            }
        }
        Self::from_env()
    }

    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            lookahead: LookaheadConfig::from_env(),
            export: ExportConfig::from_env(),
        }
    }
}

/// Tuning of the lookahead tie-break.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookaheadConfig {
    /// Whether the lookahead tie-break is consulted at all.
    pub enabled: bool,
    /// Number of upcoming items sampled per evaluation (at least 1).
    pub limit: usize,
    /// Score the two sides of a comparison concurrently.
    pub parallel: bool,
    /// Recompute cache hits and replace entries that disagree.
    pub verify_cache_hits: bool,
    /// Time budget per accelerator call.
    pub accelerator_timeout: Duration,
}

impl LookaheadConfig {
    pub const DEFAULT_ENABLED: bool = true;
    pub const DEFAULT_LIMIT: usize = DEFAULT_LOOKAHEAD_LIMIT;
    pub const DEFAULT_PARALLEL: bool = false;
    pub const DEFAULT_VERIFY_CACHE_HITS: bool = false;
    pub const DEFAULT_ACCELERATOR_TIMEOUT: Duration = Duration::from_millis(250);

    const ENABLED_VAR: &'static str = "BOXPACK_LOOKAHEAD_ENABLED";
    const LIMIT_VAR: &'static str = "BOXPACK_LOOKAHEAD_LIMIT";
    const PARALLEL_VAR: &'static str = "BOXPACK_LOOKAHEAD_PARALLEL";
    const VERIFY_VAR: &'static str = "BOXPACK_VERIFY_CACHE_HITS";
    const TIMEOUT_VAR: &'static str = "BOXPACK_ACCELERATOR_TIMEOUT_MS";

    /// Creates a builder starting from the defaults.
    pub fn builder() -> LookaheadConfigBuilder {
        LookaheadConfigBuilder::default()
    }

    fn from_env() -> Self {
        let enabled = load_bool(Self::ENABLED_VAR, Self::DEFAULT_ENABLED);
        let parallel = load_bool(Self::PARALLEL_VAR, Self::DEFAULT_PARALLEL);
        let verify_cache_hits = load_bool(Self::VERIFY_VAR, Self::DEFAULT_VERIFY_CACHE_HITS);

        let limit = load_u64_with_warning(
            Self::LIMIT_VAR,
            Self::DEFAULT_LIMIT as u64,
            |value| value >= 1,
            "must be at least 1",
            "Adjusted lookahead depth changes orientation choices",
        ) as usize;

        let timeout_ms = load_u64_with_warning(
            Self::TIMEOUT_VAR,
            Self::DEFAULT_ACCELERATOR_TIMEOUT.as_millis() as u64,
            |value| value > 0,
            "must be greater than 0",
            "Adjusted accelerator timeout",
        );

        Self::builder()
            .enabled(enabled)
            .limit(limit)
            .parallel(parallel)
            .verify_cache_hits(verify_cache_hits)
            .accelerator_timeout(Duration::from_millis(timeout_ms))
            .build()
    }
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self {
            enabled: Self::DEFAULT_ENABLED,
            limit: Self::DEFAULT_LIMIT,
            parallel: Self::DEFAULT_PARALLEL,
            verify_cache_hits: Self::DEFAULT_VERIFY_CACHE_HITS,
            accelerator_timeout: Self::DEFAULT_ACCELERATOR_TIMEOUT,
        }
    }
}

/// Builder for [`LookaheadConfig`].
#[derive(Clone, Debug, Default)]
pub struct LookaheadConfigBuilder {
    config: LookaheadConfig,
}

impl LookaheadConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Sets the sample size; values below 1 are raised to 1.
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = limit.max(1);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn verify_cache_hits(mut self, verify: bool) -> Self {
        self.config.verify_cache_hits = verify;
        self
    }

    pub fn accelerator_timeout(mut self, timeout: Duration) -> Self {
        self.config.accelerator_timeout = timeout;
        self
    }

    pub fn build(self) -> LookaheadConfig {
        self.config
    }
}

/// Settings for the serialized forms of packing results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportConfig {
    visualiser_url: String,
}

impl ExportConfig {
    pub const DEFAULT_VISUALISER_URL: &'static str =
        "https://boxpacker.io/en/master/visualiser.html?packing=";

    const VISUALISER_URL_VAR: &'static str = "BOXPACK_VISUALISER_URL";

    pub fn new(visualiser_url: impl Into<String>) -> Self {
        Self {
            visualiser_url: visualiser_url.into(),
        }
    }

    fn from_env() -> Self {
        match env_string(Self::VISUALISER_URL_VAR) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                log::info!("Using visualiser at {}", url);
                Self::new(url)
            }
            Some(url) => {
                log::warn!(
                    "{} ('{}') is not an http(s) URL. Using {}.",
                    Self::VISUALISER_URL_VAR,
                    url,
                    Self::DEFAULT_VISUALISER_URL
                );
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Prefix the encoded packing is appended to.
    pub fn visualiser_url(&self) -> &str {
        &self.visualiser_url
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VISUALISER_URL)
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            log::warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            log::warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn load_bool(var_name: &str, default: bool) -> bool {
    env_string(var_name)
        .and_then(|raw| parse_bool(&raw, var_name))
        .unwrap_or(default)
}

fn load_u64_with_warning(
    var_name: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> u64 {
    match env_string(var_name) {
        Some(raw) => parse_u64(var_name, &raw, default, validator, invalid_hint, notice),
        None => default,
    }
}

fn parse_u64(
    var_name: &str,
    raw: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> u64 {
    match raw.parse::<u64>() {
        Ok(value) if !validator(value) => {
            log::warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name,
                raw,
                invalid_hint,
                default
            );
            default
        }
        Ok(value) => {
            if value != default {
                log::info!("{} ({} = {}).", notice, var_name, value);
            }
            value
        }
        Err(err) => {
            log::warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name,
                raw,
                err,
                default
            );
            default
        }
    }
}
