//! Timing configuration for the synchronization engine.
//!
//! Every delay the engine waits on lives here so embedding applications and
//! tests can shorten or zero them.
//!
//! # Environment Variables
//!
//! - `TASKLANE_DEPARTURE_DELAY_MS` (default 800)
//! - `TASKLANE_FLUSH_ANIMATION_MS` (default 300)
//! - `TASKLANE_MARKER_CLEAR_BUFFER_MS` (default 100)
//! - `TASKLANE_RECONNECT_DELAY_MS` (default 1000)
//! - `TASKLANE_RECONNECT_MAX_DELAY_MS` (default 30000)

use std::time::Duration;

use thiserror::Error;

/// Prefix shared by every environment variable read by [`SyncConfig::from_env`].
pub const ENV_PREFIX: &str = "TASKLANE";

// =============================================================================
// SyncConfig
// =============================================================================

/// Delays used by mutations, the invalidation gate and the push consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Wait between a terminal mutation settling and its invalidation, so the
    /// departure animation can finish.
    pub departure_delay_ms: u64,
    /// Departure window used when closing a detail panel flushes deferred
    /// invalidations.
    pub flush_animation_ms: u64,
    /// Wait between starting an invalidation and clearing a departing marker.
    pub marker_clear_buffer_ms: u64,
    /// First push-channel reconnect delay.
    pub reconnect_delay_ms: u64,
    /// Upper bound for the exponential reconnect backoff.
    pub reconnect_max_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            departure_delay_ms: 800,
            flush_animation_ms: 300,
            marker_clear_buffer_ms: 100,
            reconnect_delay_ms: 1000,
            reconnect_max_delay_ms: 30_000,
        }
    }
}

impl SyncConfig {
    /// Creates a configuration from `TASKLANE_*` environment variables.
    ///
    /// Missing variables use the default values.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to something other than an
    /// unsigned integer, or if the resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            departure_delay_ms: parse_env_u64(
                &format!("{ENV_PREFIX}_DEPARTURE_DELAY_MS"),
                defaults.departure_delay_ms,
            )?,
            flush_animation_ms: parse_env_u64(
                &format!("{ENV_PREFIX}_FLUSH_ANIMATION_MS"),
                defaults.flush_animation_ms,
            )?,
            marker_clear_buffer_ms: parse_env_u64(
                &format!("{ENV_PREFIX}_MARKER_CLEAR_BUFFER_MS"),
                defaults.marker_clear_buffer_ms,
            )?,
            reconnect_delay_ms: parse_env_u64(
                &format!("{ENV_PREFIX}_RECONNECT_DELAY_MS"),
                defaults.reconnect_delay_ms,
            )?,
            reconnect_max_delay_ms: parse_env_u64(
                &format!("{ENV_PREFIX}_RECONNECT_MAX_DELAY_MS"),
                defaults.reconnect_max_delay_ms,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// A configuration with every delay set to zero.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            departure_delay_ms: 0,
            flush_animation_ms: 0,
            marker_clear_buffer_ms: 0,
            reconnect_delay_ms: 0,
            reconnect_max_delay_ms: 0,
        }
    }

    /// Returns a configuration with the given departure delay.
    #[must_use]
    pub const fn with_departure_delay_ms(self, departure_delay_ms: u64) -> Self {
        Self {
            departure_delay_ms,
            ..self
        }
    }

    /// Returns a configuration with the given reconnect backoff bounds.
    #[must_use]
    pub const fn with_reconnect_delays_ms(self, initial: u64, max: u64) -> Self {
        Self {
            reconnect_delay_ms: initial,
            reconnect_max_delay_ms: max,
            ..self
        }
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if the reconnect maximum is below the initial delay.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.reconnect_max_delay_ms < self.reconnect_delay_ms {
            return Err(ConfigError::InvalidReconnectRange {
                initial: self.reconnect_delay_ms,
                max: self.reconnect_max_delay_ms,
            });
        }
        Ok(())
    }

    /// [`Self::departure_delay_ms`] as a [`Duration`].
    #[must_use]
    pub const fn departure_delay(&self) -> Duration {
        Duration::from_millis(self.departure_delay_ms)
    }

    /// [`Self::flush_animation_ms`] as a [`Duration`].
    #[must_use]
    pub const fn flush_animation(&self) -> Duration {
        Duration::from_millis(self.flush_animation_ms)
    }

    /// [`Self::marker_clear_buffer_ms`] as a [`Duration`].
    #[must_use]
    pub const fn marker_clear_buffer(&self) -> Duration {
        Duration::from_millis(self.marker_clear_buffer_ms)
    }

    /// Reconnect delay after `attempt` consecutive failures, doubling from
    /// [`Self::reconnect_delay_ms`] up to [`Self::reconnect_max_delay_ms`].
    #[must_use]
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 1_u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let delay = self
            .reconnect_delay_ms
            .saturating_mul(factor)
            .min(self.reconnect_max_delay_ms);
        Duration::from_millis(delay)
    }
}

// =============================================================================
// Environment Variable Parsing
// =============================================================================

/// Error type for environment variable parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvParseError {
    /// Invalid u64 value.
    #[error("Invalid u64 value for {name}: {message} (got '{value}')")]
    InvalidU64 {
        /// Variable name.
        name: String,
        /// Error message.
        message: String,
        /// Actual value.
        value: String,
    },
}

/// Parses a u64 from an environment variable.
///
/// Returns the default value if the variable is not set.
fn parse_env_u64(name: &str, default: u64) -> Result<u64, EnvParseError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|error: std::num::ParseIntError| EnvParseError::InvalidU64 {
                name: name.to_string(),
                message: error.to_string(),
                value,
            }),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(error) => Err(EnvParseError::InvalidU64 {
            name: name.to_string(),
            message: error.to_string(),
            value: String::new(),
        }),
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment parsing error.
    #[error("Environment parsing error: {0}")]
    EnvParseError(#[from] EnvParseError),

    /// Reconnect backoff bounds are inverted.
    #[error("Invalid reconnect range: initial ({initial}) > max ({max})")]
    InvalidReconnectRange {
        /// Initial delay.
        initial: u64,
        /// Maximum delay.
        max: u64,
    },
}
