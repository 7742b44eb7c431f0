//! Economy configuration.

use std::env;
use std::time::Duration;

use crate::{
    codes::MIN_CODE_LENGTH, db::timeouts::DEFAULT_TRANSACTION_TIMEOUT,
    redemption::BPS_DENOMINATOR,
};

/// Longest code string accepted
const MAX_CODE_LENGTH: usize = 64;

/// Tunables for the economy operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomyConfig {
    /// House buy-back rate in basis points of the case price
    pub sell_rate_bps: u32,

    /// Symbols per minted code
    pub code_length: usize,

    /// Extra attempts after a serialization failure or deadlock
    pub max_tx_retries: u32,

    /// Deadline for a single transaction attempt or read
    pub tx_timeout: Duration,
}

impl EconomyConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `SELL_RATE_BPS`: House buy-back rate (default: 5000, i.e. 50%)
    /// - `CODE_LENGTH`: Symbols per code (default: 12)
    /// - `TX_MAX_RETRIES`: Retries for transient aborts (default: 3)
    /// - `TX_TIMEOUT_SECS`: Per-attempt deadline (default: 10)
    ///
    /// Unparsable values fall back to the defaults; call
    /// [`EconomyConfig::validate`] to reject out-of-range ones.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sell_rate_bps: parse_env_or("SELL_RATE_BPS", defaults.sell_rate_bps),
            code_length: parse_env_or("CODE_LENGTH", defaults.code_length),
            max_tx_retries: parse_env_or("TX_MAX_RETRIES", defaults.max_tx_retries),
            tx_timeout: Duration::from_secs(parse_env_or(
                "TX_TIMEOUT_SECS",
                defaults.tx_timeout.as_secs(),
            )),
        }
    }

    /// Check ranges
    ///
    /// # Returns
    ///
    /// * `Result<(), String>` - Description of the first invalid field
    pub fn validate(&self) -> Result<(), String> {
        if self.sell_rate_bps == 0 || self.sell_rate_bps >= BPS_DENOMINATOR {
            return Err(format!(
                "SELL_RATE_BPS must be between 1 and {} (got {})",
                BPS_DENOMINATOR - 1,
                self.sell_rate_bps
            ));
        }

        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.code_length) {
            return Err(format!(
                "CODE_LENGTH must be between {MIN_CODE_LENGTH} and {MAX_CODE_LENGTH} (got {})",
                self.code_length
            ));
        }

        if self.tx_timeout.is_zero() {
            return Err("TX_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            sell_rate_bps: 5_000,
            code_length: MIN_CODE_LENGTH,
            max_tx_retries: 3,
            tx_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}

/// Helper to parse environment variable with default fallback
pub(crate) fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
