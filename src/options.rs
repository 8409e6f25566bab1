use std::time::Duration;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Default deadline for a whole call, in milliseconds. Applies when the
    /// caller does not pass a request context.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_retries: 0,
            retry_backoff_ms: 0,
        }
    }
}

impl ClientOptions {
    /// Reads overrides from the environment, keeping defaults for unset
    /// variables.
    ///
    /// Reads:
    /// - `RESTWIRE_TIMEOUT_MS`
    /// - `RESTWIRE_MAX_RETRIES`
    /// - `RESTWIRE_BACKOFF_MS`
    ///
    /// Returns an error if a variable is set but is not a non-negative integer.
    pub fn from_env() -> std::result::Result<Self, String> {
        let mut options = Self::default();
        if let Some(value) = read_env_number::<u64>("RESTWIRE_TIMEOUT_MS")? {
            options.timeout_ms = value;
        }
        if let Some(value) = read_env_number::<usize>("RESTWIRE_MAX_RETRIES")? {
            options.max_retries = value;
        }
        if let Some(value) = read_env_number::<u64>("RESTWIRE_BACKOFF_MS")? {
            options.retry_backoff_ms = value;
        }
        Ok(options)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before the retry that follows failed attempt `attempt`
    /// (0-indexed): `retry_backoff_ms * 2^attempt`.
    ///
    /// The exponent stops growing after attempt 16, so later retries all
    /// wait `retry_backoff_ms * 2^16`. The product saturates at `u64::MAX`
    /// milliseconds.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let exp = attempt.min(16) as u32;
        let multiplier = 1u64 << exp;
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(multiplier))
    }
}

fn read_env_number<T: std::str::FromStr>(name: &str) -> std::result::Result<Option<T>, String> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{name} must be a non-negative integer, got '{raw}'")),
        Err(_) => Ok(None),
    }
}
