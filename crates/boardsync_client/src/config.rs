//! Configuration for the client layer.

use rand::Rng;
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Length of one backoff unit.
    pub unit: Duration,
    /// Exponential base.
    pub base: f64,
    /// Upper bound on any single wait.
    pub cap: Duration,
    /// Maximum additive jitter, as a fraction of the computed delay.
    pub jitter: f64,
}

impl RetryConfig {
    /// Creates a retry configuration with the given attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            unit: Duration::from_secs(1),
            base: 2.0,
            cap: Duration::from_secs(60),
            jitter: 0.25,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self::new(1).with_jitter(0.0)
    }

    /// Sets the backoff unit.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Sets the exponential base.
    pub fn with_base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }

    /// Sets the wait cap.
    pub fn with_cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    /// Sets the jitter fraction. Zero disables jitter.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    /// Returns the wait before attempt `attempt` (0-indexed), without jitter.
    ///
    /// The first attempt never waits; attempt `i` waits `unit * base^i`,
    /// capped.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.unit.as_secs_f64() * self.base.powi(exponent);
        let capped = secs.min(self.cap.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.cap
        }
    }

    /// Returns the wait before attempt `attempt`, with jitter.
    ///
    /// Jitter only lengthens the wait, and never past the cap unless the
    /// base delay already sits at the cap.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        if delay.is_zero() || self.jitter <= 0.0 {
            return delay;
        }
        let extra = delay.mul_f64(self.jitter * rand::thread_rng().gen::<f64>());
        (delay + extra).min(self.cap.max(delay))
    }

    /// Total un-jittered wait across every retry of a failing request.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|i| self.base_delay(i)).sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Configuration shared by every request a client sends.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Retry policy for reads (listing, queries).
    pub read_retry: RetryConfig,
    /// Retry policy for writes (create, update).
    pub write_retry: RetryConfig,
    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,
    /// Per-attempt total timeout.
    pub total_timeout: Duration,
}

impl ClientConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            read_retry: RetryConfig::new(5),
            write_retry: RetryConfig::new(3),
            connect_timeout: Duration::from_secs(30),
            total_timeout: Duration::from_secs(60),
        }
    }

    /// Sets the read retry policy.
    pub fn with_read_retry(mut self, retry: RetryConfig) -> Self {
        self.read_retry = retry;
        self
    }

    /// Sets the write retry policy.
    pub fn with_write_retry(mut self, retry: RetryConfig) -> Self {
        self.write_retry = retry;
        self
    }

    /// Sets the per-attempt timeouts. The connect timeout is clamped to the
    /// total timeout.
    pub fn with_timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.connect_timeout = connect.min(total);
        self.total_timeout = total;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// An API credential.
///
/// The secret is zeroized when dropped and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiToken {
    secret: String,
}

impl ApiToken {
    /// Wraps a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Returns the secret.
    ///
    /// Only for building request headers; don't log the result.
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// Returns true if the secret is blank.
    pub fn is_empty(&self) -> bool {
        self.secret.trim().is_empty()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
