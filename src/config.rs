use std::time::Duration;

/// Default attempt ceiling for the failed-order reconciliation loop.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
/// Default wait before each reconciliation attempt.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL that relative resource ids such as `/psp/creditcard/payments/{id}` are joined to.
    pub base_url: String,
    pub access_token: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Bounds of the failed-order polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub max_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
