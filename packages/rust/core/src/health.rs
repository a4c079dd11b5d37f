//! Container health checking: probe policy, state machine and HTTP probe.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use mocktailverse_shared::{MocktailverseError, Result};

/// Path the web process serves its health endpoint on.
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    /// Consecutive failures before the container is unhealthy.
    pub retries: u32,
    /// Grace period after start during which failures are ignored.
    pub start_period: Duration,
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            retries: 3,
            start_period: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Starting,
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }
}

/// Tracks probe outcomes under a [`HealthCheckPolicy`].
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    policy: HealthCheckPolicy,
    state: HealthState,
    consecutive_failures: u32,
}

impl HealthMonitor {
    pub fn new(policy: HealthCheckPolicy) -> Self {
        Self {
            policy,
            state: HealthState::Starting,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn policy(&self) -> &HealthCheckPolicy {
        &self.policy
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record one probe outcome, `since_start` after the process started.
    pub fn record(&mut self, success: bool, since_start: Duration) -> HealthState {
        if success {
            self.consecutive_failures = 0;
            self.state = HealthState::Healthy;
            return self.state;
        }

        if since_start < self.policy.start_period {
            debug!(?since_start, "probe failed inside start period, not counted");
            return self.state;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= self.policy.retries {
            self.state = HealthState::Unhealthy;
        }
        self.state
    }
}

/// Probe a health endpoint once. Any non-2xx status or transport error fails.
pub async fn probe(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<()> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| MocktailverseError::Network(format!("{url}: {e}")))?;

    if !response.status().is_success() {
        return Err(MocktailverseError::Network(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }
    Ok(())
}
