//! Daemon startup: wait for a freshly started daemon to answer its readiness
//! probe.
//!
//! `Starting -> Polling { attempt } -> Ready`, with `Polling` looping on every
//! failed probe. A bounded [`StartupPolicy`] adds a `Failed` exit.

use std::future::Future;
use std::time::Duration;

use hostbridge_common::BridgeError;
use hostbridge_config::schema::StartupConfig;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Where a daemon startup currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    /// No startup has been requested yet.
    Idle,
    /// `start_daemon` has been sent; waiting for the host to acknowledge it.
    Starting,
    /// Probing readiness. `attempt` counts from 1.
    Polling { attempt: u32 },
    Ready,
    Failed,
}

impl StartupState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// How long to keep probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupPolicy {
    pub poll_interval: Duration,
    /// `None` keeps probing forever.
    pub max_attempts: Option<u32>,
    /// Overall deadline measured from the first probe. `None` for no deadline.
    pub timeout: Option<Duration>,
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            max_attempts: None,
            timeout: None,
        }
    }
}

impl StartupPolicy {
    pub fn from_config(config: &StartupConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts(),
            timeout: config.timeout(),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some() || self.timeout.is_some()
    }
}

/// Drives the startup state and publishes every transition on a watch
/// channel.
#[derive(Debug)]
pub struct DaemonStartup {
    policy: StartupPolicy,
    state: watch::Sender<StartupState>,
}

impl DaemonStartup {
    pub fn new(policy: StartupPolicy) -> Self {
        let (state, _) = watch::channel(StartupState::Idle);
        Self { policy, state }
    }

    pub fn policy(&self) -> &StartupPolicy {
        &self.policy
    }

    pub fn state(&self) -> StartupState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<StartupState> {
        self.state.subscribe()
    }

    /// Enter `Starting`. Called right before the start command goes out.
    pub fn begin(&self) {
        self.transition(StartupState::Starting);
    }

    /// Mark the startup failed without polling (the start command itself was
    /// rejected).
    pub fn abort(&self) {
        self.transition(StartupState::Failed);
    }

    /// Poll `probe` until a call resolves.
    ///
    /// Any answer means the daemon is reachable, whatever it says; only an
    /// error counts as "not ready yet". Returns the number of probes it took.
    pub async fn run<F, Fut, T>(&self, mut probe: F) -> Result<u32, BridgeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
    {
        let deadline = self.policy.timeout.map(|t| Instant::now() + t);
        let mut attempt: u32 = 0;
        let mut last_error: Option<String> = None;

        loop {
            attempt = attempt.saturating_add(1);
            self.transition(StartupState::Polling { attempt });

            let outcome = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, probe())
                    .await
                    .unwrap_or_else(|_| {
                        Err(BridgeError::Unreachable("readiness probe timed out".into()))
                    }),
                None => probe().await,
            };

            match outcome {
                Ok(_) => {
                    self.transition(StartupState::Ready);
                    info!(attempts = attempt, "daemon is ready");
                    return Ok(attempt);
                }
                Err(BridgeError::Disconnected) => {
                    self.transition(StartupState::Failed);
                    warn!(attempts = attempt, "host channel closed during daemon startup");
                    return Err(BridgeError::Disconnected);
                }
                Err(e) => {
                    let e = match e {
                        BridgeError::Unreachable(_) => e,
                        other => BridgeError::Unreachable(other.display_message()),
                    };
                    debug!(attempt, error = %e, "readiness probe failed");
                    last_error = Some(e.to_string());
                }
            }

            let attempts_exhausted = self.policy.max_attempts.is_some_and(|max| attempt >= max);
            let past_deadline = deadline.is_some_and(|d| Instant::now() + self.policy.poll_interval > d);
            if attempts_exhausted || past_deadline {
                self.transition(StartupState::Failed);
                warn!(attempts = attempt, "daemon startup gave up");
                return Err(BridgeError::StartupTimedOut {
                    attempts: attempt,
                    last_error,
                });
            }

            tokio::time::sleep(self.policy.poll_interval).await;
        }
    }

    fn transition(&self, next: StartupState) {
        self.state.send_replace(next);
    }
}
