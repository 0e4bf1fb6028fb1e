//! Contract negotiation polling.
//!
//! EDC advances a negotiation asynchronously; the controller only observes it
//! by reading its state until it settles. A negotiation is settled when
//!
//! - it is `CONFIRMED` and carries a contract agreement id (success), or
//! - it is `DECLINED`, `ERROR` or `TERMINATED` (failure).
//!
//! Any other state, including `CONFIRMED` without an agreement id, is still
//! pending and is polled again after a constant interval. Polling also stops
//! when the attempt cap or deadline of [`NegotiationPollingConfig`] is hit, or
//! when the caller cancels.

use super::api::ManagementApi;
use super::models::NegotiationStatus;
use crate::config::NegotiationPollingConfig;
use crate::traits::{ConnectorError, ConnectorResult};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// State of a negotiation as reported by the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationState {
    Confirmed,
    Declined,
    Error,
    Terminated,
    /// Any non-terminal state, e.g. `REQUESTED` or `CONSUMER_APPROVED`.
    Pending(String),
}

impl NegotiationState {
    pub fn parse(state: &str) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "CONFIRMED" => Self::Confirmed,
            "DECLINED" => Self::Declined,
            "ERROR" => Self::Error,
            "TERMINATED" => Self::Terminated,
            _ => Self::Pending(state.to_string()),
        }
    }

    /// True for states the negotiation can never leave with an agreement.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Declined | Self::Error | Self::Terminated)
    }
}

/// What one status report means for the polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Agreed(String),
    Failed {
        state: String,
        detail: Option<String>,
    },
    Pending(String),
}

impl PollOutcome {
    pub fn from_status(status: &NegotiationStatus) -> Self {
        let state = NegotiationState::parse(&status.state);
        match (&state, status.contract_agreement_id.as_deref()) {
            (NegotiationState::Confirmed, Some(agreement_id)) if !agreement_id.is_empty() => {
                Self::Agreed(agreement_id.to_string())
            }
            (s, _) if s.is_terminal_failure() => Self::Failed {
                state: status.state.clone(),
                detail: status.error_detail.clone(),
            },
            _ => Self::Pending(status.state.clone()),
        }
    }
}

/// Polls negotiation `negotiation_id` until it settles, returning the
/// contract agreement id.
pub async fn await_agreement(
    api: &dyn ManagementApi,
    negotiation_id: &str,
    config: &NegotiationPollingConfig,
    cancel: &CancellationToken,
) -> ConnectorResult<String> {
    let interval = config.interval();
    let deadline = config.deadline().map(|limit| Instant::now() + limit);
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(negotiation_id)),
            _ = wait_until(deadline) => return Err(timed_out(negotiation_id, config)),
            status = api.get_negotiation(negotiation_id) => status?,
        };

        match PollOutcome::from_status(&status) {
            PollOutcome::Agreed(agreement_id) => {
                info!(
                    negotiation_id,
                    agreement_id = %agreement_id,
                    attempts,
                    "contract negotiation confirmed"
                );
                return Ok(agreement_id);
            }
            PollOutcome::Failed { state, detail } => {
                warn!(negotiation_id, %state, ?detail, "contract negotiation failed");
                return Err(ConnectorError::NegotiationTerminated {
                    negotiation_id: negotiation_id.to_string(),
                    state,
                    detail,
                });
            }
            PollOutcome::Pending(state) => {
                debug!(negotiation_id, %state, attempts, "contract negotiation pending");
            }
        }

        if config.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(ConnectorError::NegotiationNeverConfirmed {
                negotiation_id: negotiation_id.to_string(),
                attempts,
            });
        }
        // The next poll would start at or past the deadline.
        if deadline.is_some_and(|at| Instant::now() + interval >= at) {
            return Err(timed_out(negotiation_id, config));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(negotiation_id)),
            _ = sleep(interval) => {}
        }
    }
}

/// Resolves at `deadline`, or never if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn timed_out(negotiation_id: &str, config: &NegotiationPollingConfig) -> ConnectorError {
    ConnectorError::Timeout(format!(
        "negotiation {} not confirmed within {}s",
        negotiation_id,
        config.timeout_secs.unwrap_or_default()
    ))
}

fn cancelled(negotiation_id: &str) -> ConnectorError {
    ConnectorError::Cancelled(format!(
        "polling of negotiation {} cancelled",
        negotiation_id
    ))
}
