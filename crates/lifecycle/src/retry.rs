//! Bounded, strictly sequential connection establishment.

use std::{sync::Arc, time::Duration};

use {
    botdeck_channels::{ConnectOptions, EstablishError, GatewayConnection, GatewayConnector},
    botdeck_config::LifecycleConfig,
    secrecy::Secret,
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use botdeck_metrics::{bot as bot_metrics, counter, labels};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    pub timeout: Duration,
    pub label: String,
}

/// Ordered attempts tried until one connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPlan {
    attempts: Vec<RetryAttempt>,
}

impl RetryPlan {
    #[must_use]
    pub fn new(attempts: Vec<RetryAttempt>) -> Self {
        Self { attempts }
    }

    #[must_use]
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new(
            config
                .retry_plan
                .iter()
                .map(|a| RetryAttempt {
                    timeout: a.timeout(),
                    label: a.label.clone(),
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn attempts(&self) -> &[RetryAttempt] {
        &self.attempts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

impl Default for RetryPlan {
    fn default() -> Self {
        Self::from_config(&LifecycleConfig::default())
    }
}

/// Why one attempt failed.
enum AttemptFailure {
    Timeout(Error),
    Establish(EstablishError),
}

/// Run `plan` against `connector`, creating a fresh candidate per attempt.
///
/// Returns the first candidate that connected. Failed and timed-out
/// candidates are disconnected before the next attempt starts. Every step is
/// appended to `logs`.
pub(crate) async fn establish(
    connector: &dyn GatewayConnector,
    options: &ConnectOptions,
    token: &Secret<String>,
    plan: &RetryPlan,
    logs: &mut Vec<String>,
) -> Result<Arc<dyn GatewayConnection>, Error> {
    let total = plan.len();
    let mut last: Option<AttemptFailure> = None;

    for (index, attempt) in plan.attempts().iter().enumerate() {
        let number = index + 1;
        info!(attempt = number, total, label = %attempt.label, timeout_ms = attempt.timeout.as_millis(), "connection attempt");
        logs.push(format!(
            "Attempt {number}/{total} ({}): connecting with {}s timeout",
            attempt.label,
            attempt.timeout.as_secs_f32()
        ));

        let candidate = connector.create(options);
        let outcome = match tokio::time::timeout(attempt.timeout, candidate.connect(token)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(AttemptFailure::Establish(err)),
            Err(_) => Err(AttemptFailure::Timeout(Error::AttemptTimeout {
                label: attempt.label.clone(),
                timeout: attempt.timeout,
            })),
        };

        #[cfg(feature = "metrics")]
        counter!(
            bot_metrics::CONNECT_ATTEMPTS_TOTAL,
            labels::ATTEMPT => attempt.label.clone(),
            labels::OUTCOME => if outcome.is_ok() { "success" } else { "failure" },
        )
        .increment(1);

        match outcome {
            Ok(()) => {
                logs.push(format!("Attempt {number}/{total} ({}) succeeded", attempt.label));
                return Ok(candidate);
            },
            Err(failure) => {
                candidate.disconnect().await;
                let cause = match &failure {
                    AttemptFailure::Timeout(err) => err.to_string(),
                    AttemptFailure::Establish(err) => err.to_string(),
                };
                warn!(attempt = number, label = %attempt.label, error = %cause, "connection attempt failed");
                logs.push(format!("Attempt {number}/{total} ({}) failed: {cause}", attempt.label));
                last = Some(failure);
            },
        }
    }

    Err(match last {
        Some(AttemptFailure::Establish(err)) => Error::from_establish(err, total),
        Some(AttemptFailure::Timeout(err)) => Error::AttemptsExhausted {
            attempts: total,
            last_cause: err.to_string(),
        },
        None => Error::AttemptsExhausted {
            attempts: 0,
            last_cause: "retry plan is empty".into(),
        },
    })
}
