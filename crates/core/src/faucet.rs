//! Faucet funding with bounded-time retry.

use crate::client::{FaucetClient, FaucetGrant};
use crate::error::FaucetError;
use crate::retry::{retry_until_deadline, RetryError, RetryPolicy};
use crate::types::Address;
use std::sync::Arc;
use tracing::info;

/// Requests funds for an address with the configured retry policy.
///
/// Transient failures are retried with exponential backoff until the
/// policy deadline. A rate limit ends the loop immediately and surfaces to
/// the caller, which may treat it as a skip rather than a failure. A
/// response that does not match the expected shape is fatal and is never
/// retried, even when time remains on the deadline.
pub struct FaucetFunder {
    client: Arc<dyn FaucetClient>,
    policy: RetryPolicy,
}

impl FaucetFunder {
    pub fn new(client: Arc<dyn FaucetClient>) -> Self {
        Self {
            client,
            policy: RetryPolicy::faucet_default(),
        }
    }

    pub fn with_policy(client: Arc<dyn FaucetClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn request_funds(&self, recipient: Address) -> Result<FaucetGrant, FaucetError> {
        let grant = retry_until_deadline(&self.policy, FaucetError::is_terminal, || {
            self.client.request_funds(recipient)
        })
        .await
        .map_err(|err| match err {
            RetryError::Terminal(inner) => inner,
            RetryError::DeadlineExceeded { last, attempts } => FaucetError::Transient(format!(
                "funding deadline exceeded after {attempts} attempts: {last}"
            )),
        })?;

        // shape validation on the successful response; a mismatch is fatal
        if grant.recipient != recipient {
            return Err(FaucetError::SchemaInvalid(format!(
                "grant names recipient {}, requested {recipient}",
                grant.recipient
            )));
        }
        if grant.amount == 0 {
            return Err(FaucetError::SchemaInvalid(
                "grant reports a zero amount".to_owned(),
            ));
        }
        info!(%recipient, amount = grant.amount, "faucet funded address");
        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FaucetOutcome, MockFaucet};

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_then_succeeds() {
        let faucet = Arc::new(MockFaucet::scripted(vec![
            FaucetOutcome::Transient("connection refused".into()),
            FaucetOutcome::Transient("connection refused".into()),
            FaucetOutcome::Grant(10_000),
        ]));
        let funder = FaucetFunder::new(faucet.clone());
        let recipient = crate::account::generate_addresses(1)[0];

        let grant = funder.request_funds(recipient).await.unwrap();
        assert_eq!(grant.recipient, recipient);
        assert_eq!(grant.amount, 10_000);
        assert_eq!(faucet.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_stops_the_loop_at_once() {
        let faucet = Arc::new(MockFaucet::always_rate_limited());
        let funder = FaucetFunder::new(faucet.clone());
        let recipient = crate::account::generate_addresses(1)[0];

        let err = funder.request_funds(recipient).await.unwrap_err();
        assert!(matches!(err, FaucetError::RateLimited));
        // must not keep retrying toward the 60s deadline
        assert_eq!(faucet.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_grant_recipient_is_fatal() {
        let other = crate::account::generate_addresses(1)[0];
        let faucet = Arc::new(MockFaucet::scripted(vec![FaucetOutcome::MisdirectedGrant(
            other,
        )]));
        let funder = FaucetFunder::new(faucet);
        let recipient = crate::account::generate_addresses(1)[0];

        let err = funder.request_funds(recipient).await.unwrap_err();
        assert!(matches!(err, FaucetError::SchemaInvalid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_amount_grant_is_fatal() {
        let faucet = Arc::new(MockFaucet::scripted(vec![FaucetOutcome::Grant(0)]));
        let funder = FaucetFunder::new(faucet);
        let recipient = crate::account::generate_addresses(1)[0];

        let err = funder.request_funds(recipient).await.unwrap_err();
        assert!(matches!(err, FaucetError::SchemaInvalid(_)));
    }
}
