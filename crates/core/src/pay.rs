//! Payment executor: single- and multi-recipient native-coin transfers.

use crate::account;
use crate::client::ExecuteOptions;
use crate::context::TestContext;
use crate::error::Error;
use crate::types::{Address, Argument, ExecutionResult, ObjectId, TransactionBlock};
use tracing::debug;

/// Inputs for one payment transaction. Every field has a default: one
/// freshly generated recipient, the configured send amount, and the first
/// native coin owned by the sender (queried live at submission time).
#[derive(Debug, Clone)]
pub struct PayParams {
    pub num_recipients: usize,
    pub recipients: Option<Vec<Address>>,
    pub amounts: Option<Vec<u64>>,
    pub coin: Option<ObjectId>,
}

impl Default for PayParams {
    fn default() -> Self {
        Self {
            num_recipients: 1,
            recipients: None,
            amounts: None,
            coin: None,
        }
    }
}

/// Pays native currency to one or more recipients in a single atomic
/// block: per recipient, the amount is split off the source coin and the
/// split transferred. Mismatched recipient/amount lengths fail before any
/// network call is made; a non-success execution status is fatal and is
/// not resubmitted (the inputs would be stale).
pub async fn pay_sui(ctx: &TestContext, params: PayParams) -> crate::Result<ExecutionResult> {
    let recipients = params
        .recipients
        .unwrap_or_else(|| account::generate_addresses(params.num_recipients));
    let amounts = params
        .amounts
        .unwrap_or_else(|| vec![ctx.config().send_amount; recipients.len()]);
    if recipients.len() != amounts.len() {
        return Err(Error::RecipientAmountMismatch {
            recipients: recipients.len(),
            amounts: amounts.len(),
        });
    }

    let coin = match params.coin {
        Some(coin) => coin,
        None => ctx.first_sui_coin().await?.id,
    };

    let mut tx = TransactionBlock::new(ctx.address());
    tx.set_gas_budget(ctx.config().gas_budget);
    for (recipient, amount) in recipients.iter().zip(&amounts) {
        let split = tx.split_coins(Argument::Object(coin), vec![*amount]);
        tx.transfer_objects(vec![split], *recipient);
    }

    let result = ctx.signer().execute(tx, ExecuteOptions::default()).await?;
    result.ensure_success()?;
    Ok(result)
}

/// Runs [`pay_sui`] exactly `n` times, strictly sequentially: transaction
/// `i + 1` is not submitted until transaction `i`'s result is known.
/// Coin selection re-queries ownership each round, so it depends on the
/// post-state of the previous call; concurrent submission would race on
/// the shared coin and is disallowed. Results come back in submission
/// order.
pub async fn pay_n_times(
    ctx: &TestContext,
    n: usize,
    params: PayParams,
) -> crate::Result<Vec<ExecutionResult>> {
    // an explicit coin would be reused across rounds and double-spent;
    // selection must re-run against live state every time
    let params = PayParams {
        coin: None,
        ..params
    };
    let mut results = Vec::with_capacity(n);
    for round in 0..n {
        debug!(round, total = n, "submitting payment");
        let result = pay_sui(ctx, params.clone()).await?;
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::mock::{MockChain, MockFaucet};
    use crate::types::ObjectChange;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn funded_context(chain: Arc<MockChain>, amount: u64) -> TestContext {
        let faucet = Arc::new(MockFaucet::granting(chain.clone(), amount));
        TestContext::create(HarnessConfig::default(), chain, faucet)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn pays_three_recipients_in_one_transaction() {
        let chain = Arc::new(MockChain::new());
        let ctx = funded_context(chain.clone(), 1_000_000).await;
        let send_amount = ctx.config().send_amount;

        let result = pay_sui(
            &ctx,
            PayParams {
                num_recipients: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let destinations: HashSet<Address> = result
            .transfer_changes()
            .filter_map(|change| match change {
                ObjectChange::Transferred {
                    recipient, amount, ..
                } => {
                    assert_eq!(*amount, Some(send_amount));
                    Some(*recipient)
                }
                _ => None,
            })
            .collect();
        assert_eq!(destinations.len(), 3);
        assert_eq!(chain.execute_calls(), 1);
    }

    #[tokio::test]
    async fn explicit_recipients_receive_explicit_amounts() {
        let chain = Arc::new(MockChain::new());
        let ctx = funded_context(chain.clone(), 1_000_000).await;
        let recipients = account::generate_addresses(2);

        let result = pay_sui(
            &ctx,
            PayParams {
                recipients: Some(recipients.clone()),
                amounts: Some(vec![111, 222]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        for (recipient, expected) in recipients.iter().zip([111u64, 222]) {
            assert_eq!(chain.balance_of(*recipient), expected);
        }
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn length_mismatch_fails_before_any_network_call() {
        let chain = Arc::new(MockChain::new());
        let ctx = funded_context(chain.clone(), 1_000_000).await;
        let calls_before = chain.query_calls();

        let err = pay_sui(
            &ctx,
            PayParams {
                recipients: Some(account::generate_addresses(2)),
                amounts: Some(vec![1, 2, 3]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            Error::RecipientAmountMismatch {
                recipients: 2,
                amounts: 3
            }
        ));
        assert_eq!(chain.execute_calls(), 0);
        assert_eq!(chain.query_calls(), calls_before);
    }

    #[tokio::test]
    async fn pay_without_coins_reports_coin_not_found() {
        let chain = Arc::new(MockChain::new());
        let ctx = funded_context(chain.clone(), 1_000).await;
        chain.drain_coins(ctx.address());

        let err = pay_sui(&ctx, PayParams::default()).await.unwrap_err();
        assert!(matches!(err, Error::CoinNotFound(addr) if addr == ctx.address()));
    }

    #[tokio::test]
    async fn pay_n_times_is_sequential_and_never_double_spends() {
        let chain = Arc::new(MockChain::new());
        let ctx = funded_context(chain.clone(), 1_000_000).await;

        // drain the first coin after one round so the default coin
        // selection has to move to post-state for rounds two and three
        chain.mint_coin(ctx.address(), ctx.config().send_amount);
        chain.mint_coin(ctx.address(), ctx.config().send_amount);

        let results = pay_n_times(&ctx, 3, PayParams::default()).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(ExecutionResult::is_success));
        assert_eq!(chain.execute_calls(), 3);

        let digests: HashSet<&str> = results.iter().map(|r| r.digest.as_str()).collect();
        assert_eq!(digests.len(), 3, "results must be distinct transactions");
    }

    #[tokio::test]
    async fn insufficient_balance_is_an_execution_failure() {
        let chain = Arc::new(MockChain::new());
        let ctx = funded_context(chain.clone(), 10).await;

        let err = pay_sui(
            &ctx,
            PayParams {
                amounts: Some(vec![10_000]),
                recipients: Some(account::generate_addresses(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ExecutionFailed { .. }));
    }
}
