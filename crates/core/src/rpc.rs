//! Wire adapters for a running localnet: a JSON-RPC chain client and an
//! HTTP faucet client.

use crate::client::{ChainClient, ExecuteOptions, FaucetClient, FaucetGrant, SignedTransaction};
use crate::error::FaucetError;
use crate::types::{Address, ChainObject, ExecutionResult, SystemState};
use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::Deserialize;
use tracing::debug;

/// JSON-RPC implementation of [`ChainClient`] against a node endpoint.
pub struct RpcClient {
    inner: HttpClient,
    url: String,
}

impl RpcClient {
    pub fn new(url: &str) -> crate::Result<Self> {
        let inner = HttpClientBuilder::default().build(url)?;
        Ok(Self {
            inner,
            url: url.to_owned(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    total_balance: u64,
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn execute_transaction_block(
        &self,
        tx: &SignedTransaction,
        opts: &ExecuteOptions,
    ) -> crate::Result<ExecutionResult> {
        debug!(sender = %tx.sender, commands = tx.tx.commands().len(), "submitting transaction block");
        let result = self
            .inner
            .request("sui_executeTransactionBlock", rpc_params![tx, opts])
            .await?;
        Ok(result)
    }

    async fn get_owned_objects(&self, owner: Address) -> crate::Result<Vec<ChainObject>> {
        let objects = self
            .inner
            .request("suix_getOwnedObjects", rpc_params![owner])
            .await?;
        Ok(objects)
    }

    async fn get_coins(&self, owner: Address, coin_type: &str) -> crate::Result<Vec<ChainObject>> {
        let coins = self
            .inner
            .request("suix_getCoins", rpc_params![owner, coin_type])
            .await?;
        Ok(coins)
    }

    async fn get_balance(&self, owner: Address) -> crate::Result<u64> {
        let response: BalanceResponse = self
            .inner
            .request("suix_getBalance", rpc_params![owner])
            .await?;
        Ok(response.total_balance)
    }

    async fn get_system_state(&self) -> crate::Result<SystemState> {
        let state = self
            .inner
            .request("suix_getLatestSuiSystemState", rpc_params![])
            .await?;
        Ok(state)
    }
}

/// HTTP implementation of [`FaucetClient`].
///
/// Transport failures and non-success statuses map to `Transient`, except
/// 429 which is the rate-limit signal, and a body that fails to parse as a
/// grant, which is `SchemaInvalid`.
pub struct HttpFaucet {
    url: String,
    http: reqwest::Client,
}

impl HttpFaucet {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FaucetClient for HttpFaucet {
    async fn request_funds(&self, recipient: Address) -> Result<FaucetGrant, FaucetError> {
        let response = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({
                "FixedAmountRequest": { "recipient": recipient }
            }))
            .send()
            .await
            .map_err(|e| FaucetError::Transient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FaucetError::RateLimited);
        }
        if !status.is_success() {
            return Err(FaucetError::Transient(format!(
                "faucet returned status {status}"
            )));
        }
        response
            .json::<FaucetGrant>()
            .await
            .map_err(|e| FaucetError::SchemaInvalid(e.to_string()))
    }
}
