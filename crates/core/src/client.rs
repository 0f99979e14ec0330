use crate::error::FaucetError;
use crate::types::{Address, ChainObject, ExecutionResult, SystemState, TransactionBlock};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the funding endpoint reports back on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetGrant {
    pub recipient: Address,
    pub amount: u64,
}

/// Seam to the test-network faucet. Implementations map their transport's
/// failure modes onto [`FaucetError`]; the retry policy lives with the
/// caller, not here.
#[async_trait]
pub trait FaucetClient: Send + Sync {
    async fn request_funds(&self, recipient: Address) -> Result<FaucetGrant, FaucetError>;
}

/// A transaction block sealed for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub sender: Address,
    pub tx: TransactionBlock,
    /// base64-encoded ed25519 public key of the sender
    pub public_key: String,
    /// base64-encoded ed25519 signature over the serialized block
    pub signature: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOptions {
    pub show_effects: bool,
    pub show_object_changes: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            show_effects: true,
            show_object_changes: true,
        }
    }
}

/// Seam to the chain node. The node itself (consensus, networking,
/// execution) is an external collaborator; the harness only submits signed
/// blocks and reads state through this trait.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn execute_transaction_block(
        &self,
        tx: &SignedTransaction,
        opts: &ExecuteOptions,
    ) -> crate::Result<ExecutionResult>;

    async fn get_owned_objects(&self, owner: Address) -> crate::Result<Vec<ChainObject>>;

    async fn get_coins(&self, owner: Address, coin_type: &str) -> crate::Result<Vec<ChainObject>>;

    async fn get_balance(&self, owner: Address) -> crate::Result<u64>;

    async fn get_system_state(&self) -> crate::Result<SystemState>;
}
