//! Per-scenario context: a funded account bound to a chain client.

use crate::account::{self, Keypair};
use crate::client::{ChainClient, ExecuteOptions, FaucetClient, SignedTransaction};
use crate::config::HarnessConfig;
use crate::error::Error;
use crate::faucet::FaucetFunder;
use crate::types::{
    Address, ChainObject, ExecutionResult, TransactionBlock, Validator, SUI_COIN_TYPE,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;
use tracing::{debug, info};

/// Exclusively owns a keypair and a chain-client handle; the only way a
/// transaction block leaves the harness.
pub struct Signer {
    keypair: Keypair,
    chain: Arc<dyn ChainClient>,
}

impl Signer {
    pub fn new(keypair: Keypair, chain: Arc<dyn ChainClient>) -> Self {
        Self { keypair, chain }
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    /// Signs and submits a block. A block without a gas budget is rejected
    /// here, before anything goes over the wire.
    pub async fn execute(
        &self,
        tx: TransactionBlock,
        opts: ExecuteOptions,
    ) -> crate::Result<ExecutionResult> {
        if tx.gas_budget().is_none() {
            return Err(Error::GasBudgetMissing);
        }
        let payload = serde_json::to_vec(&tx)?;
        let signed = SignedTransaction {
            sender: self.address(),
            public_key: BASE64.encode(self.keypair.public_key_bytes()),
            signature: BASE64.encode(self.keypair.sign(&payload)),
            tx,
        };
        let result = self.chain.execute_transaction_block(&signed, &opts).await?;
        debug!(digest = %result.digest, success = result.is_success(), "transaction executed");
        Ok(result)
    }
}

/// A freshly generated, faucet-funded account plus everything needed to
/// drive transactions with it. Torn down implicitly at process exit.
pub struct TestContext {
    signer: Signer,
    address: Address,
    config: HarnessConfig,
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("address", &self.address)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TestContext {
    /// Generates an account, funds it through the faucet, and binds it to
    /// the given chain client. Funding failures are fatal except for a
    /// rate limit, which surfaces as-is so the caller can skip the
    /// scenario (check [`Error::is_rate_limited`]).
    pub async fn create(
        config: HarnessConfig,
        chain: Arc<dyn ChainClient>,
        faucet: Arc<dyn FaucetClient>,
    ) -> crate::Result<Self> {
        let (keypair, address) = account::generate_account();
        let funder = FaucetFunder::new(faucet);
        let grant = funder.request_funds(address).await?;
        info!(%address, amount = grant.amount, "provisioned funded test account");
        Ok(Self {
            signer: Signer::new(keypair, chain),
            address,
            config,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        self.signer.chain()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Objects owned by this context's address, filtered to native coins.
    pub async fn owned_coin_objects(&self) -> crate::Result<Vec<ChainObject>> {
        let objects = self.chain().get_owned_objects(self.address).await?;
        Ok(objects.into_iter().filter(ChainObject::is_sui_coin).collect())
    }

    /// Snapshot of the current validator set.
    pub async fn active_validators(&self) -> crate::Result<Vec<Validator>> {
        let state = self.chain().get_system_state().await?;
        Ok(state.validators)
    }

    pub async fn balance(&self) -> crate::Result<u64> {
        self.chain().get_balance(self.address).await
    }

    /// First native coin owned by this address, used as the default
    /// payment source. Queried live so it reflects prior transactions.
    pub async fn first_sui_coin(&self) -> crate::Result<ChainObject> {
        let coins = self.chain().get_coins(self.address, SUI_COIN_TYPE).await?;
        coins
            .into_iter()
            .next()
            .ok_or(Error::CoinNotFound(self.address))
    }
}
