//! In-memory stand-ins for the chain node and the faucet.
//!
//! These live in the library rather than behind `cfg(test)` so downstream
//! harness code can run scenarios without a localnet. The mock chain keeps
//! a real coin ledger and interprets submitted command blocks, so
//! sequential-ordering properties (coin selection reflecting the previous
//! transaction's post-state) are observable.

use crate::client::{ChainClient, ExecuteOptions, FaucetClient, FaucetGrant, SignedTransaction};
use crate::error::{Error, FaucetError};
use crate::types::{
    Address, Argument, ChainObject, Command, ExecutionResult, ExecutionStatus, ObjectChange,
    ObjectId, SystemState, TransactionEffects, Validator, SUI_COIN_TYPE,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const UPGRADE_CAP_TYPE: &str = "0x2::package::UpgradeCap";

#[derive(Default)]
struct Ledger {
    objects: BTreeMap<ObjectId, ChainObject>,
    executed: u64,
}

/// An in-memory chain: owned objects, a trivial executor, and a static
/// validator set.
pub struct MockChain {
    ledger: Mutex<Ledger>,
    validators: Vec<Validator>,
    execute_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        let validators = (0..4u8)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[31] = i + 1;
                Validator {
                    name: format!("validator-{i}"),
                    address: Address::new(bytes),
                    voting_power: 2_500,
                }
            })
            .collect();
        Self {
            ledger: Mutex::new(Ledger::default()),
            validators,
            execute_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a native coin out of thin air, as the faucet would.
    pub fn mint_coin(&self, owner: Address, amount: u64) -> ObjectId {
        let id = ObjectId::random();
        self.ledger.lock().expect("mock ledger poisoned").objects.insert(
            id,
            ChainObject {
                id,
                type_tag: SUI_COIN_TYPE.to_owned(),
                owner,
                balance: Some(amount),
            },
        );
        id
    }

    /// Removes every coin owned by `owner`.
    pub fn drain_coins(&self, owner: Address) {
        let mut ledger = self.ledger.lock().expect("mock ledger poisoned");
        ledger
            .objects
            .retain(|_, o| !(o.owner == owner && o.is_sui_coin()));
    }

    pub fn balance_of(&self, owner: Address) -> u64 {
        let ledger = self.ledger.lock().expect("mock ledger poisoned");
        ledger
            .objects
            .values()
            .filter(|o| o.owner == owner && o.is_sui_coin())
            .filter_map(|o| o.balance)
            .sum()
    }

    /// Number of transaction submissions seen so far.
    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    /// Number of read queries seen so far.
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn verify_signature(signed: &SignedTransaction) -> Result<(), Error> {
        let pk_bytes: [u8; 32] = BASE64
            .decode(&signed.public_key)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::SignatureInvalid)?;
        let sig_bytes: [u8; 64] = BASE64
            .decode(&signed.signature)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::SignatureInvalid)?;
        if crate::account::derive_address(&pk_bytes) != signed.sender {
            return Err(Error::SignatureInvalid);
        }
        let key = VerifyingKey::from_bytes(&pk_bytes).map_err(|_| Error::SignatureInvalid)?;
        let payload = serde_json::to_vec(&signed.tx)?;
        key.verify(&payload, &Signature::from_bytes(&sig_bytes))
            .map_err(|_| Error::SignatureInvalid)
    }

    fn resolve(
        sender: Address,
        arg: &Argument,
        objects: &BTreeMap<ObjectId, ChainObject>,
        results: &[Vec<ObjectId>],
    ) -> Result<Vec<ObjectId>, String> {
        match arg {
            Argument::Object(id) => Ok(vec![*id]),
            Argument::Result(i) => results
                .get(*i as usize)
                .cloned()
                .ok_or_else(|| format!("no result at index {i}")),
            Argument::GasCoin => objects
                .values()
                .find(|o| o.owner == sender && o.is_sui_coin())
                .map(|o| vec![o.id])
                .ok_or_else(|| "sender owns no gas coin".to_owned()),
        }
    }

    fn failure(digest: String, reason: &str) -> ExecutionResult {
        ExecutionResult {
            digest,
            status: ExecutionStatus::Failure(reason.to_owned()),
            effects: TransactionEffects::default(),
            object_changes: Vec::new(),
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn execute_transaction_block(
        &self,
        signed: &SignedTransaction,
        opts: &ExecuteOptions,
    ) -> crate::Result<ExecutionResult> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        Self::verify_signature(signed)?;
        if signed.tx.gas_budget().is_none() {
            return Err(Error::GasBudgetMissing);
        }

        let sender = signed.sender;
        let mut ledger = self.ledger.lock().expect("mock ledger poisoned");
        ledger.executed += 1;
        let digest = format!("mock-tx-{}", ledger.executed);

        // interpret against a scratch copy; commit only on success
        let mut objects = ledger.objects.clone();
        let mut effects = TransactionEffects {
            gas_used: 1_000,
            ..Default::default()
        };
        let mut changes: Vec<ObjectChange> = Vec::new();
        let mut results: Vec<Vec<ObjectId>> = Vec::new();

        for command in signed.tx.commands() {
            match command {
                Command::Publish { modules, .. } => {
                    if modules.is_empty() {
                        return Ok(Self::failure(digest, "publish with no modules"));
                    }
                    let package_id = ObjectId::random();
                    changes.push(ObjectChange::Published { package_id });

                    let cap_id = ObjectId::random();
                    objects.insert(
                        cap_id,
                        ChainObject {
                            id: cap_id,
                            type_tag: UPGRADE_CAP_TYPE.to_owned(),
                            owner: sender,
                            balance: None,
                        },
                    );
                    effects.created.push(cap_id);
                    changes.push(ObjectChange::Created {
                        id: cap_id,
                        object_type: UPGRADE_CAP_TYPE.to_owned(),
                        owner: sender,
                    });
                    results.push(vec![cap_id]);
                }
                Command::SplitCoins { coin, amounts } => {
                    let source_id = match Self::resolve(sender, coin, &objects, &results) {
                        Ok(ids) => ids[0],
                        Err(reason) => return Ok(Self::failure(digest, &reason)),
                    };
                    let total: u64 = amounts.iter().sum();
                    let source = match objects.get_mut(&source_id) {
                        Some(o) if o.owner == sender && o.is_sui_coin() => o,
                        _ => return Ok(Self::failure(digest, "source coin not owned by sender")),
                    };
                    let balance = source.balance.unwrap_or(0);
                    if balance < total {
                        return Ok(Self::failure(digest, "insufficient balance in source coin"));
                    }
                    source.balance = Some(balance - total);
                    if balance == total {
                        objects.remove(&source_id);
                        effects.deleted.push(source_id);
                    } else {
                        effects.mutated.push(source_id);
                        changes.push(ObjectChange::Mutated {
                            id: source_id,
                            object_type: SUI_COIN_TYPE.to_owned(),
                        });
                    }
                    let mut split_ids = Vec::with_capacity(amounts.len());
                    for amount in amounts {
                        let id = ObjectId::random();
                        objects.insert(
                            id,
                            ChainObject {
                                id,
                                type_tag: SUI_COIN_TYPE.to_owned(),
                                owner: sender,
                                balance: Some(*amount),
                            },
                        );
                        effects.created.push(id);
                        split_ids.push(id);
                    }
                    results.push(split_ids);
                }
                Command::TransferObjects { objects: args, recipient } => {
                    let mut ids = Vec::new();
                    for arg in args {
                        match Self::resolve(sender, arg, &objects, &results) {
                            Ok(resolved) => ids.extend(resolved),
                            Err(reason) => return Ok(Self::failure(digest, &reason)),
                        }
                    }
                    for id in &ids {
                        let object = match objects.get_mut(id) {
                            Some(o) if o.owner == sender => o,
                            _ => {
                                return Ok(Self::failure(
                                    digest,
                                    "transferred object not owned by sender",
                                ))
                            }
                        };
                        object.owner = *recipient;
                        changes.push(ObjectChange::Transferred {
                            id: *id,
                            object_type: object.type_tag.clone(),
                            recipient: *recipient,
                            amount: object.balance,
                        });
                    }
                    results.push(ids);
                }
            }
        }

        ledger.objects = objects;
        Ok(ExecutionResult {
            digest,
            status: ExecutionStatus::Success,
            effects: if opts.show_effects {
                effects
            } else {
                TransactionEffects::default()
            },
            object_changes: if opts.show_object_changes {
                changes
            } else {
                Vec::new()
            },
        })
    }

    async fn get_owned_objects(&self, owner: Address) -> crate::Result<Vec<ChainObject>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let ledger = self.ledger.lock().expect("mock ledger poisoned");
        Ok(ledger
            .objects
            .values()
            .filter(|o| o.owner == owner)
            .cloned()
            .collect())
    }

    async fn get_coins(&self, owner: Address, coin_type: &str) -> crate::Result<Vec<ChainObject>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let ledger = self.ledger.lock().expect("mock ledger poisoned");
        Ok(ledger
            .objects
            .values()
            .filter(|o| o.owner == owner && o.type_tag == coin_type)
            .cloned()
            .collect())
    }

    async fn get_balance(&self, owner: Address) -> crate::Result<u64> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance_of(owner))
    }

    async fn get_system_state(&self) -> crate::Result<SystemState> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SystemState {
            epoch: 1,
            validators: self.validators.clone(),
        })
    }
}

/// One scripted faucet response.
#[derive(Debug, Clone)]
pub enum FaucetOutcome {
    Grant(u64),
    /// Success whose grant names a different recipient, for schema tests.
    MisdirectedGrant(Address),
    Transient(String),
    RateLimited,
}

/// Scriptable faucet. Plays back a queue of outcomes, then repeats its
/// fallback. When attached to a [`MockChain`], successful grants mint a
/// real coin so funded contexts can actually spend.
pub struct MockFaucet {
    chain: Option<Arc<MockChain>>,
    script: Mutex<VecDeque<FaucetOutcome>>,
    fallback: FaucetOutcome,
    attempts: AtomicUsize,
}

impl MockFaucet {
    pub fn scripted(outcomes: Vec<FaucetOutcome>) -> Self {
        Self {
            chain: None,
            script: Mutex::new(outcomes.into()),
            fallback: FaucetOutcome::Transient("faucet script exhausted".to_owned()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn always_rate_limited() -> Self {
        Self {
            chain: None,
            script: Mutex::new(VecDeque::new()),
            fallback: FaucetOutcome::RateLimited,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Grants `amount` on every request, minted into `chain`.
    pub fn granting(chain: Arc<MockChain>, amount: u64) -> Self {
        Self {
            chain: Some(chain),
            script: Mutex::new(VecDeque::new()),
            fallback: FaucetOutcome::Grant(amount),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaucetClient for MockFaucet {
    async fn request_funds(&self, recipient: Address) -> Result<FaucetGrant, FaucetError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .expect("mock faucet poisoned")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match outcome {
            FaucetOutcome::Grant(amount) => {
                if let Some(chain) = &self.chain {
                    chain.mint_coin(recipient, amount);
                }
                Ok(FaucetGrant { recipient, amount })
            }
            FaucetOutcome::MisdirectedGrant(other) => Ok(FaucetGrant {
                recipient: other,
                amount: 1,
            }),
            FaucetOutcome::Transient(reason) => Err(FaucetError::Transient(reason)),
            FaucetOutcome::RateLimited => Err(FaucetError::RateLimited),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account;

    #[tokio::test]
    async fn minted_coins_show_up_in_owned_objects() {
        let chain = MockChain::new();
        let owner = account::generate_addresses(1)[0];
        let id = chain.mint_coin(owner, 5_000);

        let owned = chain.get_owned_objects(owner).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, id);
        assert_eq!(chain.balance_of(owner), 5_000);
    }

    #[tokio::test]
    async fn tampered_transaction_is_rejected() {
        use crate::client::ExecuteOptions;
        use crate::types::TransactionBlock;

        let chain = MockChain::new();
        let (keypair, address) = account::generate_account();
        chain.mint_coin(address, 1_000);

        let mut tx = TransactionBlock::new(address);
        tx.set_gas_budget(100);
        let payload = serde_json::to_vec(&tx).unwrap();
        let mut signed = SignedTransaction {
            sender: address,
            public_key: BASE64.encode(keypair.public_key_bytes()),
            signature: BASE64.encode(keypair.sign(&payload)),
            tx,
        };
        // tamper after signing
        signed.tx.set_gas_budget(999);

        let err = chain
            .execute_transaction_block(&signed, &ExecuteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SignatureInvalid));
    }
}
