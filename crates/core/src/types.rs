use crate::error::AddressParseError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Type tag of the native-currency coin object.
pub const SUI_COIN_TYPE: &str = "0x2::coin::Coin<0x2::sui::SUI>";

/// A 32-byte account identifier, rendered as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical form: leading zero padding stripped, `0x` prefix kept.
    /// The all-zero address renders as `0x0`.
    pub fn to_canonical_string(&self) -> String {
        let hex = hex::encode(self.0);
        let trimmed = hex.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_owned()
        } else {
            format!("0x{trimmed}")
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or(AddressParseError::MissingPrefix)?;
        if digits.is_empty() || digits.len() > 64 {
            return Err(AddressParseError::BadLength(digits.len()));
        }
        // short hex is interpreted as left-padded with zeroes
        let padded = format!("{digits:0>64}");
        let raw = hex::decode(padded)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Identity of an on-chain object. Shares the address representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Address);

impl ObjectId {
    pub const ZERO: ObjectId = ObjectId(Address::ZERO);

    pub fn random() -> Self {
        use rand::Rng;
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        Self(Address::new(bytes))
    }

    pub fn to_canonical_string(&self) -> String {
        self.0.to_canonical_string()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl From<Address> for ObjectId {
    fn from(addr: Address) -> Self {
        Self(addr)
    }
}

impl FromStr for ObjectId {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Address>().map(Self)
    }
}

/// Read-model of an object owned by some address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainObject {
    pub id: ObjectId,
    pub type_tag: String,
    pub owner: Address,
    pub balance: Option<u64>,
}

impl ChainObject {
    pub fn is_sui_coin(&self) -> bool {
        self.type_tag == SUI_COIN_TYPE
    }
}

/// Reference to a transaction input or a previous command's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Argument {
    Object(ObjectId),
    /// Output of the command at the given index within the same block.
    Result(u16),
    GasCoin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    Publish {
        modules: Vec<Vec<u8>>,
        dependencies: Vec<Address>,
    },
    SplitCoins {
        coin: Argument,
        amounts: Vec<u64>,
    },
    TransferObjects {
        objects: Vec<Argument>,
        recipient: Address,
    },
}

/// An ordered batch of commands submitted atomically. Mutable while being
/// assembled; the signer refuses to submit a block without a gas budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBlock {
    sender: Address,
    gas_budget: Option<u64>,
    commands: Vec<Command>,
}

impl TransactionBlock {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            gas_budget: None,
            commands: Vec::new(),
        }
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn gas_budget(&self) -> Option<u64> {
        self.gas_budget
    }

    pub fn set_gas_budget(&mut self, budget: u64) {
        self.gas_budget = Some(budget);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn push(&mut self, command: Command) -> Argument {
        let index = self.commands.len() as u16;
        self.commands.push(command);
        Argument::Result(index)
    }

    /// Appends a publish command; the returned argument is the upgrade
    /// capability produced by the publish.
    pub fn publish(&mut self, modules: Vec<Vec<u8>>, dependencies: Vec<Address>) -> Argument {
        self.push(Command::Publish {
            modules,
            dependencies,
        })
    }

    pub fn split_coins(&mut self, coin: Argument, amounts: Vec<u64>) -> Argument {
        self.push(Command::SplitCoins { coin, amounts })
    }

    pub fn transfer_objects(&mut self, objects: Vec<Argument>, recipient: Address) -> Argument {
        self.push(Command::TransferObjects { objects, recipient })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEffects {
    pub gas_used: u64,
    pub created: Vec<ObjectId>,
    pub mutated: Vec<ObjectId>,
    pub deleted: Vec<ObjectId>,
}

/// One object created, mutated, or transferred by a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectChange {
    Published {
        package_id: ObjectId,
    },
    Created {
        id: ObjectId,
        object_type: String,
        owner: Address,
    },
    Transferred {
        id: ObjectId,
        object_type: String,
        recipient: Address,
        amount: Option<u64>,
    },
    Mutated {
        id: ObjectId,
        object_type: String,
    },
}

/// The chain's report of what a submitted transaction changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub digest: String,
    pub status: ExecutionStatus,
    pub effects: TransactionEffects,
    pub object_changes: Vec<ObjectChange>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success)
    }

    /// Errors with the on-chain failure reason unless the status is success.
    pub fn ensure_success(&self) -> crate::Result<()> {
        match &self.status {
            ExecutionStatus::Success => Ok(()),
            ExecutionStatus::Failure(reason) => Err(crate::error::Error::ExecutionFailed {
                digest: self.digest.clone(),
                reason: reason.clone(),
            }),
        }
    }

    pub fn transfer_changes(&self) -> impl Iterator<Item = &ObjectChange> {
        self.object_changes
            .iter()
            .filter(|c| matches!(c, ObjectChange::Transferred { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub name: String,
    pub address: Address,
    pub voting_power: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub epoch: u64,
    pub validators: Vec<Validator>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrips_through_hex() {
        let addr: Address = "0x0c567ffdf8162cb6d51af74be0199443b92e823d4ba6ced24de5c6c463797d46"
            .parse()
            .unwrap();
        assert_eq!(
            addr.to_string(),
            "0x0c567ffdf8162cb6d51af74be0199443b92e823d4ba6ced24de5c6c463797d46"
        );
    }

    #[test]
    fn short_address_is_left_padded() {
        let addr: Address = "0x2".parse().unwrap();
        assert_eq!(addr.as_bytes()[31], 2);
        assert_eq!(addr.to_canonical_string(), "0x2");
    }

    #[test]
    fn canonical_form_strips_zero_padding() {
        let addr: Address = "0x0c567ffdf8162cb6d51af74be0199443b92e823d4ba6ced24de5c6c463797d46"
            .parse()
            .unwrap();
        assert_eq!(
            addr.to_canonical_string(),
            "0xc567ffdf8162cb6d51af74be0199443b92e823d4ba6ced24de5c6c463797d46"
        );
        assert_eq!(Address::ZERO.to_canonical_string(), "0x0");
    }

    #[test]
    fn address_parse_rejects_garbage() {
        assert!("1234".parse::<Address>().is_err());
        assert!("0x".parse::<Address>().is_err());
        assert!("0xzz".parse::<Address>().is_err());
        let too_long = format!("0x{}", "a".repeat(65));
        assert!(too_long.parse::<Address>().is_err());
    }

    #[test]
    fn block_commands_return_result_arguments() {
        let mut tx = TransactionBlock::new(Address::ZERO);
        let first = tx.split_coins(Argument::GasCoin, vec![100]);
        let second = tx.transfer_objects(vec![first], Address::ZERO);
        assert_eq!(first, Argument::Result(0));
        assert_eq!(second, Argument::Result(1));
        assert_eq!(tx.commands().len(), 2);
        assert!(tx.gas_budget().is_none());
    }
}
