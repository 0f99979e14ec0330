use crate::types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("faucet error: {0}")]
    Faucet(#[from] FaucetError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("invalid address: {0}")]
    AddressParse(#[from] AddressParseError),

    #[error("transaction {digest} failed: {reason}")]
    ExecutionFailed { digest: String, reason: String },

    #[error("transaction block has no gas budget")]
    GasBudgetMissing,

    #[error("transaction signature rejected")]
    SignatureInvalid,

    #[error("recipient/amount length mismatch: {recipients} recipients, {amounts} amounts")]
    RecipientAmountMismatch { recipients: usize, amounts: usize },

    #[error("no native coin objects owned by {0}")]
    CoinNotFound(Address),

    #[error("no published package in object changes")]
    PackageIdMissing,

    #[error("rpc error: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the underlying cause is a faucet rate limit. Callers may
    /// skip a scenario on a rate-limited localnet instead of failing it.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Faucet(FaucetError::RateLimited))
    }
}

/// Failures of the funding endpoint. Only `Transient` is retryable; a
/// rate limit ends the retry loop but is the caller's to handle, while a
/// malformed response is always fatal.
#[derive(Debug, Error)]
pub enum FaucetError {
    #[error("faucet rate limit exceeded")]
    RateLimited,

    #[error("transient faucet failure: {0}")]
    Transient(String),

    #[error("malformed faucet response: {0}")]
    SchemaInvalid(String),
}

impl FaucetError {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FaucetError::Transient(_))
    }
}

/// Failures while producing or decoding the compiler's artifact bundle.
/// All of these are deterministic and therefore never retried.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io failure invoking compiler: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("compiler exited with status {status}: {stderr}")]
    CompilerFailed { status: i32, stderr: String },

    #[error("artifact bundle does not match expected schema: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("module bytecode is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("dependency is not a valid address: {0}")]
    BadDependency(#[from] AddressParseError),
}

#[derive(Debug, Error)]
pub enum AddressParseError {
    #[error("missing 0x prefix")]
    MissingPrefix,

    #[error("expected 1..=64 hex digits, got {0}")]
    BadLength(usize),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}
