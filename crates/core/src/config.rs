//! Harness configuration. One explicit structure passed around, no
//! process-wide mutable state, so test runs stay independent.

use crate::types::Address;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9000";
pub const DEFAULT_FAUCET_URL: &str = "http://127.0.0.1:9123/gas";
pub const DEFAULT_COMPILER: &str = "sui";

pub const DEFAULT_GAS_BUDGET: u64 = 10_000_000;
pub const DEFAULT_SEND_AMOUNT: u64 = 1_000;

/// Well-known recipient addresses shared with other test code. These are
/// fixed by contract, not generated per-run.
pub const DEFAULT_RECIPIENT: &str =
    "0x0c567ffdf8162cb6d51af74be0199443b92e823d4ba6ced24de5c6c463797d46";
pub const DEFAULT_RECIPIENT_2: &str =
    "0xbb967ddbebfee8c40d8fdd2c24cb02452834cd3a7061d18564448f900eb9e66d";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub rpc_url: String,
    pub faucet_url: String,
    pub compiler_bin: String,
    pub gas_budget: u64,
    pub send_amount: u64,
    pub default_recipients: [Address; 2],
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_owned(),
            faucet_url: DEFAULT_FAUCET_URL.to_owned(),
            compiler_bin: DEFAULT_COMPILER.to_owned(),
            gas_budget: DEFAULT_GAS_BUDGET,
            send_amount: DEFAULT_SEND_AMOUNT,
            default_recipients: [
                DEFAULT_RECIPIENT
                    .parse()
                    .expect("default recipient address is valid"),
                DEFAULT_RECIPIENT_2
                    .parse()
                    .expect("default recipient address is valid"),
            ],
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by `HARNESS_RPC_URL`, `HARNESS_FAUCET_URL` and
    /// `HARNESS_COMPILER` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("HARNESS_RPC_URL") {
            config.rpc_url = url;
        }
        if let Ok(url) = std::env::var("HARNESS_FAUCET_URL") {
            config.faucet_url = url;
        }
        if let Ok(bin) = std::env::var("HARNESS_COMPILER") {
            config.compiler_bin = bin;
        }
        config
    }
}
