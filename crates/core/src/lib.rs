//! Test-harness core for exercising a chain client against a local
//! network: faucet-funded throwaway accounts, a package-publish pipeline,
//! and an ordered multi-transaction payment executor.

pub mod account;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod faucet;
pub mod mock;
pub mod pay;
pub mod publish;
pub mod retry;
pub mod rpc;
pub mod types;

pub type Result<T> = std::result::Result<T, error::Error>;

pub use account::{generate_account, generate_addresses, Keypair};
pub use config::HarnessConfig;
pub use context::{Signer, TestContext};
pub use error::Error;
pub use faucet::FaucetFunder;
pub use pay::{pay_n_times, pay_sui, PayParams};
pub use publish::{publish_package, publish_package_isolated};
