use clap::{Args, Parser, Subcommand};
use eyre::{Context, Result};
use harness_core::config::{DEFAULT_COMPILER, DEFAULT_FAUCET_URL, DEFAULT_RPC_URL};
use harness_core::rpc::{HttpFaucet, RpcClient};
use harness_core::types::Address;
use harness_core::{
    generate_account, pay_n_times, publish_package, FaucetFunder, HarnessConfig, PayParams,
    TestContext,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "harness", about = "Localnet test harness")]
pub struct HarnessCli {
    #[command(flatten)]
    pub endpoints: EndpointArgs,

    #[command(subcommand)]
    pub command: HarnessSubcommand,
}

impl HarnessCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Args, Debug)]
pub struct EndpointArgs {
    /// Chain-query endpoint
    #[arg(long, env = "HARNESS_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Funding endpoint
    #[arg(long, env = "HARNESS_FAUCET_URL", default_value = DEFAULT_FAUCET_URL)]
    pub faucet_url: String,

    /// Package compiler binary
    #[arg(long, env = "HARNESS_COMPILER", default_value = DEFAULT_COMPILER)]
    pub compiler: String,
}

impl EndpointArgs {
    pub fn to_config(&self) -> Result<HarnessConfig> {
        Url::parse(&self.rpc_url).wrap_err("invalid RPC URL")?;
        Url::parse(&self.faucet_url).wrap_err("invalid faucet URL")?;
        Ok(HarnessConfig {
            rpc_url: self.rpc_url.clone(),
            faucet_url: self.faucet_url.clone(),
            compiler_bin: self.compiler.clone(),
            ..HarnessConfig::default()
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum HarnessSubcommand {
    #[command(name = "fund", about = "Request faucet funds for an address")]
    Fund {
        /// Address to fund; a fresh one is generated when omitted
        address: Option<String>,
    },

    #[command(
        name = "publish",
        about = "Compile and publish a package from a fresh funded account"
    )]
    Publish {
        /// Path to the package source
        path: PathBuf,
    },

    #[command(name = "pay", about = "Submit sequential payment transactions")]
    Pay {
        /// Number of transactions to submit, strictly in order
        #[arg(long, default_value_t = 1)]
        times: usize,

        /// Recipients per transaction
        #[arg(long, default_value_t = 1)]
        recipients: usize,

        /// Amount per recipient; defaults to the configured send amount
        #[arg(long)]
        amount: Option<u64>,
    },

    #[command(name = "validators", about = "Print the active validator set")]
    Validators,
}

async fn funded_context(config: HarnessConfig) -> Result<TestContext> {
    let chain = Arc::new(RpcClient::new(&config.rpc_url)?);
    let faucet = Arc::new(HttpFaucet::new(&config.faucet_url));
    let ctx = TestContext::create(config, chain, faucet).await?;
    Ok(ctx)
}

pub async fn fund(config: HarnessConfig, address: Option<String>) -> Result<()> {
    let recipient: Address = match address {
        Some(raw) => raw.parse().map_err(harness_core::Error::from)?,
        None => {
            let (_, address) = generate_account();
            info!(%address, "generated a fresh address");
            address
        }
    };
    let funder = FaucetFunder::new(Arc::new(HttpFaucet::new(&config.faucet_url)));
    let grant = funder
        .request_funds(recipient)
        .await
        .map_err(harness_core::Error::from)?;
    println!("funded {} with {}", grant.recipient, grant.amount);
    Ok(())
}

pub async fn publish(config: HarnessConfig, path: PathBuf) -> Result<()> {
    let ctx = funded_context(config).await?;
    let (package_id, result) = publish_package(&ctx, &path).await?;
    println!("package: {}", package_id.to_canonical_string());
    println!("digest:  {}", result.digest);
    Ok(())
}

pub async fn pay(
    config: HarnessConfig,
    times: usize,
    recipients: usize,
    amount: Option<u64>,
) -> Result<()> {
    let ctx = funded_context(config).await?;
    let params = PayParams {
        num_recipients: recipients,
        amounts: amount.map(|a| vec![a; recipients]),
        ..Default::default()
    };
    let results = pay_n_times(&ctx, times, params).await?;
    for result in results {
        println!(
            "{} transfers in {}",
            result.transfer_changes().count(),
            result.digest
        );
    }
    Ok(())
}

pub async fn validators(config: HarnessConfig) -> Result<()> {
    use harness_core::client::ChainClient;

    let chain = RpcClient::new(&config.rpc_url)?;
    let state = chain.get_system_state().await?;
    println!("epoch {}", state.epoch);
    for validator in state.validators {
        println!(
            "{}\t{}\t{}",
            validator.name,
            validator.address.to_canonical_string(),
            validator.voting_power
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pay_with_defaults() {
        let cli = HarnessCli::try_parse_from(["harness", "pay"]).unwrap();
        match cli.command {
            HarnessSubcommand::Pay {
                times,
                recipients,
                amount,
            } => {
                assert_eq!(times, 1);
                assert_eq!(recipients, 1);
                assert_eq!(amount, None);
            }
            other => panic!("expected pay, got {other:?}"),
        }
        assert_eq!(cli.endpoints.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(cli.endpoints.faucet_url, DEFAULT_FAUCET_URL);
    }

    #[test]
    fn parses_publish_with_endpoint_overrides() {
        let cli = HarnessCli::try_parse_from([
            "harness",
            "--rpc-url",
            "http://localhost:9999",
            "publish",
            "demo/package",
        ])
        .unwrap();
        let config = cli.endpoints.to_config().unwrap();
        assert_eq!(config.rpc_url, "http://localhost:9999");
        assert!(matches!(cli.command, HarnessSubcommand::Publish { .. }));
    }

    #[test]
    fn rejects_unparseable_rpc_url() {
        let cli =
            HarnessCli::try_parse_from(["harness", "--rpc-url", "not a url", "validators"])
                .unwrap();
        assert!(cli.endpoints.to_config().is_err());
    }

    #[test]
    fn fund_accepts_an_optional_address() {
        let cli = HarnessCli::try_parse_from(["harness", "fund", "0x2"]).unwrap();
        match cli.command {
            HarnessSubcommand::Fund { address } => assert_eq!(address.as_deref(), Some("0x2")),
            other => panic!("expected fund, got {other:?}"),
        }
    }
}
