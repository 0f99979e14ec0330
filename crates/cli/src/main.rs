mod commands;

use commands::{HarnessCli, HarnessSubcommand};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = HarnessCli::parse_args();
    let config = args.endpoints.to_config()?;

    match args.command {
        HarnessSubcommand::Fund { address } => commands::fund(config, address).await?,
        HarnessSubcommand::Publish { path } => commands::publish(config, path).await?,
        HarnessSubcommand::Pay {
            times,
            recipients,
            amount,
        } => commands::pay(config, times, recipients, amount).await?,
        HarnessSubcommand::Validators => commands::validators(config).await?,
    }
    Ok(())
}
