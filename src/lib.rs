pub mod cli;
pub mod context;
pub mod core;
pub mod providers;

use crate::context::AppContext;
use crate::core::Currency;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Convert {
        amount: Option<String>,
        base: Option<Currency>,
    },
    Watch,
    Wallet,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxview starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let mut context = AppContext::from_config(&config).await?;

    let result = match command {
        AppCommand::Convert { amount, base } => cli::convert::run(&context, amount, base).await,
        AppCommand::Watch => cli::watch::run(&mut context).await,
        AppCommand::Wallet => cli::wallet::run(&mut context).await,
    };

    context.shutdown();
    result
}
