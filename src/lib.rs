pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::prices::OutputFormat;
use crate::cli::verify::VerifyTarget;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Prices(OutputFormat),
    Verify(VerifyTarget),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("muFX starting...");

    match command {
        AppCommand::Prices(format) => {
            let config = match config_path {
                Some(path) => AppConfig::load_from_path(path)?,
                None => AppConfig::load()?,
            };
            debug!("Loaded config: {config:#?}");

            let provider = providers::YahooFinanceProvider::new(&config.providers.yahoo)?;
            cli::prices::run(crate::core::INSTRUMENTS, &provider, format).await
        }
        AppCommand::Verify(target) => cli::verify::run(&target),
    }
}
