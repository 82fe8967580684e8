use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use mufx::cli::prices::OutputFormat;
use mufx::cli::verify::VerifyTarget;
use mufx::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
#[group(multiple = false)]
struct FormatArgs {
    /// Output as JSON for automation
    #[arg(long)]
    json: bool,

    /// Output as CSV
    #[arg(long)]
    csv: bool,
}

impl From<FormatArgs> for OutputFormat {
    fn from(args: FormatArgs) -> OutputFormat {
        match (args.json, args.csv) {
            (true, _) => OutputFormat::Json,
            (_, true) => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch latest prices for all tracked instruments
    Prices(FormatArgs),
    /// Verify published articles against their embedded content hash
    Verify {
        /// Article file to verify
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        file: Option<PathBuf>,

        /// Verify every signal, weekly and q2 article in the directory
        #[arg(long)]
        all: bool,

        /// Directory searched by --all
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

impl From<Commands> for mufx::AppCommand {
    fn from(cmd: Commands) -> mufx::AppCommand {
        match cmd {
            Commands::Prices(format) => mufx::AppCommand::Prices(format.into()),
            Commands::Verify { file, dir, .. } => mufx::AppCommand::Verify(match file {
                Some(path) => VerifyTarget::File(path),
                None => VerifyTarget::All { dir },
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => mufx::cli::setup::setup(),
        Some(cmd) => mufx::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
