//! Command line harness for the ORTB2 attribute-blocking hook.
//!
//! This tool provides commands for:
//! - Running the hook for a list of bidders against a bid request
//! - Validating an account's module configuration

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use ortb2_blocking_common::blocking::{parse_module_config, Attribute};
use ortb2_blocking_common::catalog::StaticBidderCatalog;

mod auction;
mod config;
mod error;
mod logging;

use auction::AuctionRunner;
use error::CliError;

#[derive(Parser)]
#[command(name = "blockctl")]
#[command(about = "Run and check ORTB2 attribute blocking outside of an auction server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML settings file
    #[arg(long, short, global = true)]
    settings: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke the hook for each bidder and print the resulting requests
    Run {
        /// Path to the account's module configuration (JSON)
        #[arg(long, short)]
        account_config: Option<PathBuf>,

        /// Path to the OpenRTB bid request (JSON)
        #[arg(long, short)]
        request: PathBuf,

        /// Bidder to invoke the hook for; repeat for several bidders
        #[arg(long, short, required = true)]
        bidder: Vec<String>,

        /// Report warnings and config errors, as for a debug-enabled auction
        #[arg(long)]
        debug: bool,
    },

    /// Parse an account's module configuration and report problems
    Validate {
        /// Path to the account's module configuration (JSON)
        #[arg(long, short)]
        account_config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = config::load_settings(cli.settings.as_deref())?;
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        settings.logging.level_filter()
    };
    logging::init_logger(level)?;

    match cli.command {
        Commands::Run {
            account_config,
            request,
            bidder,
            debug,
        } => {
            let account_config = account_config
                .as_deref()
                .map(config::load_account_config)
                .transpose()?;
            let request = config::load_bid_request(&request)?;

            let catalog = StaticBidderCatalog::from_settings(&settings.catalog);

            let outcome =
                AuctionRunner::new(catalog).run(&request, account_config.as_ref(), &bidder, debug);

            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &outcome)?;
            writeln!(stdout)?;
            Ok(())
        }
        Commands::Validate { account_config } => {
            let account_config = config::load_account_config(&account_config)?;
            validate(&account_config)
        }
    }
}

fn validate(account_config: &serde_json::Value) -> Result<(), CliError> {
    let parsed = match parse_module_config(Some(account_config)) {
        Ok(parsed) => parsed,
        Err(e) => return Err(CliError::Config(e.to_string())),
    };

    let configured = parsed.config.attributes.configured();
    if !configured.is_empty() {
        let names: Vec<&str> = configured.into_iter().map(Attribute::field_name).collect();
        println!("Configured attributes: {}", names.join(", "));
    }

    if parsed.errors.is_empty() {
        println!("✓ Account configuration is valid");
        return Ok(());
    }

    for error in &parsed.errors {
        println!("✗ {}", error);
    }
    Err(CliError::Config(format!(
        "Account configuration has {} error(s)",
        parsed.errors.len()
    )))
}
