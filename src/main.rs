use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use eventit_insights::config::AppConfig;
use eventit_insights::state::{CustomerSession, FeeSession};
use eventit_insights::Datasets;

#[derive(Debug, Parser)]
#[command(name = "eventit-insights", version, about = "Query cleaned customer and fee exports")]
struct Cli {
    /// TOML config file (defaults to ./eventit.toml when present)
    #[arg(long, global = true, env = "EVENTIT_CONFIG")]
    config: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Customer dashboard data
    Customers {
        /// Customer export, overrides the config
        #[arg(long)]
        path: Option<PathBuf>,
        /// Case-insensitive name search
        #[arg(long, default_value = "")]
        search: String,
        /// Latest start year to include
        #[arg(long)]
        max_year: Option<i32>,
        /// Contract type to include (repeatable)
        #[arg(long = "contract")]
        contracts: Vec<String>,
    },
    /// Organizer fee dashboard data
    Fees {
        /// Fee export, overrides the config
        #[arg(long)]
        path: Option<PathBuf>,
        /// Case-insensitive organizer search
        #[arg(long, default_value = "")]
        search: String,
        /// Latest year to include
        #[arg(long)]
        max_year: Option<i32>,
        /// Top organizer to compare (repeatable)
        #[arg(long = "organizer")]
        organizers: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let datasets = Datasets::new(config.customer_options()?, config.fee_options()?);

    match cli.command {
        Command::Customers {
            path,
            search,
            max_year,
            contracts,
        } => {
            let path = path.unwrap_or_else(|| config.customers.path.clone());
            let table = datasets
                .customers(&path)
                .with_context(|| format!("loading customers from {}", path.display()))?;

            let mut session = CustomerSession::new(table);
            session.set_search(search);
            if max_year.is_some() {
                session.set_max_start_year(max_year);
            }
            session.select_contract_types(contracts);
            print_json(&session.view(&config.view), cli.compact)
        }
        Command::Fees {
            path,
            search,
            max_year,
            organizers,
        } => {
            let path = path.unwrap_or_else(|| config.fees.path.clone());
            let table = datasets
                .fees(&path)
                .with_context(|| format!("loading fees from {}", path.display()))?;

            let mut session = FeeSession::new(table, config.view.default_organizers);
            session.set_search(search);
            if max_year.is_some() {
                session.set_max_year(max_year);
            }
            if !organizers.is_empty() {
                session.select_organizers(organizers);
            }
            print_json(&session.view(), cli.compact)
        }
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}
