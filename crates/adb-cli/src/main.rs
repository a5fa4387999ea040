//! assembl-db-manage - bootstrap, migrate and inspect an Assembl database

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod context;

use cli::Cli;
use commands::common::ExitCode;
use commands::{bootstrap, check, current, heads, history, seed, stamp, upgrade};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = run(&cli).await {
        if let Some(ExitCode(code)) = err.downcast_ref::<ExitCode>() {
            std::process::exit(*code);
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Bootstrap(args) => bootstrap::execute(args, &cli.global).await,
        cli::Commands::Upgrade(args) => upgrade::execute(args, &cli.global).await,
        cli::Commands::Check => check::execute(&cli.global).await,
        cli::Commands::Current => current::execute(&cli.global).await,
        cli::Commands::Heads => heads::execute(&cli.global).await,
        cli::Commands::History(args) => history::execute(args, &cli.global).await,
        cli::Commands::Seed => seed::execute(&cli.global).await,
        cli::Commands::Stamp(args) => stamp::execute(args, &cli.global).await,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_secs()
        .init();
}
