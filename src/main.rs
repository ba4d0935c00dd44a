mod cli;
mod config;
mod error;
mod parquet;
mod plot;
mod punch;
mod reading;
mod reduce;
mod species;
mod units;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Timeseries(args) => match command::timeseries(args, &config) {
            Ok(filename) => println!("File saved to `{}`", filename),
            Err(e) => eprintln!("Error: {}", e),
        },
        Commands::Map(args) => match command::map(args, &config) {
            Ok(filename) => println!("File saved to `{}`", filename),
            Err(e) => eprintln!("Error: {}", e),
        },
        Commands::FetchObs {} => match command::fetch_obs(&config).await {
            Ok(dir) => println!("Observation files in `{}`", dir),
            Err(e) => eprintln!("Error: {}", e),
        },
    }

    Ok(())
}
