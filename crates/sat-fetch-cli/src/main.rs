mod commands;
mod interrupt;
mod logging;
mod progress;

use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use sat_fetch_core::{
    load_record_set, open_record_source, AppConfig, FetchEngine, LoadOutcome, StaticImageSource,
};
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let _guard = logging::init_logger(&logging::LogSettings::from_env(args.verbose));

    let config = match sat_fetch_core::config::load_configuration_from(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Fetch { workers }) => run_fetch(config, workers),
        Some(Commands::Load) => run_load(&config).map(|_| ()),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_load(config: &AppConfig) -> Result<LoadOutcome> {
    info!("Loading train & test records...");
    let train = open_record_source("train", &config.train_path);
    let test = open_record_source("test", &config.test_path);
    let outcome = load_record_set(&[&*train, &*test]);

    for failure in &outcome.failures {
        warn!("Source '{}' skipped: {}", failure.label, failure.error);
    }
    if outcome.rows_rejected > 0 {
        warn!(
            "{} rows rejected (unusable id or coordinates)",
            format!("{}", outcome.rows_rejected).yellow()
        );
    }
    info!(
        "{} rows read, {} unique records, {} duplicates dropped",
        format!("{}", outcome.rows_read).cyan(),
        format!("{}", outcome.records.len()).green(),
        format!("{}", outcome.duplicates_dropped).cyan(),
    );

    outcome.into_result().context("Error loading files")
}

fn run_fetch(mut config: AppConfig, workers: Option<usize>) -> Result<()> {
    if let Some(workers) = workers {
        config.workers = workers;
    }
    config.validate()?;

    let outcome = run_load(&config)?;
    if outcome.records.is_empty() {
        info!("No records to process");
        return Ok(());
    }

    let source = StaticImageSource::from_config(&config)?;
    let engine = FetchEngine::new(&config, source);
    interrupt::install(engine.cancel_token());
    let reporter = CliReporter::new();
    let summary = engine
        .run(&outcome.records, &reporter)
        .context("Error running fetch")?;

    println!();
    info!("Finished! All images are in: {}", engine.save_dir().display());
    info!(
        "{} new downloads, {} skipped (already there), {} failed",
        format!("{}", summary.downloaded).green(),
        format!("{}", summary.skipped).cyan(),
        format!("{}", summary.failed).red(),
    );
    if summary.cancelled {
        warn!(
            "Run stopped early: {} of {} records processed",
            summary.processed(),
            outcome.records.len()
        );
    }

    Ok(())
}
