pub mod cli;
pub mod dataset;
pub mod error;
pub mod io_utils;
pub mod recommend;
pub mod repair;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands};
use crate::dataset::DataTable;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("bookrec", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Repair(args) => handle_repair(&args),
        Commands::Clean(args) => handle_clean(&args),
        Commands::Recommend(args) => recommend::execute(&args),
    }
}

fn handle_repair(args: &cli::RepairArgs) -> Result<()> {
    let delimiter = args.delimiter.unwrap_or(io_utils::DEFAULT_DELIMITER);
    let encoding = io_utils::resolve_input_encoding(args.input_encoding.as_deref())?;
    info!(
        "Repairing '{}' with separator '{}'",
        args.input.display(),
        delimiter as char
    );
    let summary = repair::repair_file(&args.input, delimiter, encoding, args.output.as_deref())
        .with_context(|| format!("Repairing {:?}", args.input))?;
    info!(
        "Repaired {} record(s) ({} collapsed) -> {}",
        summary.records,
        summary.collapsed,
        summary.destination.display()
    );
    Ok(())
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let delimiter = args.delimiter.unwrap_or(io_utils::DEFAULT_DELIMITER);
    let encoding = io_utils::resolve_input_encoding(args.input_encoding.as_deref())?;
    let mut table = DataTable::load_repaired(&args.input, delimiter, encoding)
        .with_context(|| format!("Loading {:?}", args.input))?;
    table
        .repair(args.kind)
        .with_context(|| format!("Repairing {:?} dataset {:?}", args.kind, args.input))?;
    info!(
        "Cleaned {:?} dataset '{}': {} row(s)",
        args.kind,
        args.input.display(),
        table.rows.len()
    );
    io_utils::write_table(args.output.as_deref(), delimiter, &table.headers, &table.rows)
        .context("Writing cleaned dataset")?;
    Ok(())
}
