//! Tyre factory simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;

use tyresim::report::{print_insights, write_aggregates_json, write_production_csv};
use tyresim::{load_orders, Factory, FactoryConfig};

/// Runs a shift of the tyre factory on a sheet of orders.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Path to a CSV file with orders.
    #[clap(long, default_value = "orders.csv")]
    orders: PathBuf,

    /// Path to a YAML file with the factory configuration.
    /// If missing, the default factory is used.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Length of the shift in minutes. Overrides the configuration.
    #[clap(long)]
    horizon: Option<f64>,

    /// Random seed. Overrides the configuration.
    #[clap(long)]
    seed: Option<u64>,

    /// Write one CSV row per produced tyre to this file.
    #[clap(long)]
    production_output: Option<PathBuf>,

    /// Write the aggregated statistics in JSON to this file.
    #[clap(long)]
    json_output: Option<PathBuf>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: u64,

    /// Append the logs to this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,
}

impl Opt {
    fn factory_config(&self) -> eyre::Result<FactoryConfig> {
        let mut config = if let Some(path) = &self.config {
            let file = File::open(path)
                .wrap_err_with(|| format!("unable to open config: {}", path.display()))?;
            FactoryConfig::from_yaml(file)
                .wrap_err_with(|| format!("invalid config: {}", path.display()))?
        } else {
            FactoryConfig::default()
        };
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }

    fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {}: {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(opt.log_level());
    if let Some(path) = &opt.log_output {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }
    if !opt.no_stderr {
        dispatch = dispatch.chain(io::stderr());
    }
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    let config = opt.factory_config()?;

    println!("Loading orders from {}...", opt.orders.display());
    let orders = load_orders(&opt.orders)?;
    println!("\nLoaded {} unique orders", orders.len());
    println!(
        "Total tyres to produce: {}",
        orders.iter().map(|o| o.quantity).sum::<usize>()
    );
    println!(
        "\nRunning simulation for a shift of {} minutes...\n",
        config.horizon
    );

    let output = Factory::new(&config)?.run(&orders, config.horizon)?;
    print_insights(io::stdout().lock(), &output)?;

    if let Some(path) = &opt.production_output {
        let file = File::create(path)
            .wrap_err_with(|| format!("unable to create {}", path.display()))?;
        write_production_csv(file, &output.completed)?;
        log::info!("Production data written to {}", path.display());
    }
    if let Some(path) = &opt.json_output {
        let file = File::create(path)
            .wrap_err_with(|| format!("unable to create {}", path.display()))?;
        write_aggregates_json(file, &output.metrics.aggregate())?;
        log::info!("Aggregates written to {}", path.display());
    }
    Ok(())
}
