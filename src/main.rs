mod cli;
mod logging;
mod status;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use status::CliReporter;
use std::process::ExitCode;
use tracing::{error, info, warn};
use user_scanner::config::{load_configuration, SettingsOverrides};
use user_scanner::{AppConfig, ReportSink, ScanEngine, ScanSettings};

fn main() -> ExitCode {
    dotenv().ok();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // --help and --version are reported through the same path
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let _guard = logging::init_logger(args.settings.verbose);

    let config = match load_configuration(args.settings.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let overrides = args.settings.overrides();

    let outcome = match args.command {
        None | Some(Commands::Scan) => run_scan(&config, &overrides),
        Some(Commands::HostOs { name }) => run_host_os(&config, &overrides, &name),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run_scan(config: &AppConfig, overrides: &SettingsOverrides) -> anyhow::Result<()> {
    let settings = ScanSettings::resolve(config, overrides)?;
    let output = settings.require_output()?.to_path_buf();

    info!(
        "Domain: {}, DC: {}, workers: {}",
        settings.domain.cyan(),
        settings.domain_controller.cyan(),
        settings.threads
    );

    let sink = ReportSink::create(&output).context("Failed to initialize report")?;
    let engine = ScanEngine::from_settings(&settings);
    let reporter = CliReporter::new();
    let (_, result) = engine.run(sink, &reporter)?;

    let stats = result.statistics;
    println!();
    info!("=== REPORT SUMMARY ===");
    info!("Total computers: {}", format!("{}", stats.total_hosts).green());
    info!(
        "Computers with users: {}",
        format!("{}", stats.hosts_with_sessions).green()
    );
    info!("Total logons: {}", format!("{}", stats.total_sessions).green());
    info!("Report file: {}", output.display().to_string().cyan());
    if result.unreachable_hosts > 0 {
        warn!(
            "{} computers could not be reached",
            format!("{}", result.unreachable_hosts).red()
        );
    }
    info!(
        "Inventory: {}, Scan: {}",
        format!("{:.2}s", result.inventory_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
    );

    Ok(())
}

fn run_host_os(
    config: &AppConfig,
    overrides: &SettingsOverrides,
    name: &str,
) -> anyhow::Result<()> {
    let settings = ScanSettings::resolve(config, overrides)?;
    let engine = ScanEngine::from_settings(&settings);

    match engine.operating_system(name) {
        Some(os) => println!("{}: {}", name, os),
        None => warn!("No operating system found for {}", name),
    }
    Ok(())
}
