//! herakles-forecast-monitor - version 0.1.0
//!
//! Resource telemetry monitor with tracing logging.
//! This is the main entry point that builds the monitor and handles subcommands.

mod cli;
mod commands;
mod startup_checks;

use anyhow::Context;
use clap::Parser;
use prometheus::Registry;
use tokio::{signal, sync::watch};
use tracing::{error, info, warn};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_sample, command_snapshots};
use herakles_forecast_monitor::config::{render_config, resolve_config, Config, OutputFormat};
use herakles_forecast_monitor::exporter::{self, ForecastMetrics, PrometheusSink};
use herakles_forecast_monitor::probe::platform_probe;
use herakles_forecast_monitor::sink::{ConsoleSink, FanoutSink, JsonLinesSink, LogSink};
use herakles_forecast_monitor::snapshot::SnapshotStore;
use herakles_forecast_monitor::Monitor;

/// Initializes tracing logging subsystem with configured log level.
///
/// Logs go to stderr so the console renderer owns stdout.
fn setup_logging(config: &Config, args: &Args) {
    let log_level = args
        .log_level
        .or_else(|| config.log_level.as_deref().and_then(LogLevel::from_name))
        .unwrap_or(LogLevel::Info);

    let Some(level) = log_level.as_level() else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> anyhow::Result<Config> {
    let config = resolve_config(args.config.as_deref(), args.no_config, &args.overrides())?;
    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), stopping...");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping...");
        }
    }
}

/// Runs the sampling loop until a stop signal arrives.
async fn run_monitor(config: Config) -> anyhow::Result<()> {
    info!("Starting herakles-forecast-monitor");

    if let Err(e) = startup_checks::validate_requirements(&config.data_dir) {
        error!("❌ Startup validation failed: {}", e);
        error!("   The monitor will start but may not function correctly!");
        // Continue anyway - don't fail hard
    }

    let horizon_label = config.horizon_label();
    let mut sink = FanoutSink::new();
    match config.output {
        OutputFormat::Console => {
            sink.push(Box::new(ConsoleSink::stdout(horizon_label, config.warn_percent)))
        }
        OutputFormat::Json => sink.push(Box::new(JsonLinesSink::new(std::io::stdout()))),
        OutputFormat::Log => sink.push(Box::new(LogSink::new(config.warn_percent))),
    }

    let (stop_tx, stop_rx) = watch::channel(false);

    let exporter_task = match config.listen_addr()? {
        Some(addr) => {
            let registry = Registry::new();
            let metrics =
                ForecastMetrics::new(&registry).context("Failed to register exporter metrics")?;
            sink.push(Box::new(PrometheusSink::new(metrics)));

            let shutdown = stop_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = exporter::serve(addr, registry, shutdown).await {
                    error!("Exporter error on {}: {}", addr, e);
                }
            }))
        }
        None => None,
    };

    let mut monitor = Monitor::new(
        config.monitor_settings(),
        platform_probe(),
        SnapshotStore::new(&config.data_dir),
        Box::new(sink),
    )?;

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let summary = monitor.run(stop_rx).await;

    if let Some(task) = exporter_task {
        if let Err(e) = task.await {
            warn!("Exporter task ended abnormally: {}", e);
        }
    }

    info!(
        ticks = summary.ticks,
        snapshots_written = summary.snapshots_written,
        snapshot_failures = summary.snapshot_failures,
        "herakles-forecast-monitor stopped gracefully"
    );
    Ok(())
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(args.config.as_deref(), args.no_config, &args.overrides())?;

        if args.check_config {
            if let Err(e) = config.validate() {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        print!("{}", render_config(&config, args.config_format)?);
        return Ok(());
    }

    // Config generation does not need an existing valid config
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), *format, *commented);
    }

    // `check` reports an invalid config itself instead of exiting early
    let config = if matches!(args.command, Some(Commands::Check)) {
        resolve_config(args.config.as_deref(), args.no_config, &args.overrides())?
    } else {
        load_validated_config(&args)?
    };
    setup_logging(&config, &args);

    match &args.command {
        None | Some(Commands::Run) => run_monitor(config).await,

        Some(Commands::Sample { iterations, json }) => {
            command_sample(*iterations, *json, config.monitor_settings().interval)
        }

        Some(Commands::Snapshots { latest }) => {
            command_snapshots(&SnapshotStore::new(&config.data_dir), *latest)
        }

        Some(Commands::Check) => {
            if !command_check(&config)? {
                std::process::exit(1);
            }
            Ok(())
        }

        Some(Commands::Config { .. }) => unreachable!("Config handled above"),
    }
}
