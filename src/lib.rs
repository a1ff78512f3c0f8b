pub mod capture;
pub mod cli;
pub mod config;
pub mod core;
pub mod driver;
pub mod error;
pub mod logging;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use capture::{log_reporter, CaptureEngine, PcapBackend};
use cli::Cli;
use config::Config;

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let log_settings = cli.log_settings();
    logging::init(&log_settings);

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in streamkey-sniffer: {info}");
        default_hook(info);
    }));

    let result = if cli.list_interfaces {
        print_interfaces()
    } else {
        start(&cli)
    };

    let code = match result {
        Ok(()) => {
            tracing::info!("Program stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    };

    if !cli.no_pause {
        pause_for_ack();
    }
    code
}

/// Full startup sequence: config, driver, capture, then block until a shutdown signal.
fn start(cli: &Cli) -> anyhow::Result<()> {
    tracing::info!("Program starting...");

    let config = Config::load(&cli.config).context("failed to load configuration")?;
    tracing::debug!("Configuration:");
    tracing::debug!("- interface: {}", config.interface);
    tracing::debug!("- filter: {}", config.display_filter);

    ensure_driver(&config)?;

    if cli.debug {
        log_interfaces();
    }

    let backend = PcapBackend::new(config.read_timeout_ms);
    let mut engine = CaptureEngine::start(
        &backend,
        &config.interface,
        &config.display_filter,
        log_reporter(),
    )
    .context("failed to start packet sniffer")?;

    tracing::info!("Capturing packets...");
    tracing::info!("Press Ctrl+C to stop");

    wait_for_shutdown_signal()?;

    tracing::info!("Stopping program...");
    engine.stop();
    engine.wait()?;
    Ok(())
}

#[cfg(target_os = "windows")]
fn ensure_driver(cfg: &Config) -> anyhow::Result<()> {
    let required = driver::DriverVersion::parse(config::MIN_REQUIRED_VERSION)
        .context("invalid minimum Npcap version")?;
    let resolver = driver::system_resolver(driver::default_payload(Some(cfg)));
    driver::ensure_ready(&resolver, required)?;
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn ensure_driver(_config: &Config) -> anyhow::Result<()> {
    tracing::debug!("Skipping Npcap check: libpcap is provided by the host");
    Ok(())
}

fn print_interfaces() -> anyhow::Result<()> {
    let devices =
        capture::pcap_backend::list_interfaces().context("failed to list network interfaces")?;
    for device in &devices {
        for line in capture::pcap_backend::describe_device(device) {
            println!("{line}");
        }
    }
    Ok(())
}

fn log_interfaces() {
    match capture::pcap_backend::list_interfaces() {
        Ok(devices) => {
            tracing::debug!("Available network interfaces:");
            for device in &devices {
                for line in capture::pcap_backend::describe_device(device) {
                    tracing::debug!("{line}");
                }
            }
        }
        Err(e) => tracing::warn!("Failed to list network interfaces: {e}"),
    }
}

fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    runtime.block_on(shutdown_signal())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(windows)]
    {
        let mut close = tokio::signal::windows::ctrl_close()?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = close.recv() => {}
        }
    }

    #[cfg(not(any(unix, windows)))]
    tokio::signal::ctrl_c().await?;

    tracing::debug!("Shutdown signal received");
    Ok(())
}

fn pause_for_ack() {
    println!("\nPress Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}
