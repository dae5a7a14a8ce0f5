use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;

use sensor_node_ble::bluetooth::{warn_if_unprivileged, BluetoothServiceRestart, BluezConnector};
use sensor_node_ble::config::{DeviceConfig, LogVariant, LoggerConfig};
use sensor_node_ble::logger::{CsvLog, Logger, StopReason};

const SCAN_TIMEOUT_SECS: u64 = 30;

/// Monitor battery voltage over BLE and log it to CSV
#[derive(Parser, Debug)]
#[command(name = "battery-log", about = "Battery life logger")]
struct Args {
    /// Seconds between readings
    #[arg(short, long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Output CSV file
    #[arg(short, long, default_value = "battery_log.csv")]
    output: PathBuf,

    /// Stop when voltage drops below this many mV (0 = never)
    #[arg(long, default_value_t = 0)]
    cutoff: u64,

    /// Only log battery voltage, skip temperature, pressure and humidity
    #[arg(long)]
    battery_only: bool,
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let device = DeviceConfig::from_env(SCAN_TIMEOUT_SECS);

    let config = LoggerConfig {
        interval: Duration::from_secs(args.interval),
        output: args.output,
        cutoff_mv: args.cutoff,
        variant: if args.battery_only {
            LogVariant::BatteryOnly
        } else {
            LogVariant::Full
        },
    };

    let log = match CsvLog::open(&config.output, config.variant) {
        Ok(log) => log,
        Err(e) => {
            error!("Failed to open {}: {}", config.output.display(), e);
            return Err(e.into());
        }
    };

    warn_if_unprivileged();

    let characteristics = device.characteristics;
    let logger = Logger::new(
        BluezConnector::new(device),
        BluetoothServiceRestart,
        characteristics,
        config,
    );

    let summary = logger.run(log, shutdown_signal()).await;
    match summary.reason {
        StopReason::Cutoff { millivolts } => info!("Cutoff reached at {} mV", millivolts),
        StopReason::Interrupted => info!("Program terminated by user. Exiting gracefully."),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    run(Args::parse()).await
}
