use bluer::Uuid;
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DEVICE_NAME: &str = "ESP32-C3-BLE";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// GATT characteristic identifiers exposed by the sensor node firmware
///
/// These are a fixed contract with the firmware; all of them share the
/// `deadbeef-10NN-2000-3000-aabbccddeeff` pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Characteristics {
    pub data: Uuid,
    pub pressure: Uuid,
    pub temperature: Uuid,
    pub humidity: Uuid,
    pub clock: Uuid,
    pub timezone: Uuid,
    pub battery: Uuid,
}

impl Default for Characteristics {
    fn default() -> Self {
        Characteristics {
            data: Uuid::from_u128(0xdeadbeef_1001_2000_3000_aabbccddeeff),
            pressure: Uuid::from_u128(0xdeadbeef_1002_2000_3000_aabbccddeeff),
            temperature: Uuid::from_u128(0xdeadbeef_1003_2000_3000_aabbccddeeff),
            humidity: Uuid::from_u128(0xdeadbeef_1004_2000_3000_aabbccddeeff),
            clock: Uuid::from_u128(0xdeadbeef_1005_2000_3000_aabbccddeeff),
            timezone: Uuid::from_u128(0xdeadbeef_1006_2000_3000_aabbccddeeff),
            battery: Uuid::from_u128(0xdeadbeef_1007_2000_3000_aabbccddeeff),
        }
    }
}

/// Which peripheral to look for and how long to wait for it
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub name: String,
    pub scan_timeout: Duration,
    pub connect_timeout: Duration,
    pub characteristics: Characteristics,
}

impl DeviceConfig {
    /// Build the device configuration from the environment (and `.env`)
    ///
    /// Recognised variables:
    /// * `BLE_DEVICE_NAME` - advertised name to scan for
    /// * `BLE_SCAN_TIMEOUT_SECS` - scan window, defaults to `default_scan_secs`
    /// * `BLE_CONNECT_TIMEOUT_SECS` - connect timeout, defaults to 30
    pub fn from_env(default_scan_secs: u64) -> Self {
        dotenv::dotenv().ok();

        let name = env::var("BLE_DEVICE_NAME").unwrap_or_else(|_| DEFAULT_DEVICE_NAME.to_string());
        let scan_secs = secs_from_env("BLE_SCAN_TIMEOUT_SECS", default_scan_secs);
        let connect_secs = secs_from_env("BLE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS);

        info!(
            "Device {:?}: scan timeout {}s, connect timeout {}s",
            name, scan_secs, connect_secs
        );

        DeviceConfig {
            name,
            scan_timeout: Duration::from_secs(scan_secs),
            connect_timeout: Duration::from_secs(connect_secs),
            characteristics: Characteristics::default(),
        }
    }
}

fn secs_from_env(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(value) => match value.trim().parse() {
            Ok(secs) => secs,
            Err(_) => {
                warn!("Ignoring {}={:?}, using {}s", key, value, default);
                default
            }
        },
        Err(_) => default,
    }
}

/// Which columns the logger reads and records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogVariant {
    /// Battery voltage only
    BatteryOnly,
    /// Battery plus temperature, pressure and humidity
    Full,
}

/// Settings for the battery logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub interval: Duration,
    pub output: PathBuf,
    /// Stop once a reading drops below this many millivolts; 0 disables
    pub cutoff_mv: u64,
    pub variant: LogVariant,
}

impl LoggerConfig {
    /// Back-off used after a failed cycle
    pub fn retry_delay(&self) -> Duration {
        self.interval.min(Duration::from_secs(60))
    }

    pub fn cutoff_reached(&self, millivolts: u64) -> bool {
        self.cutoff_mv != 0 && millivolts < self.cutoff_mv
    }
}
