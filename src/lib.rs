//! Tools for the ESP32-C3 battery/environment sensor node over Bluetooth Low Energy
//!
//! The node exposes a handful of fixed GATT characteristics: a scratch data
//! slot, battery millivolts, temperature, pressure, humidity, a UNIX clock
//! and a quarter-hour timezone. Two binaries are built on this library:
//!
//! - `battery-log` polls the node on an interval and appends readings to a
//!   CSV file, restarting the host Bluetooth service when BlueZ gets stuck.
//! - `ble-test` runs one diagnostic command (self-test, clock, timezone or
//!   sensor read) and exits.
//!
//! Every operation opens its own connection and closes it before returning;
//! connections are never reused between readings.

pub mod bluetooth;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logger;
pub mod models;
pub mod sensors;
pub mod timezone;
pub mod utils;

pub use error::{BleError, CodecError, DiagError, RecoveryError, TimezoneParseError};
pub use timezone::TimezoneOffset;
