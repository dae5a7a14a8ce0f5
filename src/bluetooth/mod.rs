pub mod bluez;
pub mod recovery;
pub mod session;

#[cfg(test)]
pub mod mock;

pub use bluez::{BluezConnector, BluezSession};
pub use recovery::{warn_if_unprivileged, BluetoothServiceRestart, Recovery};
pub use session::{Connector, GattSession};
