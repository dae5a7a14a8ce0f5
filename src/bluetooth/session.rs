/// The seam between device logic and the Bluetooth stack
use async_trait::async_trait;
use bluer::Uuid;
use std::time::Duration;

use crate::error::BleError;

/// One open connection to the sensor node
///
/// A session lives for exactly one poll cycle or one diagnostic command.
/// Callers must `close` it on every path; implementations should also
/// release the connection when dropped without being closed.
#[async_trait]
pub trait GattSession: Send {
    async fn read(&mut self, characteristic: Uuid) -> Result<Vec<u8>, BleError>;

    async fn write(&mut self, characteristic: Uuid, value: &[u8]) -> Result<(), BleError>;

    async fn close(self);
}

/// Finds the configured peripheral and opens a [`GattSession`] to it
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: GattSession;

    /// Scan for the device and connect.
    ///
    /// A device that does not advertise within the scan window is reported
    /// as [`BleError::DiscoveryTimeout`].
    async fn open(&self) -> Result<Self::Session, BleError>;

    /// Wait, at most `limit`, for disconnects started by sessions that were
    /// dropped without `close`
    async fn settle(&self, _limit: Duration) {}
}
