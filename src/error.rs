/// Error types shared by the codec, the BLE session layer, the logger and the
/// diagnostic commands
use bluer::Uuid;
use thiserror::Error;

/// A characteristic payload did not have the fixed width its field requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("wrong length for {field}: expected {expected} bytes, got {actual}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimezoneParseError {
    #[error("empty timezone offset")]
    Empty,

    #[error("invalid timezone offset {0:?}, expected +H or +H:MM")]
    Malformed(String),

    #[error("minutes must be between 0 and 59, got {0}")]
    MinutesOutOfRange(i32),

    #[error("offset of {0} quarter-hours does not fit in a signed byte")]
    OutOfRange(i32),
}

/// Failures of a single discover/connect/read/write sequence.
#[derive(Error, Debug)]
pub enum BleError {
    #[error("device {name:?} not found within {timeout_secs}s")]
    DiscoveryTimeout { name: String, timeout_secs: u64 },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("characteristic {uuid}: {reason}")]
    Characteristic { uuid: Uuid, reason: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("bluetooth stack error: {0}")]
    Stack(#[from] bluer::Error),
}

impl BleError {
    /// Errors that point at the characteristic table or payload layout
    /// rather than at the radio.
    pub fn is_characteristic_fault(&self) -> bool {
        matches!(self, BleError::Characteristic { .. } | BleError::Codec(_))
    }
}

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("failed to run restart command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("restart command timed out after {0}s")]
    Timeout(u64),

    #[error("restart command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

#[derive(Error, Debug)]
pub enum DiagError {
    #[error(transparent)]
    Ble(#[from] BleError),

    #[error("mismatch: wrote {expected:?}, read back {actual:?}")]
    Mismatch { expected: Vec<u8>, actual: Vec<u8> },

    #[error("payload is {0} bytes, the device stores at most 64")]
    PayloadTooLong(usize),

    #[error("device reported an unrepresentable timestamp {0}")]
    InvalidTimestamp(i64),
}
