/// One-shot diagnostic commands against the sensor node
///
/// Every command works on an already open session and returns what it
/// observed; printing is left to the caller.
use time::OffsetDateTime;

use crate::bluetooth::{Connector, GattSession};
use crate::codec;
use crate::config::Characteristics;
use crate::error::{BleError, DiagError};
use crate::models::EnvReading;
use crate::sensors;
use crate::timezone::TimezoneOffset;

pub const DEFAULT_TEST_PAYLOAD: &[u8] = b"Hello BLE!";
/// Size of the firmware's buffer behind the data characteristic
pub const MAX_DATA_LEN: usize = 64;

/// Requested vs. observed device clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockCheck {
    /// What was written, or the host time for a plain read
    pub expected: i64,
    pub device: i64,
}

impl ClockCheck {
    /// Device minus expected, in seconds
    pub fn delta(&self) -> i64 {
        self.device - self.expected
    }
}

/// The device clock together with its configured timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceClock {
    pub unix_seconds: i64,
    pub timezone: TimezoneOffset,
}

impl DeviceClock {
    /// Wall-clock time on the device
    ///
    /// The offset is applied to the instant and the result carries a UTC
    /// offset, since the device range (±32 h) exceeds what `UtcOffset`
    /// can hold. Pair it with `timezone` for display.
    pub fn local(&self) -> Result<OffsetDateTime, DiagError> {
        self.unix_seconds
            .checked_add(self.timezone.total_seconds())
            .and_then(|shifted| OffsetDateTime::from_unix_timestamp(shifted).ok())
            .ok_or(DiagError::InvalidTimestamp(self.unix_seconds))
    }
}

/// Open a session, run `command`, and close the session on every path
pub async fn with_session<C, T, F>(connector: &C, command: F) -> Result<T, DiagError>
where
    C: Connector,
    F: for<'s> FnOnce(
        &'s mut C::Session,
    ) -> futures_util::future::BoxFuture<'s, Result<T, DiagError>>,
{
    let mut session = connector.open().await?;
    let result = command(&mut session).await;
    session.close().await;
    result
}

/// Write `payload` to the data characteristic and check it reads back unchanged
pub async fn self_test<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
    payload: &[u8],
) -> Result<Vec<u8>, DiagError> {
    check_payload(payload)?;
    session.write(chars.data, payload).await?;
    let readback = session.read(chars.data).await?;
    if readback != payload {
        return Err(DiagError::Mismatch {
            expected: payload.to_vec(),
            actual: readback,
        });
    }
    Ok(readback)
}

/// Reject payloads the firmware would refuse, before connecting
pub fn check_payload(payload: &[u8]) -> Result<(), DiagError> {
    if payload.len() > MAX_DATA_LEN {
        return Err(DiagError::PayloadTooLong(payload.len()));
    }
    Ok(())
}

pub async fn set_time<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
    unix_seconds: i64,
) -> Result<ClockCheck, DiagError> {
    session
        .write(chars.clock, &codec::encode_clock(unix_seconds))
        .await?;
    let device = read_clock(session, chars).await?;
    Ok(ClockCheck {
        expected: unix_seconds,
        device,
    })
}

pub async fn get_time<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
    host_unix_seconds: i64,
) -> Result<ClockCheck, DiagError> {
    let device = read_clock(session, chars).await?;
    Ok(ClockCheck {
        expected: host_unix_seconds,
        device,
    })
}

/// Write the timezone and verify the device stored exactly that value
pub async fn set_timezone<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
    offset: TimezoneOffset,
) -> Result<TimezoneOffset, DiagError> {
    let payload = codec::encode_timezone(offset);
    session.write(chars.timezone, &payload).await?;
    let readback = read_timezone(session, chars).await?;
    if readback != offset {
        return Err(DiagError::Mismatch {
            expected: payload.to_vec(),
            actual: codec::encode_timezone(readback).to_vec(),
        });
    }
    Ok(readback)
}

pub async fn get_timezone<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
) -> Result<TimezoneOffset, DiagError> {
    read_timezone(session, chars).await
}

pub async fn local_time<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
) -> Result<DeviceClock, DiagError> {
    let unix_seconds = read_clock(session, chars).await?;
    let timezone = read_timezone(session, chars).await?;
    Ok(DeviceClock {
        unix_seconds,
        timezone,
    })
}

/// Set both clock and timezone from the host, then read them back
pub async fn set_local<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
    host: DeviceClock,
) -> Result<DeviceClock, DiagError> {
    session
        .write(chars.clock, &codec::encode_clock(host.unix_seconds))
        .await?;
    session
        .write(chars.timezone, &codec::encode_timezone(host.timezone))
        .await?;
    local_time(session, chars).await
}

pub async fn read_environment<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
) -> Result<EnvReading, DiagError> {
    Ok(sensors::read_environment(session, chars).await?)
}

async fn read_clock<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
) -> Result<i64, DiagError> {
    let data = session.read(chars.clock).await?;
    Ok(codec::decode_clock(&data).map_err(BleError::from)?)
}

async fn read_timezone<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
) -> Result<TimezoneOffset, DiagError> {
    let data = session.read(chars.timezone).await?;
    Ok(codec::decode_timezone(&data).map_err(BleError::from)?)
}
