/// Fixed-width little-endian payload codec for the sensor node's characteristics
use crate::error::CodecError;
use crate::timezone::TimezoneOffset;

/// The battery is sensed through a 1:1 resistive divider
pub const VOLTAGE_DIVIDER: u64 = 2;

/// Copy a payload into a fixed-size array, rejecting any other length
fn fixed<const N: usize>(field: &'static str, data: &[u8]) -> Result<[u8; N], CodecError> {
    data.try_into().map_err(|_| CodecError::WrongLength {
        field,
        expected: N,
        actual: data.len(),
    })
}

/// Decode the battery characteristic into millivolts at the battery terminals
///
/// The firmware reports the millivolts seen at the ADC pin as a 4-byte
/// unsigned little-endian integer. That pin sits behind a voltage divider, so
/// the raw value is scaled by [`VOLTAGE_DIVIDER`].
pub fn decode_battery_mv(data: &[u8]) -> Result<u64, CodecError> {
    let raw = u32::from_le_bytes(fixed("battery", data)?);
    Ok(u64::from(raw) * VOLTAGE_DIVIDER)
}

fn decode_f32(field: &'static str, data: &[u8]) -> Result<f32, CodecError> {
    Ok(f32::from_le_bytes(fixed(field, data)?))
}

/// Temperature in °C (4-byte IEEE-754 little-endian)
pub fn decode_temperature(data: &[u8]) -> Result<f32, CodecError> {
    decode_f32("temperature", data)
}

/// Pressure in hPa; the device transmits pascals
pub fn decode_pressure_hpa(data: &[u8]) -> Result<f32, CodecError> {
    Ok(decode_f32("pressure", data)? / 100.0)
}

/// Relative humidity in %
pub fn decode_humidity(data: &[u8]) -> Result<f32, CodecError> {
    decode_f32("humidity", data)
}

/// Device clock: 8-byte signed little-endian UNIX seconds
pub fn encode_clock(unix_seconds: i64) -> [u8; 8] {
    unix_seconds.to_le_bytes()
}

pub fn decode_clock(data: &[u8]) -> Result<i64, CodecError> {
    Ok(i64::from_le_bytes(fixed("clock", data)?))
}

/// Device timezone: a single signed byte of quarter-hours
pub fn encode_timezone(offset: TimezoneOffset) -> [u8; 1] {
    offset.quarter_hours().to_le_bytes()
}

pub fn decode_timezone(data: &[u8]) -> Result<TimezoneOffset, CodecError> {
    let quarter_hours = i8::from_le_bytes(fixed("timezone", data)?);
    Ok(TimezoneOffset::from_quarter_hours(quarter_hours))
}
