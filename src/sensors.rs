/// Reading decoded sensor values over an open session
use crate::bluetooth::GattSession;
use crate::codec;
use crate::config::{Characteristics, LogVariant};
use crate::error::BleError;
use crate::models::{EnvReading, PollSample};

pub async fn read_battery_mv<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
) -> Result<u64, BleError> {
    let data = session.read(chars.battery).await?;
    Ok(codec::decode_battery_mv(&data)?)
}

/// Read temperature, pressure and humidity, in that order
pub async fn read_environment<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
) -> Result<EnvReading, BleError> {
    let data = session.read(chars.temperature).await?;
    let temperature_c = codec::decode_temperature(&data)?;

    let data = session.read(chars.pressure).await?;
    let pressure_hpa = codec::decode_pressure_hpa(&data)?;

    let data = session.read(chars.humidity).await?;
    let humidity_pct = codec::decode_humidity(&data)?;

    Ok(EnvReading {
        temperature_c,
        pressure_hpa,
        humidity_pct,
    })
}

/// Everything one logger cycle needs from the device
pub async fn read_sample<S: GattSession>(
    session: &mut S,
    chars: &Characteristics,
    variant: LogVariant,
) -> Result<PollSample, BleError> {
    let millivolts = read_battery_mv(session, chars).await?;
    let environment = match variant {
        LogVariant::BatteryOnly => None,
        LogVariant::Full => Some(read_environment(session, chars).await?),
    };
    Ok(PollSample {
        millivolts,
        environment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::mock::MockSession;
    use std::collections::HashMap;

    fn node(chars: &Characteristics) -> HashMap<bluer::Uuid, Vec<u8>> {
        HashMap::from([
            (chars.battery, 2025u32.to_le_bytes().to_vec()),
            (chars.temperature, 22.5f32.to_le_bytes().to_vec()),
            (chars.pressure, 100_000.0f32.to_le_bytes().to_vec()),
            (chars.humidity, 40.0f32.to_le_bytes().to_vec()),
        ])
    }

    #[tokio::test]
    async fn test_read_full_sample() {
        let chars = Characteristics::default();
        let mut session = MockSession::new(node(&chars));

        let sample = read_sample(&mut session, &chars, LogVariant::Full).await.unwrap();
        assert_eq!(sample.millivolts, 4050);
        assert_eq!(
            sample.environment,
            Some(EnvReading {
                temperature_c: 22.5,
                pressure_hpa: 1000.0,
                humidity_pct: 40.0,
            })
        );
    }

    #[tokio::test]
    async fn test_battery_only_skips_environment() {
        let chars = Characteristics::default();
        let mut values = node(&chars);
        values.remove(&chars.temperature);
        let mut session = MockSession::new(values);

        let sample = read_sample(&mut session, &chars, LogVariant::BatteryOnly)
            .await
            .unwrap();
        assert_eq!(sample.millivolts, 4050);
        assert_eq!(sample.environment, None);
    }

    #[tokio::test]
    async fn test_short_payload_is_a_codec_error() {
        let chars = Characteristics::default();
        let mut values = node(&chars);
        values.insert(chars.humidity, vec![0x00, 0x01]);
        let mut session = MockSession::new(values);

        let err = read_sample(&mut session, &chars, LogVariant::Full)
            .await
            .unwrap_err();
        assert!(matches!(err, BleError::Codec(_)));
    }
}
