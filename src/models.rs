use time::OffsetDateTime;

/// Environmental sensor values read from the node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvReading {
    pub temperature_c: f32,
    pub pressure_hpa: f32,
    pub humidity_pct: f32,
}

/// One completed poll, as written to the log
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub timestamp: OffsetDateTime,
    pub elapsed_minutes: f64,
    pub millivolts: u64,
    /// Absent when logging battery voltage only
    pub environment: Option<EnvReading>,
}

impl SensorReading {
    pub fn volts(&self) -> f64 {
        self.millivolts as f64 / 1000.0
    }
}

/// What a single poll cycle reads from the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSample {
    pub millivolts: u64,
    pub environment: Option<EnvReading>,
}
