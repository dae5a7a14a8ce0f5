/// Append-only CSV log of sensor readings
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::config::LogVariant;
use crate::models::SensorReading;
use crate::utils::format_datetime;

const BATTERY_COLUMNS: [&str; 4] = ["timestamp", "elapsed_min", "mv", "volts"];
const ENV_COLUMNS: [&str; 3] = ["temp_c", "press_hpa", "humidity"];

pub struct CsvLog {
    writer: csv::Writer<File>,
    path: PathBuf,
    variant: LogVariant,
}

impl CsvLog {
    /// Open `path` for appending, writing the header only into a new or
    /// empty file
    pub fn open(path: impl AsRef<Path>, variant: LogVariant) -> Result<Self, csv::Error> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut log = CsvLog {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file),
            path,
            variant,
        };

        if needs_header {
            log.writer.write_record(header(variant))?;
            log.writer.flush()?;
        }

        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one row and flush it to the file before returning
    pub fn append(&mut self, reading: &SensorReading) -> Result<(), csv::Error> {
        self.writer.write_record(row(reading, self.variant))?;
        self.writer.flush()?;
        Ok(())
    }
}

fn header(variant: LogVariant) -> Vec<&'static str> {
    match variant {
        LogVariant::BatteryOnly => BATTERY_COLUMNS.to_vec(),
        LogVariant::Full => BATTERY_COLUMNS.iter().chain(ENV_COLUMNS.iter()).copied().collect(),
    }
}

fn row(reading: &SensorReading, variant: LogVariant) -> Vec<String> {
    let mut fields = vec![
        format_datetime(&reading.timestamp),
        format!("{:.1}", reading.elapsed_minutes),
        reading.millivolts.to_string(),
        format!("{:.3}", reading.volts()),
    ];

    if variant == LogVariant::Full {
        match &reading.environment {
            Some(env) => fields.extend([
                format!("{:.2}", env.temperature_c),
                format!("{:.2}", env.pressure_hpa),
                format!("{:.1}", env.humidity_pct),
            ]),
            None => fields.extend(std::iter::repeat(String::new()).take(ENV_COLUMNS.len())),
        }
    }

    fields
}
