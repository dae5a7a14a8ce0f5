//! Long-running battery and environment logger
//!
//! Each cycle scans for the node, connects, reads, disconnects and appends
//! one CSV row. Failed cycles are counted; the Bluetooth service is
//! restarted after repeated failures and every six hours.
pub mod csv_log;
pub mod policy;

use log::{error, info, warn};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::bluetooth::{Connector, GattSession, Recovery};
use crate::config::{Characteristics, LoggerConfig};
use crate::error::BleError;
use crate::models::{PollSample, SensorReading};
use crate::sensors::read_sample;
use crate::utils::{Clock, LocalClock};

pub use csv_log::CsvLog;
pub use policy::{PollState, RecoveryReason};

/// How long a stopped run waits for an interrupted connection to be torn down
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cutoff { millivolts: u64 },
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reason: StopReason,
    pub state: PollState,
    pub elapsed_minutes: f64,
    pub output: PathBuf,
}

pub struct Logger<C, R> {
    connector: C,
    recovery: R,
    characteristics: Characteristics,
    config: LoggerConfig,
    clock: Arc<dyn Clock>,
}

impl<C: Connector, R: Recovery> Logger<C, R> {
    pub fn new(
        connector: C,
        recovery: R,
        characteristics: Characteristics,
        config: LoggerConfig,
    ) -> Self {
        Logger {
            connector,
            recovery,
            characteristics,
            config,
            clock: Arc::new(LocalClock),
        }
    }

    /// Replace the host clock used for the timestamp column
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Poll until the cutoff is reached or `shutdown` resolves
    ///
    /// `shutdown` is checked at every wait inside a cycle. An open session is
    /// closed before returning, and the log file is closed and the run
    /// summary logged on both paths.
    pub async fn run<F>(&self, mut log: CsvLog, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let cutoff = if self.config.cutoff_mv != 0 {
            format!(", cutoff {} mV", self.config.cutoff_mv)
        } else {
            String::new()
        };
        info!(
            "Logging to {} every {}s{}",
            log.path().display(),
            self.config.interval.as_secs(),
            cutoff
        );

        tokio::pin!(shutdown);
        let mut state = PollState::new(Instant::now());

        let reason = self.poll_loop(&mut log, &mut state, shutdown.as_mut()).await;
        if reason == StopReason::Interrupted {
            info!("Stopped.");
        }
        self.connector.settle(DISCONNECT_GRACE).await;

        let output = log.path().to_path_buf();
        drop(log);

        let elapsed_minutes = state.elapsed_minutes(Instant::now());
        info!(
            "Total: {} readings over {:.1} minutes",
            state.reading_count, elapsed_minutes
        );
        info!("Log saved to {}", output.display());

        RunSummary {
            reason,
            state,
            elapsed_minutes,
            output,
        }
    }

    async fn poll_loop<F>(
        &self,
        log: &mut CsvLog,
        state: &mut PollState,
        mut shutdown: Pin<&mut F>,
    ) -> StopReason
    where
        F: Future<Output = ()>,
    {
        loop {
            let now = Instant::now();
            if let Some(reason) = state.recovery_due(now) {
                match reason {
                    RecoveryReason::ConsecutiveFailures(count) => {
                        warn!("{} consecutive failures, restarting bluetooth", count)
                    }
                    RecoveryReason::Periodic => info!("Periodic bluetooth restart"),
                }
                let recovered = tokio::select! {
                    biased;
                    _ = &mut shutdown => return StopReason::Interrupted,
                    recovered = self.recovery.recover() => recovered,
                };
                if let Err(e) = recovered {
                    error!("Failed to restart bluetooth: {}", e);
                }
                state.record_recovery(now);
            }

            let polled = match self.poll_once(&mut shutdown).await {
                Some(polled) => polled,
                None => return StopReason::Interrupted,
            };

            let delay = match polled {
                Ok(sample) => {
                    state.record_success();
                    let reading = SensorReading {
                        timestamp: self.clock.now(),
                        elapsed_minutes: state.elapsed_minutes(Instant::now()),
                        millivolts: sample.millivolts,
                        environment: sample.environment,
                    };

                    if let Err(e) = log.append(&reading) {
                        error!("Failed to write {}: {}", log.path().display(), e);
                    }
                    info!("{}", summary_line(state.reading_count, &reading));

                    if self.config.cutoff_reached(reading.millivolts) {
                        info!(
                            "Voltage {} mV below cutoff {} mV, stopping.",
                            reading.millivolts, self.config.cutoff_mv
                        );
                        return StopReason::Cutoff {
                            millivolts: reading.millivolts,
                        };
                    }

                    self.config.interval
                }
                Err(e) => {
                    let persistent = state.record_failure(e.is_characteristic_fault());
                    match &e {
                        BleError::DiscoveryTimeout { .. } => warn!(
                            "Device not found ({}), retrying...",
                            state.consecutive_errors
                        ),
                        _ => error!("BLE error ({}): {}", state.consecutive_errors, e),
                    }
                    if persistent {
                        error!(
                            "{} characteristic errors in a row, \
                             the firmware may not match the expected characteristic table",
                            state.consecutive_characteristic_errors
                        );
                    }

                    self.config.retry_delay()
                }
            };

            tokio::select! {
                biased;
                _ = &mut shutdown => return StopReason::Interrupted,
                _ = sleep(delay) => {}
            }
        }
    }

    /// One scoped session: connect, read, always close
    ///
    /// Returns `None` if `shutdown` resolved first. A session that was already
    /// open is still closed before returning.
    async fn poll_once<F>(
        &self,
        shutdown: &mut Pin<&mut F>,
    ) -> Option<Result<PollSample, BleError>>
    where
        F: Future<Output = ()>,
    {
        let opened = tokio::select! {
            biased;
            _ = &mut *shutdown => return None,
            opened = self.connector.open() => opened,
        };
        let mut session = match opened {
            Ok(session) => session,
            Err(e) => return Some(Err(e)),
        };

        let read = read_sample(&mut session, &self.characteristics, self.config.variant);
        let result = tokio::select! {
            biased;
            _ = &mut *shutdown => None,
            result = read => Some(result),
        };
        session.close().await;
        result
    }
}

fn summary_line(reading_count: u64, reading: &SensorReading) -> String {
    let mut line = format!(
        "#{}  {:6.1} min  {} mV  {:.3} V",
        reading_count,
        reading.elapsed_minutes,
        reading.millivolts,
        reading.volts()
    );
    if let Some(env) = &reading.environment {
        line.push_str(&format!(
            "  {:.1}°C  {:.1} hPa  {:.0}%",
            env.temperature_c, env.pressure_hpa, env.humidity_pct
        ));
    }
    line
}
