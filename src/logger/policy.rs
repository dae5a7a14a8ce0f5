/// Poll bookkeeping and the adapter-restart policy
use tokio::time::{Duration, Instant};

/// Restart the adapter after this many failed cycles in a row
pub const FAILURE_THRESHOLD: u32 = 3;
/// Restart the adapter at least this often, even when polls succeed
pub const MAX_RECOVERY_INTERVAL: Duration = Duration::from_secs(6 * 3600);
/// Characteristic/codec failures in a row that point at a firmware mismatch
pub const CHARACTERISTIC_FAULT_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryReason {
    ConsecutiveFailures(u32),
    Periodic,
}

/// In-memory state of one logger run
#[derive(Debug, Clone)]
pub struct PollState {
    pub started: Instant,
    pub reading_count: u64,
    pub consecutive_errors: u32,
    pub consecutive_characteristic_errors: u32,
    /// Start of the current recovery period; the run start until the first
    /// restart, so the periodic branch never fires on the first cycle
    pub last_recovery: Instant,
}

impl PollState {
    pub fn new(started: Instant) -> Self {
        PollState {
            started,
            reading_count: 0,
            consecutive_errors: 0,
            consecutive_characteristic_errors: 0,
            last_recovery: started,
        }
    }

    /// Decide, before a poll, whether the adapter should be restarted first
    pub fn recovery_due(&self, now: Instant) -> Option<RecoveryReason> {
        if self.consecutive_errors >= FAILURE_THRESHOLD {
            Some(RecoveryReason::ConsecutiveFailures(self.consecutive_errors))
        } else if now.saturating_duration_since(self.last_recovery) > MAX_RECOVERY_INTERVAL {
            Some(RecoveryReason::Periodic)
        } else {
            None
        }
    }

    /// Start a new recovery period, whether or not the restart succeeded
    pub fn record_recovery(&mut self, now: Instant) {
        self.last_recovery = now;
    }

    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
        self.consecutive_characteristic_errors = 0;
        self.reading_count += 1;
    }

    /// Count a failed cycle; returns true when characteristic faults have
    /// piled up far enough to report
    pub fn record_failure(&mut self, characteristic_fault: bool) -> bool {
        self.consecutive_errors += 1;
        if characteristic_fault {
            self.consecutive_characteristic_errors += 1;
            self.consecutive_characteristic_errors % CHARACTERISTIC_FAULT_THRESHOLD == 0
        } else {
            self.consecutive_characteristic_errors = 0;
            false
        }
    }

    pub fn elapsed_minutes(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started).as_secs_f64() / 60.0
    }
}
