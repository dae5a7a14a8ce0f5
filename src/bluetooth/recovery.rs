/// Restarting the host Bluetooth service to clear stuck BlueZ state
use async_trait::async_trait;
use log::{info, warn};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{sleep, timeout, Duration};

use crate::error::RecoveryError;

const RESTART_TIMEOUT_SECS: u64 = 30;
const SETTLE_SECS: u64 = 3;

/// Corrective action run by the logger after repeated failures
#[async_trait]
pub trait Recovery: Send + Sync {
    async fn recover(&self) -> Result<(), RecoveryError>;
}

/// `sudo -n systemctl restart bluetooth`, then a short pause for BlueZ to settle
#[derive(Debug, Default)]
pub struct BluetoothServiceRestart;

#[async_trait]
impl Recovery for BluetoothServiceRestart {
    async fn recover(&self) -> Result<(), RecoveryError> {
        info!("Restarting bluetooth service...");

        let mut command = Command::new("sudo");
        command
            .args(["-n", "systemctl", "restart", "bluetooth"])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = timeout(Duration::from_secs(RESTART_TIMEOUT_SECS), command.output())
            .await
            .map_err(|_| RecoveryError::Timeout(RESTART_TIMEOUT_SECS))??;

        if !output.status.success() {
            return Err(RecoveryError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        sleep(Duration::from_secs(SETTLE_SECS)).await;
        info!("Bluetooth restarted.");
        Ok(())
    }
}

/// Whether the process can restart the Bluetooth service unattended
pub fn has_restart_privileges() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Warn at startup when the adapter restart will not be able to run
pub fn warn_if_unprivileged() {
    if !has_restart_privileges() {
        warn!("Not running as root: bluetooth auto-restart requires sudo");
    }
}
