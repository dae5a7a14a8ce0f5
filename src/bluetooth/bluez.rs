/// BlueZ-backed device discovery and GATT access
use async_trait::async_trait;
use bluer::gatt::remote::Characteristic;
use bluer::{Adapter, AdapterEvent, Device, Uuid};
use futures_util::future::join_all;
use futures_util::StreamExt;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

use crate::bluetooth::session::{Connector, GattSession};
use crate::config::DeviceConfig;
use crate::error::BleError;

const SERVICE_RESOLVE_POLL_MS: u64 = 100;

type PendingDisconnects = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Opens connections to the configured peripheral through the default adapter
pub struct BluezConnector {
    config: DeviceConfig,
    pending: PendingDisconnects,
}

/// A discovered device is only usable if it carries the wanted name and is
/// in range right now. BlueZ also reports cached devices, which have no RSSI.
fn is_advertising(device_name: Option<&str>, rssi: Option<i16>, wanted: &str) -> bool {
    device_name == Some(wanted) && rssi.is_some()
}

impl BluezConnector {
    pub fn new(config: DeviceConfig) -> Self {
        BluezConnector {
            config,
            pending: PendingDisconnects::default(),
        }
    }

    async fn default_adapter(session: &bluer::Session) -> Result<Adapter, BleError> {
        let adapter = session.default_adapter().await?;

        // Ensure Bluetooth adapter is powered on
        adapter.set_powered(true).await?;

        // Low Energy only; the node never advertises over BR/EDR
        let filter = bluer::DiscoveryFilter {
            transport: bluer::DiscoveryTransport::Le,
            duplicate_data: false,
            ..Default::default()
        };
        if let Err(e) = adapter.set_discovery_filter(filter).await {
            warn!("Failed to set discovery filter: {}", e);
        }

        Ok(adapter)
    }

    /// Watch discovery events until a device advertising `name` shows up
    ///
    /// Known devices are reported first and again whenever their properties
    /// change, so a cached node is matched as soon as it is heard. Discovery
    /// stops when the event stream is dropped on return.
    async fn find_by_name(adapter: &Adapter, name: &str) -> Result<Option<Device>, BleError> {
        let mut events = adapter.discover_devices_with_changes().await?;

        while let Some(event) = events.next().await {
            if let AdapterEvent::DeviceAdded(addr) = event {
                let device = match adapter.device(addr) {
                    Ok(device) => device,
                    Err(_) => continue,
                };
                let device_name = match device.name().await {
                    Ok(device_name) => device_name,
                    Err(e) => {
                        debug!("Failed to get name of {}: {}", addr, e);
                        continue;
                    }
                };
                let rssi = device.rssi().await.unwrap_or(None);
                if is_advertising(device_name.as_deref(), rssi, name) {
                    debug!("Found {} [{}] at {:?} dBm", name, addr, rssi);
                    return Ok(Some(device));
                }
            }
        }

        Ok(None)
    }

    async fn connect(device: &Device) -> Result<(), BleError> {
        device
            .connect()
            .await
            .map_err(|e| BleError::Connection(e.to_string()))?;

        // Characteristics are only listed once BlueZ has walked the GATT table
        while !device.is_services_resolved().await? {
            sleep(Duration::from_millis(SERVICE_RESOLVE_POLL_MS)).await;
        }

        Ok(())
    }
}

#[async_trait]
impl Connector for BluezConnector {
    type Session = BluezSession;

    async fn open(&self) -> Result<BluezSession, BleError> {
        let session = bluer::Session::new().await?;
        let adapter = Self::default_adapter(&session).await?;

        let not_found = || BleError::DiscoveryTimeout {
            name: self.config.name.clone(),
            timeout_secs: self.config.scan_timeout.as_secs(),
        };
        let device = timeout(
            self.config.scan_timeout,
            Self::find_by_name(&adapter, &self.config.name),
        )
        .await
        .map_err(|_| not_found())??
        .ok_or_else(not_found)?;

        // From here on the guard disconnects on every exit path
        let mut guard = BluezSession {
            _session: session,
            device,
            characteristics: HashMap::new(),
            open: true,
            pending: self.pending.clone(),
        };

        let connected = timeout(self.config.connect_timeout, Self::connect(&guard.device)).await;
        match connected {
            Ok(Ok(())) => {
                debug!("Connected to {}", guard.device.address());
                Ok(guard)
            }
            Ok(Err(e)) => {
                guard.disconnect().await;
                Err(e)
            }
            Err(_) => {
                guard.disconnect().await;
                Err(BleError::Connection(format!(
                    "timed out after {}s",
                    self.config.connect_timeout.as_secs()
                )))
            }
        }
    }

    async fn settle(&self, limit: Duration) {
        let handles: Vec<JoinHandle<()>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }
        debug!("Waiting for {} background disconnect(s)", handles.len());
        if timeout(limit, join_all(handles)).await.is_err() {
            warn!("Background disconnect did not finish within {}s", limit.as_secs());
        }
    }
}

/// A connected peripheral; disconnects on `close` or when dropped
pub struct BluezSession {
    _session: bluer::Session,
    device: Device,
    characteristics: HashMap<Uuid, Characteristic>,
    open: bool,
    pending: PendingDisconnects,
}

impl BluezSession {
    async fn characteristic(&mut self, uuid: Uuid) -> Result<Characteristic, BleError> {
        if let Some(characteristic) = self.characteristics.get(&uuid) {
            return Ok(characteristic.clone());
        }

        for service in self.device.services().await? {
            for characteristic in service.characteristics().await? {
                let char_uuid = characteristic.uuid().await?;
                self.characteristics.insert(char_uuid, characteristic);
            }
        }

        self.characteristics
            .get(&uuid)
            .cloned()
            .ok_or_else(|| BleError::Characteristic {
                uuid,
                reason: "not exposed by the device".to_string(),
            })
    }

    async fn disconnect(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = self.device.disconnect().await {
            warn!("Failed to disconnect {}: {}", self.device.address(), e);
        }
    }
}

#[async_trait]
impl GattSession for BluezSession {
    async fn read(&mut self, uuid: Uuid) -> Result<Vec<u8>, BleError> {
        let characteristic = self.characteristic(uuid).await?;
        characteristic
            .read()
            .await
            .map_err(|e| BleError::Characteristic {
                uuid,
                reason: format!("read failed: {}", e),
            })
    }

    async fn write(&mut self, uuid: Uuid, value: &[u8]) -> Result<(), BleError> {
        let characteristic = self.characteristic(uuid).await?;
        characteristic
            .write(value)
            .await
            .map_err(|e| BleError::Characteristic {
                uuid,
                reason: format!("write failed: {}", e),
            })
    }

    async fn close(self) {
        let mut session = self;
        session.disconnect().await;
    }
}

impl Drop for BluezSession {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        // Dropped mid-operation (cancelled): finish the disconnect in the
        // background and let `BluezConnector::settle` wait for it
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let device = self.device.clone();
            let task = runtime.spawn(async move {
                if let Err(e) = device.disconnect().await {
                    debug!("Background disconnect failed: {}", e);
                }
            });
            if let Ok(mut pending) = self.pending.lock() {
                pending.retain(|handle| !handle.is_finished());
                pending.push(task);
            }
        }
    }
}
