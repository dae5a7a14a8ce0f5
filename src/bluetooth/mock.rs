/// In-memory stand-ins for the BlueZ connector and the recovery action
use async_trait::async_trait;
use bluer::Uuid;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bluetooth::recovery::Recovery;
use crate::bluetooth::session::{Connector, GattSession};
use crate::error::{BleError, RecoveryError};

pub type Store = Arc<Mutex<HashMap<Uuid, Vec<u8>>>>;

/// Scripted result of one `open` call
pub enum MockOpen {
    /// Connect and serve these characteristic values
    Values(HashMap<Uuid, Vec<u8>>),
    /// Connect and serve these values, taking `delay` for every read
    Slow {
        values: HashMap<Uuid, Vec<u8>>,
        delay: Duration,
    },
    /// Connect against the shared characteristic store
    Shared,
    /// Fail to connect with this error
    Fail(BleError),
}

#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<MockOpen>>,
    pub store: Store,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector that always connects to the same device state
    pub fn with_values(values: HashMap<Uuid, Vec<u8>>) -> Self {
        let connector = Self::default();
        *connector.store.lock().unwrap() = values;
        connector
    }

    pub fn push(&self, step: MockOpen) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession, BleError> {
        let step = self.script.lock().unwrap().pop_front().unwrap_or(MockOpen::Shared);
        let (store, read_delay) = match step {
            MockOpen::Values(values) => (Arc::new(Mutex::new(values)), None),
            MockOpen::Slow { values, delay } => (Arc::new(Mutex::new(values)), Some(delay)),
            MockOpen::Shared => (self.store.clone(), None),
            MockOpen::Fail(e) => return Err(e),
        };
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            store,
            closed: self.closed.clone(),
            read_delay,
            echo_override: None,
        })
    }
}

pub struct MockSession {
    store: Store,
    closed: Arc<AtomicUsize>,
    read_delay: Option<Duration>,
    /// Value returned by every read, whatever was written
    pub echo_override: Option<Vec<u8>>,
}

impl MockSession {
    pub fn new(values: HashMap<Uuid, Vec<u8>>) -> Self {
        MockSession {
            store: Arc::new(Mutex::new(values)),
            closed: Arc::new(AtomicUsize::new(0)),
            read_delay: None,
            echo_override: None,
        }
    }
}

#[async_trait]
impl GattSession for MockSession {
    async fn read(&mut self, uuid: Uuid) -> Result<Vec<u8>, BleError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(value) = &self.echo_override {
            return Ok(value.clone());
        }
        self.store
            .lock()
            .unwrap()
            .get(&uuid)
            .cloned()
            .ok_or_else(|| BleError::Characteristic {
                uuid,
                reason: "not exposed by the device".to_string(),
            })
    }

    async fn write(&mut self, uuid: Uuid, value: &[u8]) -> Result<(), BleError> {
        self.store.lock().unwrap().insert(uuid, value.to_vec());
        Ok(())
    }

    async fn close(self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts recoveries; optionally fails every one of them
#[derive(Default)]
pub struct MockRecovery {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl MockRecovery {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recovery for MockRecovery {
    async fn recover(&self) -> Result<(), RecoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RecoveryError::Timeout(30));
        }
        Ok(())
    }
}
