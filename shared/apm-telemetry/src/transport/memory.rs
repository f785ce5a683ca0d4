//! In-memory transport

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SinkConfig;
use crate::item::TelemetryItem;
use crate::metrics::Counter;
use crate::sink::{Connector, Transport};
use crate::TelemetryError;

/// Records every item it receives, in order
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    items: Mutex<Vec<TelemetryItem>>,
    closed: AtomicBool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<TelemetryItem> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, item: TelemetryItem) {
        self.items.lock().push(item);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out one shared `InMemoryTransport`, or fails on purpose
#[derive(Debug)]
pub struct InMemoryConnector {
    transport: Arc<InMemoryTransport>,
    connects: Counter,
    last_config: Mutex<Option<SinkConfig>>,
    failure: Option<String>,
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self {
            transport: Arc::new(InMemoryTransport::new()),
            connects: Counter::new("in_memory_connects"),
            last_config: Mutex::new(None),
            failure: None,
        }
    }
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose every `connect` fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn transport(&self) -> Arc<InMemoryTransport> {
        self.transport.clone()
    }

    /// Number of `connect` calls, failed ones included
    pub fn connect_count(&self) -> u64 {
        self.connects.get()
    }

    pub fn last_config(&self) -> Option<SinkConfig> {
        self.last_config.lock().clone()
    }
}

impl Connector for InMemoryConnector {
    fn connect(&self, config: &SinkConfig) -> Result<Arc<dyn Transport>, TelemetryError> {
        self.connects.inc();
        *self.last_config.lock() = Some(config.clone());

        match &self.failure {
            Some(reason) => Err(TelemetryError::SinkInit(reason.clone())),
            None => Ok(self.transport.clone() as Arc<dyn Transport>),
        }
    }
}
