//! Sink handle and the transport seam
//!
//! A `SinkHandle` owns one transport plus the pre-send hook. Every push goes
//! through the hook exactly once before reaching the transport.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::SinkConfig;
use crate::event::{Attributes, Context, Severity};
use crate::item::{EventRecord, ExceptionRecord, LogRecord, TelemetryItem};
use crate::TelemetryError;

/// Hook run on every item before it is handed to the transport.
/// Returning `None` drops the item.
pub type BeforeSend = Arc<dyn Fn(TelemetryItem) -> Option<TelemetryItem> + Send + Sync>;

/// Delivery half of a sink
pub trait Transport: Send + Sync {
    /// Queue an item for delivery. Must not block on the network.
    fn send(&self, item: TelemetryItem);

    /// Flush what is queued and stop accepting items.
    fn close(&self) {}
}

/// Sets up a transport for a sink
pub trait Connector: Send + Sync {
    fn connect(&self, config: &SinkConfig) -> Result<Arc<dyn Transport>, TelemetryError>;
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub level: Severity,
    pub context: Option<Context>,
}

/// Live telemetry sink, cheap to clone
#[derive(Clone)]
pub struct SinkHandle {
    inner: Arc<SinkInner>,
}

pub(crate) struct SinkInner {
    config: SinkConfig,
    transport: Arc<dyn Transport>,
    before_send: Option<BeforeSend>,
}

impl SinkInner {
    pub(crate) fn submit(&self, item: TelemetryItem) {
        let item = match &self.before_send {
            Some(hook) => match hook(item) {
                Some(item) => item,
                None => {
                    debug!("Item dropped by pre-send hook");
                    return;
                }
            },
            None => item,
        };
        self.transport.send(item);
    }
}

impl SinkHandle {
    pub fn initialize(
        config: SinkConfig,
        connector: &dyn Connector,
        before_send: Option<BeforeSend>,
    ) -> Result<Self, TelemetryError> {
        let transport = connector.connect(&config)?;

        info!(
            url = %config.url,
            app = %config.app.name,
            session = %config.session_id,
            "Telemetry sink initialized"
        );

        Ok(Self {
            inner: Arc::new(SinkInner {
                config,
                transport,
                before_send,
            }),
        })
    }

    pub fn config(&self) -> &SinkConfig {
        &self.inner.config
    }

    /// Push a log line. Multiple messages are joined with a space.
    pub fn push_log(&self, messages: &[&str], options: LogOptions) {
        self.inner.submit(TelemetryItem::Log(LogRecord {
            message: messages.join(" "),
            level: options.level,
            context: options.context.unwrap_or_default(),
            timestamp: Utc::now(),
        }));
    }

    pub fn push_event(&self, name: &str, attributes: Option<Attributes>, domain: Option<&str>) {
        self.inner.submit(TelemetryItem::Event(EventRecord {
            name: name.to_string(),
            domain: domain.map(str::to_string),
            attributes: attributes.unwrap_or_default(),
            context: Context::new(),
            timestamp: Utc::now(),
        }));
    }

    pub fn push_error(&self, error: ExceptionRecord) {
        self.inner.submit(TelemetryItem::Exception(error));
    }

    /// Report panics anywhere in the process through this sink.
    pub fn capture_panics(&self) {
        crate::panic::install_panic_capture(Arc::downgrade(&self.inner));
    }

    pub fn close(&self) {
        self.inner.transport.close();
    }
}

impl fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkHandle")
            .field("config", &self.inner.config)
            .field("before_send", &self.inner.before_send.is_some())
            .finish()
    }
}
