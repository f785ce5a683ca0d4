//! APM Telemetry
//!
//! Client-side telemetry dispatch: a `Dispatcher` gates every call on the
//! configured enable flag, shapes logs, events and errors into sink items,
//! and hands them to a `SinkHandle` whose pre-send hook stamps the session
//! identity on every outgoing payload.

mod banner;
mod config;
mod dispatcher;
mod event;
mod identity;
mod item;
mod metrics;
mod panic;
mod sink;
mod tracing_setup;
pub mod transport;

pub use banner::Banner;
pub use config::{LogConfig, SinkConfig};
pub use dispatcher::{Dispatcher, DispatcherState, CUSTOM_EVENT_NAME};
pub use event::{
    attributes, AttributeValue, Attributes, Context, CustomError, EventKind, Severity,
    TelemetryEvent, UnknownSeverity,
};
pub use identity::IdentityContext;
pub use item::{
    AppMeta, Batch, EventRecord, ExceptionRecord, LogRecord, Meta, SdkMeta, SessionMeta,
    StackFrame, Stacktrace, TelemetryItem,
};
pub use metrics::{Counter, DispatchStats};
pub use panic::raise_unhandled_fault;
pub use sink::{BeforeSend, Connector, LogOptions, SinkHandle, Transport};
pub use tracing_setup::init_tracing;

/// Initialize process logging from the environment
pub fn init_logging() -> Result<(), TelemetryError> {
    init_tracing(&LogConfig::from_env())
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),

    #[error("Invalid telemetry endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Sink initialization failed: {0}")]
    SinkInit(String),
}
