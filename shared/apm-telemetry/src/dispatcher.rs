//! Telemetry dispatcher
//!
//! Single point of control over whether telemetry leaves the process. Every
//! operation is gated on the configured enable flag and never fails: with
//! telemetry disabled calls are silent no-ops, and with no live sink they are
//! logged and dropped.

use std::io;
use std::sync::Arc;

use apm_core::Configuration;
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::banner::Banner;
use crate::config::SinkConfig;
use crate::event::{
    AttributeValue, Attributes, Context, CustomError, EventKind, Severity, TelemetryEvent,
};
use crate::identity::IdentityContext;
use crate::item::ExceptionRecord;
use crate::metrics::DispatchStats;
use crate::panic::raise_unhandled_fault;
use crate::sink::{Connector, LogOptions, SinkHandle};

/// Event name used for the demo's custom events
pub const CUSTOM_EVENT_NAME: &str = "custom-event";
const AUTH_EVENT_NAME: &str = "user_authenticated";
const AUTH_DOMAIN: &str = "auth";

/// Observable dispatcher lifecycle
///
/// `Uninitialized → Initializing → Active | Dormant | Unavailable`. The last
/// three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Uninitialized,
    Initializing,
    /// Telemetry enabled, sink live
    Active,
    /// Telemetry disabled, every call is a no-op
    Dormant,
    /// Telemetry enabled but the sink could not be set up
    Unavailable,
}

enum Lifecycle {
    Uninitialized,
    Initializing,
    Active(SinkHandle),
    Dormant,
    Unavailable,
}

impl Lifecycle {
    fn state(&self) -> DispatcherState {
        match self {
            Self::Uninitialized => DispatcherState::Uninitialized,
            Self::Initializing => DispatcherState::Initializing,
            Self::Active(_) => DispatcherState::Active,
            Self::Dormant => DispatcherState::Dormant,
            Self::Unavailable => DispatcherState::Unavailable,
        }
    }

    fn sink(&self) -> Option<SinkHandle> {
        match self {
            Self::Active(sink) => Some(sink.clone()),
            _ => None,
        }
    }
}

pub struct Dispatcher {
    config: Arc<Configuration>,
    connector: Arc<dyn Connector>,
    identity: IdentityContext,
    capture_panics: bool,
    lifecycle: RwLock<Lifecycle>,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(config: Arc<Configuration>, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            identity: IdentityContext::default(),
            capture_panics: false,
            lifecycle: RwLock::new(Lifecycle::Uninitialized),
            stats: DispatchStats::default(),
        }
    }

    /// Replace the identity stamped on every payload.
    pub fn with_identity(mut self, identity: IdentityContext) -> Self {
        self.identity = identity;
        self
    }

    /// Report process panics through the sink once it is live.
    ///
    /// Panic hooks are process-wide, so only enable this for the dispatcher
    /// owned by the application's startup wiring.
    pub fn with_panic_capture(mut self, enabled: bool) -> Self {
        self.capture_panics = enabled;
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.telemetry().enabled()
    }

    pub fn state(&self) -> DispatcherState {
        self.lifecycle.read().state()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Print the banner and, when telemetry is enabled, set up the sink.
    ///
    /// Only the first call does any work. Later calls return the sink that
    /// call produced, if any.
    pub fn initialize(&self) -> Option<SinkHandle> {
        {
            let mut lifecycle = self.lifecycle.write();
            if !matches!(*lifecycle, Lifecycle::Uninitialized) {
                warn!(state = ?lifecycle.state(), "Telemetry already initialized");
                return lifecycle.sink();
            }
            *lifecycle = Lifecycle::Initializing;
        }

        Banner::new(&self.config).write_to(io::stdout().lock());

        let next = if !self.is_enabled() {
            info!(app = self.config.app_name(), "Telemetry disabled, dispatcher is dormant");
            Lifecycle::Dormant
        } else {
            let sink_config = SinkConfig::from_configuration(&self.config);
            let before_send = self.identity.clone().into_before_send();
            match SinkHandle::initialize(sink_config, self.connector.as_ref(), Some(before_send)) {
                Ok(sink) => {
                    if self.capture_panics {
                        sink.capture_panics();
                    }
                    Lifecycle::Active(sink)
                }
                Err(e) => {
                    error!(error = %e, "Telemetry sink setup failed, events will be dropped");
                    Lifecycle::Unavailable
                }
            }
        };

        let sink = next.sink();
        *self.lifecycle.write() = next;
        sink
    }

    /// Send a log line. Unrecognized severities are sent at `log` level.
    pub fn log(&self, message: &str, severity: &str, context: Option<Context>) {
        self.process_log(message, Severity::normalize(severity), context);
    }

    pub fn trace(&self, message: &str, context: Option<Context>) {
        self.process_log(message, Severity::Trace, context);
    }

    pub fn debug(&self, message: &str, context: Option<Context>) {
        self.process_log(message, Severity::Debug, context);
    }

    pub fn info(&self, message: &str, context: Option<Context>) {
        self.process_log(message, Severity::Info, context);
    }

    pub fn warn(&self, message: &str, context: Option<Context>) {
        self.process_log(message, Severity::Warn, context);
    }

    pub fn error(&self, message: &str, context: Option<Context>) {
        self.process_log(message, Severity::Error, context);
    }

    pub fn event(&self, name: &str, attributes: Option<Attributes>, domain: Option<&str>) {
        self.forward("event", |sink| sink.push_event(name, attributes, domain));
    }

    pub fn report_error<E: std::error::Error + ?Sized>(&self, error: &E) {
        self.forward("error", |sink| sink.push_error(ExceptionRecord::from_error(error)));
    }

    pub fn record_authentication(&self, user_id: &str) {
        let mut attributes = Attributes::new();
        attributes.insert("userId".to_string(), AttributeValue::from(user_id));
        self.event(AUTH_EVENT_NAME, Some(attributes), Some(AUTH_DOMAIN));
    }

    /// Turn a presentation-layer event into the matching sink call.
    ///
    /// A `Crash` event panics on purpose and is not caught here.
    pub fn dispatch(&self, event: &TelemetryEvent) {
        match event.kind {
            EventKind::Log => {
                self.process_log(&event.message, event.severity, event.attributes.clone())
            }
            EventKind::CustomEvent => {
                let mut attributes = event.attributes.clone().unwrap_or_default();
                attributes.insert("message".to_string(), event.message.as_str().into());
                self.event(CUSTOM_EVENT_NAME, Some(attributes), event.domain.as_deref());
            }
            EventKind::CustomError => self.report_error(&CustomError::new(event.message.as_str())),
            EventKind::Crash => raise_unhandled_fault(&event.message),
        }
    }

    /// Flush the sink's transport, if one is live.
    pub fn close(&self) {
        let sink = self.lifecycle.read().sink();
        if let Some(sink) = sink {
            sink.close();
        }
    }

    fn process_log(&self, message: &str, level: Severity, context: Option<Context>) {
        self.forward("log", |sink| sink.push_log(&[message], LogOptions { level, context }));
    }

    fn forward<F: FnOnce(&SinkHandle)>(&self, kind: &'static str, push: F) {
        if !self.is_enabled() {
            self.stats.suppressed.inc();
            return;
        }

        let (state, sink) = {
            let lifecycle = self.lifecycle.read();
            (lifecycle.state(), lifecycle.sink())
        };

        match sink {
            Some(sink) => {
                push(&sink);
                self.stats.forwarded.inc();
            }
            None => {
                self.stats.dropped.inc();
                error!(kind, state = ?state, "No telemetry sink running, dropping");
            }
        }
    }
}
