//! Sink items and the batch wire format
//!
//! Batches follow the shape a Faro collector accepts:
//! `{meta, logs, events, exceptions}`.

use std::error::Error;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::{Attributes, Context, Severity};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub message: String,
    pub level: Severity,
    pub context: Context,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub attributes: Attributes,
    pub context: Context,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub filename: String,
    pub lineno: u32,
    pub colno: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stacktrace {
    pub frames: Vec<StackFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    /// Messages of the error's `source()` chain, outermost first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
    pub context: Context,
    pub timestamp: DateTime<Utc>,
}

impl ExceptionRecord {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            causes: Vec::new(),
            stacktrace: None,
            context: Context::new(),
            timestamp: Utc::now(),
        }
    }

    /// Capture an error's message and cause chain.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            causes,
            ..Self::new(short_type_name::<E>(), error.to_string())
        }
    }

    pub fn with_stacktrace(mut self, frames: Vec<StackFrame>) -> Self {
        self.stacktrace = Some(Stacktrace { frames });
        self
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// One payload handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryItem {
    Log(LogRecord),
    Event(EventRecord),
    Exception(ExceptionRecord),
}

impl TelemetryItem {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Event(_) => "event",
            Self::Exception(_) => "exception",
        }
    }

    pub fn context(&self) -> &Context {
        match self {
            Self::Log(record) => &record.context,
            Self::Event(record) => &record.context,
            Self::Exception(record) => &record.context,
        }
    }

    pub fn context_mut(&mut self) -> &mut Context {
        match self {
            Self::Log(record) => &mut record.context,
            Self::Event(record) => &mut record.context,
            Self::Exception(record) => &mut record.context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppMeta {
    pub name: String,
    pub version: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMeta {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkMeta {
    pub name: &'static str,
    pub version: &'static str,
}

impl Default for SdkMeta {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub app: AppMeta,
    pub session: SessionMeta,
    pub sdk: SdkMeta,
}

/// A group of items sent to the collector in one request
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    pub meta: Meta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<ExceptionRecord>,
}

impl Batch {
    pub fn new(meta: Meta) -> Self {
        Self {
            meta,
            logs: Vec::new(),
            events: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn push(&mut self, item: TelemetryItem) {
        match item {
            TelemetryItem::Log(record) => self.logs.push(record),
            TelemetryItem::Event(record) => self.events.push(record),
            TelemetryItem::Exception(record) => self.exceptions.push(record),
        }
    }

    pub fn len(&self) -> usize {
        self.logs.len() + self.events.len() + self.exceptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
