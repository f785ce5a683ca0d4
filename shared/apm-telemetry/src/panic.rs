//! Crash reporting
//!
//! Panics are the process-wide error boundary. A sink with panic capture
//! reports each panic as an exception before the previous hook runs.

use std::any::Any;
use std::panic::{self, Location};
use std::sync::Weak;

use crate::item::{ExceptionRecord, StackFrame, TelemetryItem};
use crate::sink::SinkInner;

pub(crate) const PANIC_KIND: &str = "panic";

/// Raise an unhandled fault on purpose.
///
/// Diagnostic-only: used by the demo's crash button to check that crashes
/// reach the collector through panic capture.
#[track_caller]
pub fn raise_unhandled_fault(message: &str) -> ! {
    panic!("unhandled fault: {}", message)
}

pub(crate) fn install_panic_capture(sink: Weak<SinkInner>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if let Some(sink) = sink.upgrade() {
            let record = panic_record(info.payload(), info.location());
            sink.submit(TelemetryItem::Exception(record));
        }
        previous(info);
    }));
}

fn panic_record(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> ExceptionRecord {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    let record = ExceptionRecord::new(PANIC_KIND, message);
    match location {
        Some(location) => record.with_stacktrace(vec![StackFrame {
            filename: location.file().to_string(),
            lineno: location.line(),
            colno: location.column(),
        }]),
        None => record,
    }
}
