//! APM Demo - generates synthetic telemetry from an interactive console
//!
//! Configuration comes from `APM_SETTINGS_FILE` and the `ENVIRONMENT`,
//! `APP_NAME`, `APP_VERSION`, `APM_ENABLED` and `APM_URL` variables.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use apm_core::Configuration;
use apm_telemetry::transport::HttpConnector;
use apm_telemetry::Dispatcher;
use tracing::info;

mod console;

use console::Console;

fn main() -> anyhow::Result<()> {
    apm_telemetry::init_logging()?;

    let config = Arc::new(Configuration::load());
    info!(
        app = config.app_name(),
        version = config.app_version(),
        environment = %config.environment(),
        telemetry = config.telemetry().enabled(),
        "Starting APM demo"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("apm-transport")
        .enable_all()
        .build()?;

    let connector = Arc::new(HttpConnector::new(runtime.handle().clone()));
    let dispatcher = Dispatcher::new(config, connector).with_panic_capture(true);
    dispatcher.initialize();

    // Crashes unwind out of the console; flush what was queued, then let them
    // reach the process boundary.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let stdin = io::stdin();
        let stdout = io::stdout();
        Console::new(&dispatcher).run(stdin.lock(), stdout.lock())
    }));

    dispatcher.close();

    match outcome {
        Ok(result) => {
            result?;
            info!(
                forwarded = dispatcher.stats().forwarded.get(),
                suppressed = dispatcher.stats().suppressed.get(),
                dropped = dispatcher.stats().dropped.get(),
                "APM demo stopped"
            );
            Ok(())
        }
        Err(payload) => panic::resume_unwind(payload),
    }
}
