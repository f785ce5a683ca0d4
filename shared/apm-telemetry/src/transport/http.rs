//! HTTP transport
//!
//! Items are queued on an unbounded channel and a worker task on the given
//! tokio runtime posts them in batches. Delivery failures are logged and the
//! batch is discarded.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::SinkConfig;
use crate::item::{Batch, Meta, TelemetryItem};
use crate::sink::{Connector, Transport};
use crate::TelemetryError;

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    /// How long `close` waits for queued items to be delivered
    pub close_grace: Duration,
    pub max_batch: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            close_grace: Duration::from_secs(5),
            max_batch: 32,
        }
    }
}

/// Connects sinks to a collector over HTTP
///
/// The runtime must be multi-threaded: the worker has to make progress while
/// the caller's thread is busy or blocked in `close`.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    runtime: Handle,
    options: HttpOptions,
}

impl HttpConnector {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            options: HttpOptions::default(),
        }
    }

    pub fn with_options(mut self, options: HttpOptions) -> Self {
        self.options = options;
        self
    }
}

impl Connector for HttpConnector {
    fn connect(&self, config: &SinkConfig) -> Result<Arc<dyn Transport>, TelemetryError> {
        let transport = HttpTransport::spawn(self.runtime.clone(), config, self.options.clone())?;
        Ok(Arc::new(transport) as Arc<dyn Transport>)
    }
}

pub struct HttpTransport {
    sender: Mutex<Option<mpsc::UnboundedSender<TelemetryItem>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
    close_grace: Duration,
}

impl HttpTransport {
    /// Validate the collector URL and start the delivery worker.
    pub fn spawn(
        runtime: Handle,
        config: &SinkConfig,
        options: HttpOptions,
    ) -> Result<Self, TelemetryError> {
        let url = parse_endpoint(&config.url)?;

        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| TelemetryError::SinkInit(e.to_string()))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = runtime.spawn(run_worker(
            client,
            url,
            config.meta(),
            receiver,
            options.max_batch.max(1),
        ));

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            runtime,
            close_grace: options.close_grace,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, item: TelemetryItem) {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(item).is_err() {
                    warn!("Telemetry worker has stopped, dropping item");
                }
            }
            None => warn!(kind = item.kind(), "Telemetry transport is closed, dropping item"),
        }
    }

    /// Stop accepting items and wait up to the grace period for the queue to drain.
    ///
    /// When called from inside a tokio runtime the worker drains in the background.
    fn close(&self) {
        drop(self.sender.lock().take());

        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        if Handle::try_current().is_ok() {
            debug!("Transport closed from within a runtime, not waiting for the worker");
            return;
        }

        match self
            .runtime
            .block_on(tokio::time::timeout(self.close_grace, worker))
        {
            Ok(Ok(())) => debug!("Telemetry queue drained"),
            Ok(Err(e)) => warn!(error = %e, "Telemetry worker failed"),
            Err(_) => warn!(
                grace_ms = self.close_grace.as_millis() as u64,
                "Timed out waiting for the telemetry queue to drain"
            ),
        }
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, TelemetryError> {
    let url = Url::parse(raw)
        .map_err(|e| TelemetryError::InvalidEndpoint(format!("{:?}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(TelemetryError::InvalidEndpoint(format!(
            "unsupported scheme {:?} in {}",
            scheme, raw
        ))),
    }
}

async fn run_worker(
    client: reqwest::Client,
    url: Url,
    meta: Meta,
    mut receiver: mpsc::UnboundedReceiver<TelemetryItem>,
    max_batch: usize,
) {
    while let Some(first) = receiver.recv().await {
        let mut batch = Batch::new(meta.clone());
        batch.push(first);
        while batch.len() < max_batch {
            match receiver.try_recv() {
                Ok(item) => batch.push(item),
                Err(_) => break,
            }
        }

        let size = batch.len();
        match client.post(url.clone()).json(&batch).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(items = size, status = %response.status(), "Telemetry batch delivered");
            }
            Ok(response) => warn!(
                items = size,
                status = %response.status(),
                "Collector rejected telemetry batch"
            ),
            Err(e) => warn!(items = size, error = %e, "Failed to deliver telemetry batch"),
        }
    }

    debug!("Telemetry worker stopped");
}
