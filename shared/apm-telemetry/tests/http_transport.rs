//! HTTP transport integration tests
//!
//! A bare TCP listener stands in for the collector and captures the request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use apm_core::{Configuration, Environment, TelemetrySettings};
use apm_telemetry::transport::{HttpConnector, HttpOptions};
use apm_telemetry::{attributes, CustomError, Dispatcher, DispatcherState};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;

const ACCEPTED: &[u8] = b"HTTP/1.1 202 Accepted\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn enabled_config(url: String) -> Configuration {
    Configuration::new(Environment::Production, "faro-demo", "3.1.0")
        .with_telemetry(TelemetrySettings::new(true, url))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Read one HTTP request, returning (request head, body).
async fn read_request(stream: &mut TcpStream) -> (String, String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = find_header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().unwrap())
                })
                .unwrap_or(0);

            let body_start = end + 4;
            if buf.len() >= body_start + length {
                let body = String::from_utf8_lossy(&buf[body_start..body_start + length]).to_string();
                return (head, body);
            }
        }
    }

    (String::from_utf8_lossy(&buf).to_string(), String::new())
}

#[test]
fn test_batch_is_posted_to_collector() {
    let runtime = runtime();
    let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let addr = listener.local_addr().unwrap();

    let collector = runtime.spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        stream.write_all(ACCEPTED).await.unwrap();
        request
    });

    let config = enabled_config(format!("http://{}/collect", addr));
    let connector = HttpConnector::new(runtime.handle().clone());
    let dispatcher = Dispatcher::new(Arc::new(config), Arc::new(connector));

    let sink = dispatcher.initialize().expect("sink should start");
    assert_eq!(dispatcher.state(), DispatcherState::Active);

    dispatcher.info("hello collector", Some(attributes([("reason", "demo")])));
    dispatcher.close();

    let (head, body) = runtime.block_on(collector).unwrap();
    assert!(head.starts_with("POST /collect"), "unexpected request head: {}", head);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["meta"]["app"]["name"], "faro-demo");
    assert_eq!(json["meta"]["app"]["version"], "3.1.0");
    assert_eq!(json["meta"]["app"]["environment"], "production");
    assert_eq!(json["meta"]["session"]["id"], sink.config().session_id.as_str());
    assert_eq!(json["logs"][0]["message"], "hello collector");
    assert_eq!(json["logs"][0]["level"], "info");
    assert_eq!(json["logs"][0]["context"]["reason"], "demo");
    assert_eq!(json["logs"][0]["context"]["userId"], "001");
    assert!(json.get("events").is_none());
}

#[test]
fn test_unreachable_collector_does_not_reach_caller() {
    let runtime = runtime();
    let addr = {
        let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
        listener.local_addr().unwrap()
    };

    let close_grace = Duration::from_secs(5);
    let connector = HttpConnector::new(runtime.handle().clone()).with_options(HttpOptions {
        request_timeout: Duration::from_secs(2),
        close_grace,
        max_batch: 8,
    });
    let config = enabled_config(format!("http://{}/collect", addr));
    let dispatcher = Dispatcher::new(Arc::new(config), Arc::new(connector));

    dispatcher.initialize().expect("sink should start");
    dispatcher.report_error(&CustomError::new("nobody is listening"));

    let started = Instant::now();
    dispatcher.close();
    let elapsed = started.elapsed();

    assert!(elapsed < close_grace, "close took {:?}", elapsed);
    assert_eq!(dispatcher.state(), DispatcherState::Active);
    assert_eq!(dispatcher.stats().forwarded.get(), 1);
    assert_eq!(dispatcher.stats().dropped.get(), 0);

    dispatcher.warn("still accepted after close", None);
    assert_eq!(dispatcher.state(), DispatcherState::Active);
    assert_eq!(dispatcher.stats().forwarded.get(), 2);
}

#[test]
fn test_invalid_endpoint_leaves_dispatcher_unavailable() {
    let runtime = runtime();
    let connector = HttpConnector::new(runtime.handle().clone());
    let dispatcher = Dispatcher::new(Arc::new(enabled_config(String::new())), Arc::new(connector));

    assert!(dispatcher.initialize().is_none());
    assert_eq!(dispatcher.state(), DispatcherState::Unavailable);

    dispatcher.error("dropped", None);
    assert_eq!(dispatcher.stats().dropped.get(), 1);
}
