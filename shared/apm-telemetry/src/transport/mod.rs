//! Transports
//!
//! - `http`: batched delivery to a Faro-compatible collector
//! - `memory`: in-process recording, for tests and local inspection

mod http;
mod memory;

pub use http::{HttpConnector, HttpOptions, HttpTransport};
pub use memory::{InMemoryConnector, InMemoryTransport};
