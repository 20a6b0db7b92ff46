//! Status reporting for operators and dashboards.
//!
//! The orchestrator pushes `(key, value)` updates into a [`StatusSink`].
//! [`StatusStore`] is the process-lifetime in-memory implementation;
//! readers always get a copy of the whole map.

pub mod keys;
mod sink;
mod store;

#[cfg(feature = "http-sink")]
mod http;

pub use sink::{CollectingStatusSink, LoggingStatusSink, StatusSink};
pub use store::{global_status_store, StatusStore};

#[cfg(feature = "http-sink")]
pub use http::HttpStatusSink;
