#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_possible_truncation, // Counters and sizes stay within realistic bounds
    clippy::missing_errors_doc,       // Error enums document themselves
    clippy::module_name_repetitions,  // e.g. ClientError in client module
    clippy::must_use_candidate,
    clippy::doc_markdown
)]

//! Client-side log shipping.
//!
//! Records are formatted by the [`Logger`] facade, queued on a bounded ingest
//! channel, batched by a single consumer loop per [`HttpTransport`], and
//! posted to a remote collector. Failed deliveries are retried a bounded number
//! of times on supervised background tasks; batches that still fail are
//! appended to a date-partitioned local file.
//!
//! Delivery order across batches is not guaranteed: a batch whose first
//! attempt failed is retried in the background while later batches keep
//! flowing, so a later batch can reach the collector first.

pub mod app;
pub mod buffer;
pub mod domain;
pub mod logger;
pub mod reliability;
pub mod sender;
pub mod transport;

pub use app::{Config, ConfigError};
pub use domain::{Level, LogRecord, RemoteLogError};
pub use logger::Logger;
pub use transport::{ConsoleTransport, HttpTransport, ShutdownReport, Transport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
