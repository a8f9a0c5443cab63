//! Domain layer for remote-log.
//!
//! Contains the canonical types shared across all modules:
//! - `LogRecord`: one leveled log event and its wire formatting
//! - `Level`: record severity (debug/info/warn/error/access)
//! - `RemoteLogError`: top-level error type

pub mod error;
pub mod log_level;
pub mod log_record;

pub use error::RemoteLogError;
pub use log_level::Level;
pub use log_record::{ENTRY_SEPARATOR, FormattedEntry, LogRecord};
