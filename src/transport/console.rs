use crate::domain::{Level, LogRecord};
use std::io::Write;

/// Prints records synchronously: `error` to stderr, everything else to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleTransport {
    levels: Vec<Level>,
}

impl ConsoleTransport {
    pub fn new(levels: impl IntoIterator<Item = Level>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
        }
    }

    /// Accepts every level; used as the facade's fallback.
    pub fn all() -> Self {
        Self::new(Level::ALL)
    }

    pub fn should_log(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }

    pub fn log(&self, record: &LogRecord) {
        let line = record.format_console();
        // A closed stdout/stderr must not take the caller down with it.
        let _ = if record.level() == Level::Error {
            writeln!(std::io::stderr().lock(), "{line}")
        } else {
            writeln!(std::io::stdout().lock(), "{line}")
        };
    }
}
