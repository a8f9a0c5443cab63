//! Destinations a [`Logger`](crate::Logger) can route records to.
//!
//! The set is closed: dispatch is a `match`, not a trait object.

pub mod console;
pub mod http;
mod pipeline;

pub use console::ConsoleTransport;
pub use http::{HttpTransport, ShutdownReport};

use crate::domain::{Level, LogRecord};

#[derive(Debug)]
pub enum Transport {
    Http(HttpTransport),
    Console(ConsoleTransport),
}

impl Transport {
    pub fn should_log(&self, level: Level) -> bool {
        match self {
            Transport::Http(http) => http.should_log(level),
            Transport::Console(console) => console.should_log(level),
        }
    }

    pub fn log(&self, record: &LogRecord) {
        match self {
            Transport::Http(http) => http.log(record),
            Transport::Console(console) => console.log(record),
        }
    }
}

impl From<HttpTransport> for Transport {
    fn from(transport: HttpTransport) -> Self {
        Transport::Http(transport)
    }
}

impl From<ConsoleTransport> for Transport {
    fn from(transport: ConsoleTransport) -> Self {
        Transport::Console(transport)
    }
}
