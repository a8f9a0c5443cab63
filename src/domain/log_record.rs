use super::log_level::Level;
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Separator between fields of an entry shipped to the collector.
pub const ENTRY_SEPARATOR: &str = "|**|";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record flattened into the delimited form the collector expects.
pub type FormattedEntry = String;

/// One log event as produced by the facade.
///
/// Records are immutable once built; transports only read them to produce
/// their own string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    timestamp: String,
    level: Level,
    service_name: String,
    app_name: String,
    message: String,
}

impl LogRecord {
    /// Builds a record stamped with the local wall clock, second precision.
    pub fn new(
        level: Level,
        service_name: impl Into<String>,
        app_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::with_timestamp(
            Local::now().format(TIMESTAMP_FORMAT).to_string(),
            level,
            service_name,
            app_name,
            message,
        )
    }

    pub fn with_timestamp(
        timestamp: impl Into<String>,
        level: Level,
        service_name: impl Into<String>,
        app_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            level,
            service_name: service_name.into(),
            app_name: app_name.into(),
            message: message.into(),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `timestamp|**|level|**|service|**|app|**|message`
    pub fn format_entry(&self) -> FormattedEntry {
        self.join(ENTRY_SEPARATOR)
    }

    /// Space separated form used for terminal output.
    pub fn format_console(&self) -> String {
        self.join(" ")
    }

    fn join(&self, separator: &str) -> String {
        let parts = [
            self.timestamp.as_str(),
            self.level.as_str(),
            self.service_name.as_str(),
            self.app_name.as_str(),
            self.message.as_str(),
        ];
        let capacity =
            parts.iter().map(|p| p.len()).sum::<usize>() + separator.len() * (parts.len() - 1);

        let mut out = String::with_capacity(capacity);
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.push_str(part);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogRecord {
        LogRecord::with_timestamp(
            "2024-03-01 12:00:05",
            Level::Info,
            "host-1",
            "billing",
            "payment accepted",
        )
    }

    #[test]
    fn test_format_entry_uses_separator() {
        assert_eq!(
            sample().format_entry(),
            "2024-03-01 12:00:05|**|info|**|host-1|**|billing|**|payment accepted"
        );
    }

    #[test]
    fn test_format_console_uses_spaces() {
        assert_eq!(
            sample().format_console(),
            "2024-03-01 12:00:05 info host-1 billing payment accepted"
        );
    }

    #[test]
    fn test_new_stamps_second_precision_time() {
        let record = LogRecord::new(Level::Debug, "svc", "app", "msg");
        assert_eq!(record.timestamp().len(), "2024-03-01 12:00:05".len());
        assert!(chrono::NaiveDateTime::parse_from_str(record.timestamp(), TIMESTAMP_FORMAT).is_ok());
    }
}
