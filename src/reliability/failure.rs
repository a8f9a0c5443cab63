use crate::sender::DeliveryEnvelope;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// One undeliverable batch, written as a single JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(flatten)]
    pub envelope: DeliveryEnvelope,
    pub error: String,
    pub batch_id: String,
    pub attempts: u32,
    pub failed_at: String,
}

impl FailureRecord {
    pub fn new(
        envelope: DeliveryEnvelope,
        error: impl Into<String>,
        batch_id: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            envelope,
            error: error.into(),
            batch_id: batch_id.into(),
            attempts,
            failed_at: Local::now().to_rfc3339(),
        }
    }
}

/// Append-only, one file per local calendar day:
/// `{dir}/error_log_{YYYY-MM-DD}.log`.
///
/// Files are opened per write and never read back or truncated. Writers in
/// this process are serialized; other processes appending to the same
/// directory are not coordinated with.
#[derive(Debug, Clone)]
pub struct FailureSink {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FailureSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Creates the directory up front so a misconfigured path is reported at
    /// construction rather than on the first failed batch.
    pub fn ensure_dir(&self) -> Result<(), SinkError> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("error_log_{}.log", date.format("%Y-%m-%d")))
    }

    pub fn current_path(&self) -> PathBuf {
        self.path_for(Local::now().date_naive())
    }

    /// Appends one line to today's file, creating directory and file as needed.
    pub async fn append(&self, record: &FailureRecord) -> Result<PathBuf, SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;

        let path = self.current_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_is_date_partitioned() {
        let sink = FailureSink::new("/var/log/app");
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(
            sink.path_for(date),
            PathBuf::from("/var/log/app/error_log_2024-01-09.log")
        );
    }

    #[tokio::test]
    async fn test_append_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FailureSink::new(temp_dir.path().join("nested/remote_logs"));

        let record = FailureRecord::new(
            DeliveryEnvelope::Raw(vec!["a|**|b".to_string()]),
            "HTTP error: 503",
            "batch-1",
            4,
        );
        let path = sink.append(&record).await.unwrap();
        sink.append(&record).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: FailureRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_record_line_carries_wire_fields() {
        let record = FailureRecord::new(
            DeliveryEnvelope::Compressed("eJw=".to_string()),
            "timeout",
            "batch-2",
            4,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], 2);
        assert_eq!(value["data2"], "eJw=");
        assert_eq!(value["data1"], serde_json::json!([]));
        assert_eq!(value["error"], "timeout");
        assert_eq!(value["attempts"], 4);
    }
}
