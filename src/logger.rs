use crate::app::Config;
use crate::domain::{Level, LogRecord, RemoteLogError};
use crate::sender::{ClientConfig, HttpClient};
use crate::transport::{ConsoleTransport, ShutdownReport, Transport};
use std::fmt::Display;
use tracing::info;

/// Application-facing facade.
///
/// Each call builds one [`LogRecord`] and hands it to every transport that
/// accepts its level. Records no transport accepts are printed to the
/// console so nothing is silently discarded.
#[derive(Debug)]
pub struct Logger {
    app_name: String,
    storage_days: u32,
    service_name: String,
    transports: Vec<Transport>,
    fallback: ConsoleTransport,
    client: HttpClient,
}

impl Logger {
    pub fn new(
        config: &Config,
        app_name: impl Into<String>,
        storage_days: u32,
        transports: Vec<Transport>,
    ) -> Result<Self, RemoteLogError> {
        let app_name = app_name.into();
        if app_name.trim().is_empty() {
            return Err(RemoteLogError::EmptyAppName);
        }
        config.validate()?;

        Ok(Self {
            app_name,
            storage_days,
            service_name: local_service_name(),
            transports,
            fallback: ConsoleTransport::all(),
            client: HttpClient::new(ClientConfig::from(config))?,
        })
    }

    /// Overrides the host name reported as the service.
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Registers the retention period with the collector. Meant to run once
    /// at startup; failure means the collector is unusable.
    pub async fn init(&self) -> Result<(), RemoteLogError> {
        self.client
            .register_storage_days(&self.app_name, self.storage_days)
            .await?;
        info!(
            app = self.app_name.as_str(),
            storage_days = self.storage_days,
            "Registered log retention with collector"
        );
        Ok(())
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::Warn, message.as_ref());
    }

    pub fn error(&self, error: impl Display) {
        self.log(Level::Error, &error.to_string());
    }

    pub fn access(&self, message: impl AsRef<str>) {
        self.log(Level::Access, message.as_ref());
    }

    pub fn log(&self, level: Level, message: &str) {
        if message.is_empty() {
            return;
        }

        let record = LogRecord::new(level, &self.service_name, &self.app_name, message);
        let mut handled = false;
        for transport in &self.transports {
            if transport.should_log(level) {
                transport.log(&record);
                handled = true;
            }
        }

        if !handled {
            self.fallback.log(&record);
        }
    }

    /// Shuts down every HTTP transport, summing their reports.
    pub async fn shutdown(&self) -> ShutdownReport {
        let mut total = ShutdownReport::default();
        for transport in &self.transports {
            if let Transport::Http(http) = transport {
                let report = http.shutdown().await;
                total.flushed_entries += report.flushed_entries;
                total.abandoned_retries += report.abandoned_retries;
            }
        }
        total
    }
}

fn local_service_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
