use super::config::LogLevel;
use crate::domain::RemoteLogError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Targets that are noisy at the default level.
const QUIET_TARGETS: &[(&str, LogLevel)] = &[
    ("hyper", LogLevel::Warn),
    ("hyper_util", LogLevel::Warn),
    ("reqwest", LogLevel::Warn),
    ("h2", LogLevel::Warn),
];

/// Builds the filter string: `RUST_LOG` wins when set, otherwise the
/// default level followed by the quiet-target directives.
pub fn build_filter_string(default_level: LogLevel) -> String {
    match std::env::var("RUST_LOG") {
        Ok(from_env) if !from_env.trim().is_empty() => return from_env,
        _ => {}
    }

    let mut parts = Vec::with_capacity(QUIET_TARGETS.len() + 1);
    parts.push(default_level.as_str().to_string());
    for (target, level) in QUIET_TARGETS {
        parts.push(format!("{target}={}", level.as_str()));
    }
    parts.join(",")
}

/// Installs a global tracing subscriber for the host process.
///
/// Libraries embedding remote-log normally install their own subscriber;
/// this is for binaries that have none.
pub fn init_tracing(default_level: LogLevel, json: bool) -> Result<(), RemoteLogError> {
    let filter_string = build_filter_string(default_level);
    let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
        RemoteLogError::Logging(format!("invalid filter '{filter_string}': {e}"))
    })?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .compact(),
            )
            .try_init()
    };

    result.map_err(|e| RemoteLogError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_filter_string_lists_quiet_targets() {
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::remove_var("RUST_LOG") };
        let filter = build_filter_string(LogLevel::Debug);
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("reqwest=warn"));
        assert!(EnvFilter::try_new(&filter).is_ok());
    }

    #[test]
    #[serial_test::serial]
    fn test_rust_log_overrides_default() {
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("RUST_LOG", "remote_log=trace") };
        assert_eq!(build_filter_string(LogLevel::Info), "remote_log=trace");
        unsafe { std::env::remove_var("RUST_LOG") };
    }
}
