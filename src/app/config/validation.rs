use super::{Config, ConfigError};
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.api_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid collector URL '{}': {}", self.api_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Collector URL must use http or https: {}",
                self.api_url
            )));
        }

        if self.access_token.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Access token must not be empty".to_string(),
            ));
        }

        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.max_batch_length == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch length must be greater than 0".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::new("http://collector:8080", "token", "/tmp/remote-log")
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_url() {
        let config = Config {
            api_url: "not a url".to_string(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        let config = Config {
            api_url: "ftp://collector".to_string(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_zero_thresholds() {
        for config in [
            Config { max_batch_size: 0, ..valid() },
            Config { max_batch_length: 0, ..valid() },
            Config { channel_capacity: 0, ..valid() },
            Config { flush_interval_ms: 0, ..valid() },
            Config { access_token: String::new(), ..valid() },
        ] {
            assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
        }
    }
}
