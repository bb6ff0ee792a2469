//! Logging configuration for term-judge.
//!
//! All components log through `tracing`. The helpers here only decide what a
//! subscriber should emit; installing one is left to the embedding
//! application, or to [`setup::init_logging`].

/// Controls how chatty the scheduler and backends are.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to log every plugin phase (backend, report, artifact)
    pub log_plugin_phases: bool,
    /// Whether to log bucket sizes and pool activity
    pub log_scheduling: bool,
    /// Maximum length for logged field values
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_plugin_phases: false,
            log_scheduling: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            log_plugin_phases: true,
            log_scheduling: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production.
    pub fn production() -> Self {
        Self {
            log_plugin_phases: false,
            log_scheduling: false,
            max_field_length: 128,
        }
    }

    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup.
pub mod setup {
    use tracing::Level;

    /// Configuration for installing a global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for term-judge components specifically
        pub judge_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Whether to write to stderr instead of stdout
        pub stderr: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                judge_level: Level::DEBUG,
                json_format: false,
                stderr: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                judge_level: Level::INFO,
                json_format: true,
                stderr: false,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                judge_level: Level::DEBUG,
                json_format: false,
                stderr: false,
                env_filter: None,
            }
        }

        /// Configuration for process-pool workers, whose stdout carries results.
        pub fn worker() -> Self {
            Self {
                level: Level::WARN,
                judge_level: Level::INFO,
                json_format: true,
                stderr: true,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_judge_level(mut self, level: Level) -> Self {
            self.judge_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_judge={}",
                    self.level.as_str().to_lowercase(),
                    self.judge_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global `tracing` subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_judge::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = match (config.json_format, config.stderr) {
            (true, true) => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed(),
            (true, false) => tracing_subscriber::fmt::layer().json().boxed(),
            (false, true) => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed(),
            (false, false) => tracing_subscriber::fmt::layer().boxed(),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_env_filter_string() {
        let config = LoggingConfig::default();
        assert_eq!(config.env_filter(), "info,term_judge=debug");

        let config = LoggingConfig::production().with_env_filter("term_judge=trace");
        assert_eq!(config.env_filter(), "term_judge=trace");
    }

    #[test]
    fn test_worker_logs_to_stderr() {
        let config = LoggingConfig::worker();
        assert!(config.stderr);
        assert!(config.json_format);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("short", 10), "short");
        assert_eq!(truncate_field("abcdef", 3), "abc...(truncated)");
        // Never splits a multi-byte character.
        assert_eq!(truncate_field("ééé", 3), "é...(truncated)");
    }

    #[test]
    fn test_presets() {
        assert!(LogConfig::verbose().log_plugin_phases);
        assert!(!LogConfig::balanced().log_plugin_phases);
        assert!(!LogConfig::production().log_scheduling);
        assert!(LogConfig::balanced().log_scheduling);
    }
}
