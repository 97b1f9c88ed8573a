//! Demo configuration read from the environment.

use std::str::FromStr;

use crate::error::AppError;

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(AppError::Config(format!(
                "UNITWORK_LOG_FORMAT must be json or pretty, got {other:?}"
            ))),
        }
    }
}

/// Which broker operation the demo publishes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// `publish_async`, awaited on the runtime.
    Cooperative,
    /// `publish`, run on the blocking pool.
    Blocking,
}

impl FromStr for PublishMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" | "cooperative" => Ok(Self::Cooperative),
            "blocking" => Ok(Self::Blocking),
            other => Err(AppError::Config(format!(
                "UNITWORK_PUBLISH_MODE must be async or blocking, got {other:?}"
            ))),
        }
    }
}

/// Demo settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Tracing output format.
    pub log_format: LogFormat,
    /// How events are published.
    pub publish_mode: PublishMode,
    /// Number of orders to place.
    pub order_count: u32,
    /// 1-based order whose inventory reservation is rejected.
    pub fail_on_order: Option<u32>,
}

impl DemoConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let log_format = lookup("UNITWORK_LOG_FORMAT")
            .map_or(Ok(LogFormat::Json), |value| value.parse())?;
        let publish_mode = lookup("UNITWORK_PUBLISH_MODE")
            .map_or(Ok(PublishMode::Cooperative), |value| value.parse())?;
        let order_count = match lookup("UNITWORK_ORDER_COUNT") {
            Some(value) => parse_positive("UNITWORK_ORDER_COUNT", &value)?,
            None => 3,
        };
        let fail_on_order = lookup("UNITWORK_FAIL_ON_ORDER")
            .map(|value| parse_positive("UNITWORK_FAIL_ON_ORDER", &value))
            .transpose()?;

        Ok(Self {
            log_format,
            publish_mode,
            order_count,
            fail_on_order,
        })
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u32, AppError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::Config(format!(
            "{key} must be a positive integer, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<DemoConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        DemoConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(
            config,
            DemoConfig {
                log_format: LogFormat::Json,
                publish_mode: PublishMode::Cooperative,
                order_count: 3,
                fail_on_order: None,
            }
        );
    }

    #[test]
    fn test_all_variables_are_read() {
        let config = config_from(&[
            ("UNITWORK_LOG_FORMAT", "Pretty"),
            ("UNITWORK_PUBLISH_MODE", "blocking"),
            ("UNITWORK_ORDER_COUNT", "5"),
            ("UNITWORK_FAIL_ON_ORDER", "2"),
        ])
        .unwrap();

        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.publish_mode, PublishMode::Blocking);
        assert_eq!(config.order_count, 5);
        assert_eq!(config.fail_on_order, Some(2));
    }

    #[test]
    fn test_zero_order_count_is_rejected() {
        let result = config_from(&[("UNITWORK_ORDER_COUNT", "0")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let result = config_from(&[("UNITWORK_LOG_FORMAT", "xml")]);

        match result {
            Err(AppError::Config(message)) => assert!(message.contains("UNITWORK_LOG_FORMAT")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_fail_on_order_is_rejected() {
        let result = config_from(&[("UNITWORK_FAIL_ON_ORDER", "second")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
