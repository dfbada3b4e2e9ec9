use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

/// Where gateway logs go and how they look. Every field can be overridden from the environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level of emitted events. Overridden by `LOG_LEVEL`.
    #[serde(default)]
    pub level: LogLevel,

    /// Output layout. Overridden by `LOG_FORMAT`.
    #[serde(default)]
    pub format: LogFormat,

    /// `EnvFilter` directives, for example `fusion_plan_executor=trace,info`.
    /// Wins over `level` when present. Overridden by `LOG_FILTER`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Directives handed to the subscriber's filter.
    pub fn env_filter_str(&self) -> &str {
        match &self.filter {
            Some(filter) => filter,
            None => self.level.as_str(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Indented span tree, meant for local development.
    PrettyTree,
    /// One line per event.
    PrettyCompact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::PrettyCompact
        } else {
            LogFormat::Json
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, LogLevel, LoggingConfig};

    #[test]
    fn names_parse_regardless_of_case() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("Pretty-Tree".parse::<LogFormat>(), Ok(LogFormat::PrettyTree));
        assert_eq!(LogFormat::PrettyCompact.as_str(), "pretty-compact");
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn filter_wins_over_level() {
        let mut config = LoggingConfig {
            level: LogLevel::Error,
            ..Default::default()
        };
        assert_eq!(config.env_filter_str(), "error");

        config.filter = Some("fusion_runtime=trace".to_string());
        assert_eq!(config.env_filter_str(), "fusion_runtime=trace");
    }
}
