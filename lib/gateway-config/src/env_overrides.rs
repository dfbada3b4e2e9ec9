use config::{builder::BuilderState, ConfigBuilder, ConfigError};
use envconfig::Envconfig;
use tracing::debug;

use crate::log::{LogFormat, LogLevel};

#[derive(Envconfig)]
pub struct EnvVarOverrides {
    // Logger overrides
    #[envconfig(from = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
    #[envconfig(from = "LOG_FILTER")]
    pub log_filter: Option<String>,

    // Supergraph overrides
    #[envconfig(from = "SUPERGRAPH_FILE_PATH")]
    pub supergraph_file_path: Option<String>,
    #[envconfig(from = "SUPERGRAPH_POLL_INTERVAL")]
    pub supergraph_poll_interval: Option<String>,

    // Query planner overrides
    #[envconfig(from = "EXPOSE_QUERY_PLAN")]
    pub expose_query_plan: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvVarOverridesError {
    #[error("Failed to override configuration: {0}")]
    FailedToOverrideConfig(#[from] ConfigError),
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

impl EnvVarOverrides {
    pub fn apply_overrides<T: BuilderState>(
        mut self,
        mut config: ConfigBuilder<T>,
    ) -> Result<ConfigBuilder<T>, EnvVarOverridesError> {
        if let Some(log_level) = self.log_level.take() {
            debug!("[config-override] 'log.level' = {:?}", log_level);
            config = config.set_override("log.level", log_level.as_str())?;
        }
        if let Some(log_format) = self.log_format.take() {
            debug!("[config-override] 'log.format' = {:?}", log_format);
            config = config.set_override("log.format", log_format.as_str())?;
        }
        if let Some(log_filter) = self.log_filter.take() {
            debug!("[config-override] 'log.filter' = {:?}", log_filter);
            config = config.set_override("log.filter", log_filter)?;
        }

        if let Some(supergraph_file_path) = self.supergraph_file_path.take() {
            debug!(
                "[config-override] 'supergraph.path' = {:?}",
                supergraph_file_path
            );
            config = config.set_override("supergraph.source", "file")?;
            config = config.set_override("supergraph.path", supergraph_file_path)?;
        }

        if let Some(poll_interval) = self.supergraph_poll_interval.take() {
            humantime::parse_duration(&poll_interval).map_err(|err| {
                EnvVarOverridesError::InvalidValue {
                    name: "SUPERGRAPH_POLL_INTERVAL",
                    reason: err.to_string(),
                }
            })?;
            debug!(
                "[config-override] 'supergraph.poll_interval' = {:?}",
                poll_interval
            );
            // The interval alone must still describe a complete file source.
            config = config.set_default("supergraph.source", "file")?;
            config = config.set_default("supergraph.path", "supergraph.graphql")?;
            config = config.set_override("supergraph.poll_interval", poll_interval)?;
        }

        if let Some(expose) = self.expose_query_plan.take() {
            debug!("[config-override] 'query_planner.allow_expose' = {}", expose);
            config = config.set_override("query_planner.allow_expose", expose)?;
        }

        Ok(config)
    }
}
