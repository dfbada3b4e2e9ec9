pub mod compose;
mod env_overrides;
pub mod introspection;
pub mod log;
pub mod primitives;
pub mod query_planner;
pub mod supergraph;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    compose::ComposeConfig,
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    introspection::IntrospectionConfig,
    log::LoggingConfig,
    primitives::file_path::with_start_path,
    query_planner::QueryPlannerConfig,
    supergraph::SupergraphSource,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FusionGatewayConfig {
    #[serde(skip)]
    root_directory: PathBuf,

    /// The gateway logger configuration.
    ///
    /// The gateway is configured to be mostly silent (`info`) level, and will print only important messages, warnings, and errors.
    #[serde(default)]
    pub log: LoggingConfig,

    /// Where the supergraph comes from. By default, the gateway reads `./supergraph.graphql` once.
    #[serde(default)]
    #[schemars(extend("type" = "object"))]
    pub supergraph: SupergraphSource,

    /// Query planning configuration.
    #[serde(default)]
    pub query_planner: QueryPlannerConfig,

    /// Configuration to enable or disable introspection queries.
    #[serde(default)]
    pub introspection: IntrospectionConfig,
}

impl FusionGatewayConfig {
    /// Directory the configuration was loaded from. Relative paths are resolved against it.
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
    #[error("Failed to get the current directory: {0}")]
    CurrentDirError(std::io::Error),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "gateway.config.yaml",
    "gateway.config.yml",
    "gateway.config.json",
    "gateway.config.json5",
];

fn get_current_dir() -> Result<PathBuf, GatewayConfigError> {
    std::env::current_dir().map_err(GatewayConfigError::CurrentDirError)
}

fn parent_directory(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Loads the gateway configuration from `override_config_path`, or from the first
/// `gateway.config.*` file found in the working directory, then applies environment overrides.
pub fn load_config(
    override_config_path: Option<String>,
) -> Result<FusionGatewayConfig, GatewayConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();
    let mut config_root_path = get_current_dir()?;

    if let Some(path_str) = override_config_path {
        let path_buf = PathBuf::from(path_str);
        config_root_path = config_root_path.join(parent_directory(&path_buf));
        let as_file: File<FileSourceFile, _> = path_buf.into();

        config = config.add_source(as_file.required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            config = config.add_source(File::with_name(name).required(false));
        }
    }

    config = env_overrides.apply_overrides(config)?;

    let mut base_cfg = with_start_path(&config_root_path, || {
        config.build()?.try_deserialize::<FusionGatewayConfig>()
    })?;

    base_cfg.root_directory = config_root_path;

    Ok(base_cfg)
}

pub fn parse_yaml_config(config_raw: &str) -> Result<FusionGatewayConfig, GatewayConfigError> {
    let config_root_path = get_current_dir()?;
    let config = Config::builder();

    let mut base_cfg = with_start_path(&config_root_path, || {
        config
            .add_source(File::from_str(config_raw, FileFormat::Yaml))
            .build()?
            .try_deserialize::<FusionGatewayConfig>()
    })?;

    base_cfg.root_directory = config_root_path;

    Ok(base_cfg)
}

/// Reads a compose configuration. Subgraph schema paths are relative to the file itself.
pub fn load_compose_config(path: &str) -> Result<ComposeConfig, GatewayConfigError> {
    let path_buf = PathBuf::from(path);
    let config_root_path = get_current_dir()?.join(parent_directory(&path_buf));
    let as_file: File<FileSourceFile, _> = path_buf.into();

    let compose_config = with_start_path(&config_root_path, || {
        Config::builder()
            .add_source(as_file.required(true))
            .build()?
            .try_deserialize::<ComposeConfig>()
    })?;

    Ok(compose_config)
}
