#[cfg(feature = "cli")]
pub mod cli;
pub mod env;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use toml_config::{
    EmissionConfig, EnrichmentConfig, ImageConfig, LogFormat, LoggingConfig, ProviderConfig,
    ServerConfig, ServiceConfig, VisionConfig,
};
