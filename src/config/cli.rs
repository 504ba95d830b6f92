use crate::config::toml_config::{LogFormat, ServiceConfig};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "menu-visualizer")]
#[command(about = "Turn a photo of a restaurant menu into an illustrated digital menu")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        #[arg(long, help = "Address to listen on, e.g. 0.0.0.0:3000")]
        bind: Option<String>,
    },
    /// Parse one menu image and print the illustrated menu as JSON
    Parse {
        menu_url: String,

        #[arg(long, help = "Only print dishes whose name contains this text")]
        search: Option<String>,

        #[arg(long)]
        pretty: bool,
    },
}

impl CliConfig {
    /// 組合配置：TOML 檔 -> 環境變數 -> 命令列參數
    pub fn load_service_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };
        config.apply_env_overrides();

        if let Command::Serve { bind: Some(addr) } = &self.command {
            config.server.bind_addr = addr.clone();
        }
        if self.json_logs {
            config.logging.format = LogFormat::Json;
        }

        Ok(config)
    }
}
