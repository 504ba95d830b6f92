use clap::Parser;
use menu_visualizer::config::LogFormat;
use menu_visualizer::utils::error::ErrorCategory;
use menu_visualizer::utils::{logger, validation::Validate};
use menu_visualizer::{AppState, CliConfig, Command, MenuEngine, MenuError, MenuItem};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.load_service_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(exit_code(&e));
        }
    };

    // 初始化日誌
    match config.logging.format {
        LogFormat::Json => logger::init_json_logger(cli.verbose),
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
    }

    tracing::info!("Starting menu-visualizer");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(exit_code(&e));
    }

    let engine = Arc::new(MenuEngine::from_config(&config)?);

    match cli.command {
        Command::Serve { .. } => {
            menu_visualizer::start_server(&config.server, AppState::new(engine)).await?;
        }
        Command::Parse {
            menu_url,
            search,
            pretty,
        } => match engine.run(&menu_url).await {
            Ok(collection) => {
                let items: Vec<&MenuItem> = match search.as_deref() {
                    Some(term) => collection.filter_by_name(term),
                    None => collection.items.iter().collect(),
                };
                tracing::info!("✅ {} of {} dishes selected", items.len(), collection.len());

                let output = if pretty {
                    serde_json::to_string_pretty(&items)?
                } else {
                    serde_json::to_string(&items)?
                };
                println!("{}", output);
            }
            Err(e) => {
                tracing::error!("❌ Menu processing failed: {} (Category: {:?})", e, e.category());
                eprintln!("❌ {}", e.user_message());
                std::process::exit(exit_code(&e));
            }
        },
    }

    Ok(())
}

fn exit_code(err: &MenuError) -> i32 {
    match err.category() {
        ErrorCategory::Request => 2,
        ErrorCategory::Configuration => 3,
        ErrorCategory::Extraction | ErrorCategory::Enrichment => 1,
        ErrorCategory::Delivery | ErrorCategory::Transport => 4,
    }
}
