pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::ServiceConfig;

pub use app::{router, start_server, AppState};
pub use core::engine::MenuEngine;
pub use domain::model::{Dish, MenuCollection, MenuImage, MenuItem};
pub use utils::error::{MenuError, Result};
