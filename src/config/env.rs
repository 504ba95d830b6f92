use crate::config::toml_config::ServiceConfig;
use std::env;

pub const TOGETHER_API_KEY: &str = "TOGETHER_API_KEY";
pub const HELICONE_API_KEY: &str = "HELICONE_API_KEY";
pub const MENU_BIND_ADDR: &str = "MENU_BIND_ADDR";

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl ServiceConfig {
    /// 環境變數優先於 TOML 檔中的設定
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_var(TOGETHER_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(key) = non_empty_var(HELICONE_API_KEY) {
            self.provider.helicone_api_key = Some(key);
        }
        if let Some(addr) = non_empty_var(MENU_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
    }
}
