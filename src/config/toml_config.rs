use crate::core::emitter::EmissionMode;
use crate::core::enrichment::FailurePolicy;
use crate::core::schema;
use crate::utils::error::{MenuError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_required_field,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1";
pub const HELICONE_BASE_URL: &str = "https://together.helicone.ai/v1";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a menu analysis assistant. Your task is to:
1. Extract menu items from images
2. Generate accurate descriptions
3. Format prices consistently
4. Ensure all required fields are present

Please maintain a professional tone and be precise with details.";

/// Process-wide settings, built once at startup and shared read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub vision: VisionConfig,
    pub image: ImageConfig,
    pub enrichment: EnrichmentConfig,
    pub emission: EmissionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// When set, every provider call goes through the Helicone proxy.
    pub helicone_api_key: Option<String>,
    pub helicone_base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            helicone_api_key: None,
            helicone_base_url: HELICONE_BASE_URL.to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn effective_base_url(&self) -> &str {
        if self.helicone_api_key.is_some() {
            &self.helicone_base_url
        } else {
            &self.base_url
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: "Extract all menu items from this image:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: "black-forest-labs/FLUX.1-schnell".to_string(),
            width: 1024,
            height: 768,
            steps: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// 0 表示不設上限
    pub max_concurrency: usize,
    pub item_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    /// Replaces the built-in placeholder picture.
    pub placeholder_b64: Option<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            item_timeout_secs: 30,
            failure_policy: FailurePolicy::Placeholder,
            placeholder_b64: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionConfig {
    pub mode: EmissionMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MenuError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MenuError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TOGETHER_API_KEY})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MenuError::ConfigError {
            message: format!("env placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_required_field("provider.api_key", &self.provider.api_key)?;
        validate_url("provider.base_url", &self.provider.base_url)?;
        if self.provider.helicone_api_key.is_some() {
            validate_url("provider.helicone_base_url", &self.provider.helicone_base_url)?;
        }

        validate_non_empty_string("server.bind_addr", &self.server.bind_addr)?;
        validate_positive_number("server.request_timeout_secs", self.server.request_timeout_secs, 1)?;

        validate_non_empty_string("vision.model", &self.vision.model)?;
        validate_non_empty_string("vision.system_prompt", &self.vision.system_prompt)?;

        validate_non_empty_string("image.model", &self.image.model)?;
        validate_range("image.width", self.image.width, 64, 2048)?;
        validate_range("image.height", self.image.height, 64, 2048)?;
        validate_range("image.steps", self.image.steps, 1, 50)?;

        validate_positive_number("enrichment.item_timeout_secs", self.enrichment.item_timeout_secs, 1)?;
        if let Some(placeholder) = &self.enrichment.placeholder_b64 {
            schema::validate_image_payload(placeholder).map_err(|violation| {
                MenuError::InvalidConfigValueError {
                    field: "enrichment.placeholder_b64".to_string(),
                    value: "<image data>".to_string(),
                    reason: violation.reason,
                }
            })?;
        }

        // 逐筆輸出時不能中途失敗，否則回應會混入錯誤
        if self.emission.mode == EmissionMode::Incremental
            && self.enrichment.failure_policy == FailurePolicy::Abort
        {
            return Err(MenuError::ConfigValidationError {
                field: "emission.mode".to_string(),
                message: "incremental emission requires enrichment.failure_policy = \"placeholder\""
                    .to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn with_key(mut config: ServiceConfig) -> ServiceConfig {
        config.provider.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_default_service_settings() {
        let config = ServiceConfig::default();

        assert_eq!(config.server.request_timeout_secs, 60);
        assert_eq!(config.provider.effective_base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.image.width, 1024);
        assert_eq!(config.image.height, 768);
        assert_eq!(config.image.steps, 5);
        assert_eq!(config.enrichment.failure_policy, FailurePolicy::Placeholder);
        assert_eq!(config.emission.mode, EmissionMode::Incremental);
        assert!(with_key(config).validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:8080"

[provider]
api_key = "abc"

[enrichment]
max_concurrency = 2
failure_policy = "abort"

[emission]
mode = "buffered"

[logging]
format = "json"
"#;

        let config = ServiceConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.server.request_timeout_secs, 60);
        assert_eq!(config.enrichment.max_concurrency, 2);
        assert_eq!(config.enrichment.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.emission.mode, EmissionMode::Buffered);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MENU_TEST_TOGETHER_KEY", "secret-from-env");

        let toml_content = r#"
[provider]
api_key = "${MENU_TEST_TOGETHER_KEY}"
helicone_api_key = "${MENU_TEST_UNSET_VARIABLE}"
"#;

        let config = ServiceConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("secret-from-env"));
        assert_eq!(
            config.provider.helicone_api_key.as_deref(),
            Some("${MENU_TEST_UNSET_VARIABLE}")
        );

        std::env::remove_var("MENU_TEST_TOGETHER_KEY");
    }

    #[test]
    fn test_helicone_switches_base_url() {
        let mut config = ServiceConfig::default();
        config.provider.helicone_api_key = Some("hk".to_string());
        assert_eq!(config.provider.effective_base_url(), HELICONE_BASE_URL);
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            ServiceConfig::default().validate(),
            Err(MenuError::MissingConfigError { .. })
        ));

        let mut config = with_key(ServiceConfig::default());
        config.provider.base_url = "invalid-url".to_string();
        assert!(config.validate().is_err());

        let mut config = with_key(ServiceConfig::default());
        config.image.steps = 0;
        assert!(config.validate().is_err());

        let mut config = with_key(ServiceConfig::default());
        config.enrichment.placeholder_b64 = Some("not*base64".to_string());
        assert!(config.validate().is_err());

        let mut config = with_key(ServiceConfig::default());
        config.enrichment.failure_policy = FailurePolicy::Abort;
        assert!(matches!(
            config.validate(),
            Err(MenuError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let toml_content = r#"
[enrichment]
failure_policy = "retry"
"#;
        assert!(ServiceConfig::from_toml_str(toml_content).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[vision]
model = "meta-llama/Llama-Vision-Free"

[image]
steps = 4
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = ServiceConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.vision.model, "meta-llama/Llama-Vision-Free");
        assert_eq!(config.image.steps, 4);
        assert_eq!(config.image.width, 1024);
    }
}
