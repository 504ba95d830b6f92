use crate::adapters::together::{ProviderError, TogetherClient};
use crate::config::VisionConfig;
use crate::core::schema;
use crate::domain::model::Dish;
use crate::domain::ports::VisionModel;
use crate::utils::error::{MenuError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Vision extraction through `/chat/completions` with a JSON-schema response format.
pub struct TogetherVision {
    client: Arc<TogetherClient>,
    config: VisionConfig,
}

impl TogetherVision {
    pub fn new(client: Arc<TogetherClient>, config: VisionConfig) -> Self {
        Self { client, config }
    }

    fn request_body(&self, menu_url: &str) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": self.config.user_prompt },
                        { "type": "image_url", "image_url": { "url": menu_url } }
                    ]
                }
            ],
            "response_format": {
                "type": "json_object",
                "schema": schema::extraction_schema()
            }
        })
    }
}

#[async_trait]
impl VisionModel for TogetherVision {
    async fn extract_dishes(&self, menu_url: &str) -> Result<Vec<Dish>> {
        tracing::debug!("Extracting menu items with {}", self.config.model);

        let completion: ChatCompletion = self
            .client
            .post_json("chat/completions", &self.request_body(menu_url))
            .await
            .map_err(|e| MenuError::extraction_failed(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                let empty = ProviderError::Empty {
                    url: self.client.endpoint("chat/completions"),
                    what: "message content",
                };
                MenuError::extraction_failed(empty.to_string())
            })?;

        let dishes = schema::parse_model_output(&content)?;
        tracing::info!("Vision model extracted {} menu items", dishes.len());
        Ok(dishes)
    }
}
