use crate::adapters::together::{ProviderError, TogetherClient};
use crate::config::ImageConfig;
use crate::domain::ports::ImageModel;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    width: u32,
    height: u32,
    steps: u32,
    n: u32,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}

pub struct TogetherImages {
    client: Arc<TogetherClient>,
    config: ImageConfig,
}

impl TogetherImages {
    pub fn new(client: Arc<TogetherClient>, config: ImageConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ImageModel for TogetherImages {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ImageRequest {
            model: &self.config.model,
            prompt,
            width: self.config.width,
            height: self.config.height,
            steps: self.config.steps,
            n: 1,
            response_format: "base64",
        };

        let response: ImageResponse = self
            .client
            .post_json("images/generations", &request)
            .await?;

        response
            .data
            .into_iter()
            .next()
            .and_then(|image| image.b64_json)
            .filter(|b64| !b64.is_empty())
            .ok_or_else(|| {
                ProviderError::Empty {
                    url: self.client.endpoint("images/generations"),
                    what: "image data",
                }
                .into()
            })
    }
}
