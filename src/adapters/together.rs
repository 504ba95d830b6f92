//! Shared HTTP plumbing for the Together inference API (OpenAI-compatible).

use crate::config::ProviderConfig;
use crate::utils::error::{MenuError, Result};
use crate::utils::validation::validate_required_field;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const HELICONE_AUTH: &str = "helicone-auth";
const HELICONE_PROPERTY_MENU: &str = "helicone-property-menu";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned no {what}")]
    Empty { url: String, what: &'static str },
}

#[derive(Debug, Clone)]
pub struct TogetherClient {
    http: Client,
    base_url: String,
}

impl TogetherClient {
    pub fn new(provider: &ProviderConfig) -> Result<Self> {
        let api_key = validate_required_field("provider.api_key", &provider.api_key)?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer(api_key)?);

        // 有 Helicone key 時所有呼叫都經過觀測代理
        if let Some(helicone_key) = &provider.helicone_api_key {
            headers.insert(HeaderName::from_static(HELICONE_AUTH), bearer(helicone_key)?);
            headers.insert(
                HeaderName::from_static(HELICONE_PROPERTY_MENU),
                HeaderValue::from_static("true"),
            );
        }

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: provider.effective_base_url().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> std::result::Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        tracing::debug!("Provider response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                tracing::debug!("Failed to read error body from {}: {}", url, e);
                String::new()
            });
            return Err(ProviderError::Status {
                url,
                status,
                body: truncate(&body, 300),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|source| ProviderError::Decode { url, source })
    }
}

fn bearer(token: &str) -> Result<HeaderValue> {
    let mut value =
        HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|e| {
            MenuError::ConfigError {
                message: format!("API key is not a valid header value: {}", e),
            }
        })?;
    value.set_sensitive(true);
    Ok(value)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
