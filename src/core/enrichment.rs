//! Image enrichment fan-out: one image-generation call per dish, bounded,
//! timed out per item, and re-associated to its dish by index.

use crate::config::EnrichmentConfig;
use crate::core::schema;
use crate::domain::model::{Dish, MenuCollection, MenuItem};
use crate::domain::ports::ImageModel;
use crate::utils::error::{MenuError, Result};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// 1x1 PNG, shown when an item's picture could not be generated.
pub const PLACEHOLDER_IMAGE_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Deliver the item with the placeholder picture.
    #[default]
    Placeholder,
    /// Fail the whole collection on the first failed item.
    Abort,
}

/// Prompt for one dish. Built only from that dish's own fields.
pub fn image_prompt(dish: &Dish) -> String {
    format!(
        "A picture of food for a menu, hyper realistic, highly detailed, {}, {}.",
        dish.name, dish.description
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Generated(MenuItem),
    Failed {
        index: usize,
        dish: Dish,
        reason: String,
    },
}

impl ImageOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, ImageOutcome::Generated(_))
    }

    pub fn resolve(self, policy: FailurePolicy, placeholder_b64: &str) -> Result<MenuItem> {
        match (self, policy) {
            (ImageOutcome::Generated(item), _) => Ok(item),
            (ImageOutcome::Failed { dish, .. }, FailurePolicy::Placeholder) => {
                Ok(MenuItem::from_dish(dish, placeholder_b64.to_string()))
            }
            (ImageOutcome::Failed { index, dish, reason }, FailurePolicy::Abort) => {
                Err(MenuError::EnrichmentFailed {
                    index,
                    name: dish.name,
                    reason,
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// 0 means one slot per dish.
    pub max_concurrency: usize,
    pub item_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub placeholder_b64: String,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self::from(&EnrichmentConfig::default())
    }
}

impl From<&EnrichmentConfig> for EnrichmentSettings {
    fn from(config: &EnrichmentConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            item_timeout: Duration::from_secs(config.item_timeout_secs),
            failure_policy: config.failure_policy,
            placeholder_b64: config
                .placeholder_b64
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_B64.to_string()),
        }
    }
}

impl EnrichmentSettings {
    fn concurrency_for(&self, dish_count: usize) -> usize {
        let limit = if self.max_concurrency == 0 {
            dish_count
        } else {
            self.max_concurrency.min(dish_count)
        };
        limit.max(1)
    }
}

pub struct ImageEnricher {
    images: Arc<dyn ImageModel>,
    settings: EnrichmentSettings,
}

impl ImageEnricher {
    pub fn new(images: Arc<dyn ImageModel>, settings: EnrichmentSettings) -> Self {
        Self { images, settings }
    }

    pub fn settings(&self) -> &EnrichmentSettings {
        &self.settings
    }

    /// Per-dish outcomes in dish order. Calls run concurrently up to the
    /// configured limit; the stream yields by index, not by completion.
    pub fn outcomes(&self, dishes: Vec<Dish>, deadline: Instant) -> BoxStream<'static, ImageOutcome> {
        let limit = self.settings.concurrency_for(dishes.len());
        let item_timeout = self.settings.item_timeout;
        let images = Arc::clone(&self.images);

        tracing::debug!(
            "Generating {} images with up to {} concurrent calls",
            dishes.len(),
            limit
        );

        stream::iter(dishes.into_iter().enumerate())
            .map(move |(index, dish)| {
                let images = Arc::clone(&images);
                generate_one(images, index, dish, item_timeout, deadline)
            })
            .buffered(limit)
            .boxed()
    }

    /// Outcomes with the failure policy applied. Under [`FailurePolicy::Abort`]
    /// the stream ends after the first error.
    pub fn items(&self, dishes: Vec<Dish>, deadline: Instant) -> BoxStream<'static, Result<MenuItem>> {
        let policy = self.settings.failure_policy;
        let placeholder = self.settings.placeholder_b64.clone();
        let mut failed = false;

        self.outcomes(dishes, deadline)
            .map(move |outcome| outcome.resolve(policy, &placeholder))
            .take_while(move |result| {
                let keep = !failed;
                failed |= result.is_err();
                futures::future::ready(keep)
            })
            .boxed()
    }

    /// Join-all: waits for every dish, or returns the first failure.
    pub async fn enrich_all(&self, dishes: Vec<Dish>, deadline: Instant) -> Result<MenuCollection> {
        let items: Vec<MenuItem> = self.items(dishes, deadline).try_collect().await?;
        Ok(MenuCollection::new(items))
    }
}

async fn generate_one(
    images: Arc<dyn ImageModel>,
    index: usize,
    dish: Dish,
    item_timeout: Duration,
    deadline: Instant,
) -> ImageOutcome {
    let prompt = image_prompt(&dish);
    let item_deadline = std::cmp::min(Instant::now() + item_timeout, deadline);

    let reason = match tokio::time::timeout_at(item_deadline, images.generate_image(&prompt)).await
    {
        Ok(Ok(b64_json)) => match schema::validate_image_payload(&b64_json) {
            Ok(()) => {
                tracing::debug!("Image ready for item {} ({})", index, dish.name);
                return ImageOutcome::Generated(MenuItem::from_dish(dish, b64_json));
            }
            Err(violation) => violation.to_string(),
        },
        Ok(Err(e)) => e.to_string(),
        Err(_) => "image generation timed out".to_string(),
    };

    tracing::warn!(
        "Image generation failed for item {} ({}): {}",
        index,
        dish.name,
        reason
    );
    ImageOutcome::Failed { index, dish, reason }
}
