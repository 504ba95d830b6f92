use crate::adapters::{TogetherClient, TogetherImages, TogetherVision};
use crate::config::ServiceConfig;
use crate::core::emitter::EmissionMode;
use crate::core::enrichment::{EnrichmentSettings, FailurePolicy, ImageEnricher};
use crate::domain::model::{Dish, MenuCollection, MenuItem};
use crate::domain::ports::{ImageModel, VisionModel};
use crate::utils::error::{MenuError, Result};
use crate::utils::validation::validate_menu_url;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Runs extraction, then enrichment, for one menu image at a time.
pub struct MenuEngine {
    vision: Arc<dyn VisionModel>,
    enricher: ImageEnricher,
    emission: EmissionMode,
    request_timeout: Duration,
}

impl MenuEngine {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        images: Arc<dyn ImageModel>,
        enrichment: EnrichmentSettings,
        emission: EmissionMode,
        request_timeout: Duration,
    ) -> Self {
        Self {
            vision,
            enricher: ImageEnricher::new(images, enrichment),
            emission,
            request_timeout,
        }
    }

    /// 依配置建立 Together 的 vision / image 客戶端
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let client = Arc::new(TogetherClient::new(&config.provider)?);
        tracing::info!("Using model provider at {}", client.base_url());

        let vision = Arc::new(TogetherVision::new(client.clone(), config.vision.clone()));
        let images = Arc::new(TogetherImages::new(client, config.image.clone()));

        Ok(Self::new(
            vision,
            images,
            EnrichmentSettings::from(&config.enrichment),
            config.emission.mode,
            config.request_timeout(),
        ))
    }

    /// Items may only leave one by one when no image failure can abort the
    /// batch; under `Abort` the whole menu is enriched before the first byte.
    fn streams_incrementally(&self) -> bool {
        self.emission == EmissionMode::Incremental
            && self.enricher.settings().failure_policy != FailurePolicy::Abort
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.request_timeout
    }

    fn timed_out(&self) -> MenuError {
        MenuError::Timeout {
            seconds: self.request_timeout.as_secs(),
        }
    }

    pub async fn extract(&self, menu_url: &str, deadline: Instant) -> Result<Vec<Dish>> {
        tokio::time::timeout_at(deadline, self.vision.extract_dishes(menu_url))
            .await
            .map_err(|_| self.timed_out())?
    }

    /// Starts processing a menu and returns the items as a stream.
    ///
    /// Everything that can fail before the first item is known fails here, so
    /// the caller can still answer with a clean error. In buffered mode that
    /// includes every image call.
    pub async fn start(&self, menu_url: &str) -> Result<BoxStream<'static, Result<MenuItem>>> {
        let (dishes, deadline) = self.extract_menu(menu_url).await?;

        if self.streams_incrementally() {
            return Ok(self.enricher.items(dishes, deadline));
        }
        if self.emission == EmissionMode::Incremental {
            tracing::debug!("Abort policy active, buffering the menu before streaming");
        }

        let collection = self.enrich_before(dishes, deadline).await?;
        Ok(stream::iter(collection.items.into_iter().map(Ok)).boxed())
    }

    /// Full pipeline, collected into one [`MenuCollection`].
    pub async fn run(&self, menu_url: &str) -> Result<MenuCollection> {
        let (dishes, deadline) = self.extract_menu(menu_url).await?;

        let collection = self.enrich_before(dishes, deadline).await?;
        tracing::info!("Menu ready with {} items", collection.len());
        Ok(collection)
    }

    /// 驗證 URL 並抽取菜色，回傳同一個請求期限
    async fn extract_menu(&self, menu_url: &str) -> Result<(Vec<Dish>, Instant)> {
        let menu_url = validate_menu_url(menu_url)?;
        let deadline = self.deadline();

        tracing::info!("Extracting menu items from {}", menu_url);
        let dishes = self.extract(menu_url.as_str(), deadline).await?;
        tracing::info!("Extracted {} dishes, generating images", dishes.len());

        Ok((dishes, deadline))
    }

    async fn enrich_before(&self, dishes: Vec<Dish>, deadline: Instant) -> Result<MenuCollection> {
        tokio::time::timeout_at(deadline, self.enricher.enrich_all(dishes, deadline))
            .await
            .map_err(|_| self.timed_out())?
    }
}
