use crate::domain::model::Dish;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Reads a menu image and returns the dishes on it, already schema-checked.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn extract_dishes(&self, menu_url: &str) -> Result<Vec<Dish>>;
}

/// Turns a text prompt into one base64-encoded image.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}
