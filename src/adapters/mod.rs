// Adapters layer: concrete clients for the hosted model provider.

pub mod images;
pub mod together;
pub mod vision;

pub use images::TogetherImages;
pub use together::{ProviderError, TogetherClient};
pub use vision::TogetherVision;
