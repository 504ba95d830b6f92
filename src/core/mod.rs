pub mod emitter;
pub mod engine;
pub mod enrichment;
pub mod schema;

pub use crate::domain::model::{Dish, MenuCollection, MenuImage, MenuItem};
pub use crate::domain::ports::{ImageModel, VisionModel};
pub use crate::utils::error::Result;
