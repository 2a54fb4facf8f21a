//! Service layer module

pub mod compare;
pub mod face;
pub mod types;

pub use compare::{CompareService, ImageCollection, CHILD_KEY};
pub use face::FaceService;
pub use types::*;
