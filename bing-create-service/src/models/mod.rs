//! Domain models for the bing-create service.

pub mod generation;
pub mod selector;
pub mod task;

pub use generation::{GenerationKind, ImageGeneration, ImageResult};
pub use selector::{Aspect, Model, SelectorInput};
pub use task::{TaskStatus, VideoTask};
