pub mod bing;
pub mod generation;
pub mod metrics;
pub mod tasks;

pub use bing::{BingClient, BingError};
pub use generation::{Generation, GenerationService, VideoTaskCreated};
pub use metrics::{get_metrics, init_metrics};
pub use tasks::TaskRegistry;
