/// Service layer for thumbnail-service
pub mod ids;
pub mod naming;
pub mod orchestrator;
pub mod processor;
pub mod sizing;

pub use orchestrator::ThumbnailService;
pub use processor::{ImageProcessor, ProcessedImage, ProcessorConfig};
pub use sizing::{ResolvedSize, SUPPORTED_SIZES};
