pub mod answer_extractor;
pub mod inference_service;
pub mod partial_store;

pub use answer_extractor::extract;
pub use inference_service::{InferenceService, RetryPolicy};
pub use partial_store::PartialStore;
