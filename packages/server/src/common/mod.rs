// Common types and utilities shared across the application

pub mod batch;
pub mod entity_ids;
pub mod errors;
pub mod id;
pub mod text;

pub use batch::pause_between_items;
pub use entity_ids::*;
pub use errors::PipelineError;
pub use id::Id;
