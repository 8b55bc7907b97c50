//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod firecrawl_gateway;
pub mod media;
pub mod memory_store;
pub mod openai_reviewer;
pub mod pg_store;
pub mod retry;
pub mod test_dependencies;
pub mod traits;

// Re-export AI client types
pub use openai_client::StructuredOutput;

// Gateways and stores
pub use firecrawl_gateway::FirecrawlGateway;
pub use media::{HttpMediaFetcher, LocalMediaStore};
pub use memory_store::MemoryDirectoryStore;
pub use openai_reviewer::OpenAIReviewer;
pub use pg_store::PgDirectoryStore;

// Other exports
pub use deps::ServerDeps;
pub use retry::{call_with_retry, RetryPolicy};
pub use test_dependencies::TestDependencies;
pub use traits::*;
