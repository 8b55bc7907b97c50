pub mod category;
pub mod enrichment_log;
pub mod entry;

pub use category::*;
pub use enrichment_log::*;
pub use entry::*;
