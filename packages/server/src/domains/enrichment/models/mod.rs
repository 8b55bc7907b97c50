pub mod content;
pub mod snapshot;

pub use content::*;
pub use snapshot::*;
