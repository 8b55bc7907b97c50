pub mod candidate;
pub mod sourcing_run;

pub use candidate::*;
pub use sourcing_run::*;
