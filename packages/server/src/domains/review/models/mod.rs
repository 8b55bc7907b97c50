pub mod gate;
pub mod verdict;

pub use gate::*;
pub use verdict::*;
