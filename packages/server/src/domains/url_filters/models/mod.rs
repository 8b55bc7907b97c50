pub mod classification;
pub mod filter_config;

pub use classification::*;
pub use filter_config::*;
