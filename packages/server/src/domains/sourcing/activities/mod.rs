pub mod run;

pub use run::{run_all, run_source, RunOptions};
