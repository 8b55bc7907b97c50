//! Submissions domain - intake and the pending / approved / rejected state
//! machine with its audit trail.

pub mod activities;
pub mod models;
