//! Event store database operations

pub mod events_repo;
pub mod submissions;
