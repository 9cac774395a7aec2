pub mod classify;
pub mod config;
pub mod limits;
pub mod plan;
pub mod progress;
pub mod quota;
pub mod simulate;
