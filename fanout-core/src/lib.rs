#![forbid(unsafe_code)]

//! Runtime-free building blocks for fanning work out across accounts and regions.
//!
//! The async engine lives in `fanout-exec`; this crate holds the pieces it shares with
//! callers: the account/region task matrix, raw provider errors, the error classifier,
//! the thread-safe error collector and quota status math.

pub mod classify;
pub mod collector;
pub mod error;
pub mod model;
pub mod quota;

pub use crate::classify::{classify, classify_error, Classification, ErrorCategory, Severity};
pub use crate::collector::{safe_collect, ErrorCollector, TaskError};
pub use crate::error::ProviderError;
pub use crate::model::{build_tasks, Account, Task};
pub use crate::quota::{InvalidThresholds, QuotaSnapshot, QuotaStatus, QuotaThresholds, QuotaUsage};
