mod checker;
mod source;

pub use checker::{QuotaChecker, QuotaConfig, QuotaLookup};
pub use source::{find_quota, QuotaSource, QuotaSourceError};
