use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Profile-based setups have no separate account id; the profile name is used for both.
    pub fn from_profile(profile: impl Into<String>) -> Self {
        let profile = profile.into();
        Self {
            id: profile.clone(),
            name: profile,
        }
    }
}

/// One (account, region) cell of the execution matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub index: usize,
    pub account: Account,
    pub region: String,
}

impl Task {
    pub fn account_id(&self) -> &str {
        &self.account.id
    }

    pub fn account_name(&self) -> &str {
        &self.account.name
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account.name, self.region)
    }
}

/// Expand accounts × regions into tasks, account-major and region-minor.
///
/// `Task::index` is the position in the returned vector.
pub fn build_tasks(accounts: &[Account], regions: &[String]) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(accounts.len() * regions.len());
    for account in accounts {
        for region in regions {
            tasks.push(Task {
                index: tasks.len(),
                account: account.clone(),
                region: region.clone(),
            });
        }
    }
    tasks
}
