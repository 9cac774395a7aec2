use std::sync::Arc;

use async_trait::async_trait;
use fanout_core::{Account, ProviderError, Task};

/// Produces the credentials/session handle a task callback runs with.
///
/// Called once per task before its first attempt. A failure here is classified and
/// recorded against the task but not retried.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    type Session: Send + Sync + 'static;

    async fn session(&self, account: &Account, region: &str)
        -> Result<Self::Session, ProviderError>;
}

/// Hands every task a clone of the same session.
#[derive(Debug, Clone)]
pub struct StaticSessionProvider<S> {
    session: S,
}

impl<S> StaticSessionProvider<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<S> SessionProvider for StaticSessionProvider<S>
where
    S: Clone + Send + Sync + 'static,
{
    type Session = S;

    async fn session(&self, _account: &Account, _region: &str) -> Result<S, ProviderError> {
        Ok(self.session.clone())
    }
}

/// What a task callback receives for each attempt.
pub struct TaskContext<S> {
    session: Arc<S>,
    task: Arc<Task>,
}

impl<S> Clone for TaskContext<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            task: self.task.clone(),
        }
    }
}

impl<S> TaskContext<S> {
    pub(crate) fn new(session: Arc<S>, task: Arc<Task>) -> Self {
        Self { session, task }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn account_id(&self) -> &str {
        self.task.account_id()
    }

    pub fn account_name(&self) -> &str {
        self.task.account_name()
    }

    pub fn region(&self) -> &str {
        &self.task.region
    }
}
