use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fanout_core::{QuotaSnapshot, QuotaThresholds, QuotaUsage};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::ConfigError;
use crate::quota::{find_quota, QuotaSource, QuotaSourceError};

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub ttl: Duration,
    pub max_entries: usize,
    pub thresholds: QuotaThresholds,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 512,
            thresholds: QuotaThresholds::default(),
        }
    }
}

impl QuotaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::QuotaCacheSize);
        }
        self.thresholds.validate()?;
        Ok(())
    }
}

/// Outcome of a single-quota lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum QuotaLookup {
    Found(QuotaSnapshot),
    NotFound,
    /// The source failed; the reason is not cached.
    Unknown(String),
}

impl QuotaLookup {
    pub fn snapshot(&self) -> Option<&QuotaSnapshot> {
        match self {
            QuotaLookup::Found(s) => Some(s),
            _ => None,
        }
    }
}

/// TTL cache of quota snapshots in front of a [`QuotaSource`].
///
/// Concurrent misses on the same key share one fetch. When the account-level listing
/// fails, the source's default quotas are used instead if it has any. Source failures
/// are logged and reported as "unknown", never cached, and never propagated as errors.
pub struct QuotaChecker<S> {
    source: S,
    config: QuotaConfig,
    state: Mutex<State>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Quota { service: String, name: String },
    Service(String),
}

#[derive(Debug, Clone)]
enum Cached {
    One(Option<QuotaSnapshot>),
    Many(Vec<QuotaSnapshot>),
}

struct State {
    cache: HashMap<CacheKey, CacheEntry>,
    inflight: HashMap<CacheKey, Arc<Notify>>,
}

struct CacheEntry {
    value: Cached,
    expires_at: Instant,
    last_accessed: Instant,
}

impl State {
    fn fresh(&mut self, key: &CacheKey) -> Option<Cached> {
        let entry = self.cache.get_mut(key)?;
        let now = Instant::now();
        if now < entry.expires_at {
            entry.last_accessed = now;
            return Some(entry.value.clone());
        }
        None
    }

    fn insert(&mut self, key: CacheKey, value: Cached, ttl: Duration, max_entries: usize) {
        enforce_capacity(&mut self.cache, max_entries);
        let now = Instant::now();
        self.cache.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
                last_accessed: now,
            },
        );
    }
}

impl<S> QuotaChecker<S>
where
    S: QuotaSource,
{
    pub fn new(source: S, config: QuotaConfig) -> Self {
        Self {
            source,
            config,
            state: Mutex::new(State {
                cache: HashMap::new(),
                inflight: HashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    pub async fn get_quota(&self, service: &str, quota_name: &str) -> QuotaLookup {
        let key = CacheKey::Quota {
            service: service.to_string(),
            name: quota_name.to_lowercase(),
        };
        let thresholds = self.config.thresholds;
        let fetched = self
            .load(key, || async move {
                let found = match self.source.quota(service, quota_name).await {
                    Ok(found) => found,
                    Err(err) => find_quota(self.defaults_or(service, err).await?, quota_name),
                };
                Ok(Cached::One(
                    found.map(|usage| QuotaSnapshot::from_usage(usage, &thresholds)),
                ))
            })
            .await;

        match fetched {
            Ok(Cached::One(Some(snapshot))) => QuotaLookup::Found(snapshot),
            Ok(Cached::One(None)) => QuotaLookup::NotFound,
            Ok(Cached::Many(_)) => QuotaLookup::NotFound,
            Err(err) => {
                tracing::warn!(service, quota = quota_name, error = %err, "quota lookup failed");
                QuotaLookup::Unknown(err.to_string())
            }
        }
    }

    /// All quotas for `service`; empty when the source fails.
    pub async fn get_service_quotas(&self, service: &str) -> Vec<QuotaSnapshot> {
        let thresholds = self.config.thresholds;
        let fetched = self
            .load(CacheKey::Service(service.to_string()), || async move {
                let quotas = match self.source.service_quotas(service).await {
                    Ok(quotas) => quotas,
                    Err(err) => self.defaults_or(service, err).await?,
                };
                Ok(Cached::Many(snapshots(quotas, &thresholds)))
            })
            .await;

        match fetched {
            Ok(Cached::Many(all)) => {
                self.prime(service, &all);
                all
            }
            Ok(Cached::One(one)) => one.into_iter().collect(),
            Err(err) => {
                tracing::warn!(service, error = %err, "listing service quotas failed");
                Vec::new()
            }
        }
    }

    /// Quotas for `service` at WARNING or above.
    pub async fn high_usage(&self, service: &str) -> Vec<QuotaSnapshot> {
        self.get_service_quotas(service)
            .await
            .into_iter()
            .filter(|q| q.status.is_high())
            .collect()
    }

    pub async fn clear(&self) {
        self.state.lock().cache.clear();
    }

    /// Provider defaults for `service`, or `err` when there are none.
    async fn defaults_or(
        &self,
        service: &str,
        err: QuotaSourceError,
    ) -> Result<Vec<QuotaUsage>, QuotaSourceError> {
        tracing::debug!(service, error = %err, "account quotas unavailable, trying defaults");
        match self.source.default_quotas(service).await {
            Ok(defaults) if !defaults.is_empty() => Ok(defaults),
            Ok(_) => Err(err),
            Err(default_err) => {
                tracing::debug!(service, error = %default_err, "default quotas unavailable");
                Err(err)
            }
        }
    }

    /// Seed exact-name entries from a service listing.
    fn prime(&self, service: &str, all: &[QuotaSnapshot]) {
        let mut s = self.state.lock();
        for snapshot in all {
            let key = CacheKey::Quota {
                service: service.to_string(),
                name: snapshot.quota_name.to_lowercase(),
            };
            if s.fresh(&key).is_none() {
                s.insert(
                    key,
                    Cached::One(Some(snapshot.clone())),
                    self.config.ttl,
                    self.config.max_entries,
                );
            }
        }
    }

    async fn load<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Cached, QuotaSourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Cached, QuotaSourceError>>,
    {
        let notify = loop {
            let pending = {
                let mut s = self.state.lock();
                if let Some(value) = s.fresh(&key) {
                    tracing::debug!(?key, "quota cache hit");
                    return Ok(value);
                }
                let existing = s.inflight.get(&key).cloned();
                match existing {
                    Some(n) => n,
                    None => {
                        let notify = Arc::new(Notify::new());
                        s.inflight.insert(key.clone(), notify.clone());
                        break notify;
                    }
                }
            };

            let notified = pending.notified();
            // The fetch may have finished between releasing the lock and registering.
            let still_pending = self
                .state
                .lock()
                .inflight
                .get(&key)
                .is_some_and(|n| Arc::ptr_eq(n, &pending));
            if still_pending {
                notified.await;
            }
        };

        let guard = InflightGuard {
            state: &self.state,
            key: key.clone(),
            notify,
        };
        let fetched = fetch().await;
        if let Ok(value) = &fetched {
            self.state.lock().insert(
                key,
                value.clone(),
                self.config.ttl,
                self.config.max_entries,
            );
        }
        drop(guard);
        fetched
    }
}

/// Releases an inflight slot and wakes its waiters, also when the fetching future is dropped.
struct InflightGuard<'a> {
    state: &'a Mutex<State>,
    key: CacheKey,
    notify: Arc<Notify>,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        {
            let mut s = self.state.lock();
            let ours = s
                .inflight
                .get(&self.key)
                .is_some_and(|n| Arc::ptr_eq(n, &self.notify));
            if ours {
                s.inflight.remove(&self.key);
            }
        }
        self.notify.notify_waiters();
    }
}

fn snapshots(quotas: Vec<QuotaUsage>, thresholds: &QuotaThresholds) -> Vec<QuotaSnapshot> {
    quotas
        .into_iter()
        .map(|usage| QuotaSnapshot::from_usage(usage, thresholds))
        .collect()
}

fn enforce_capacity(cache: &mut HashMap<CacheKey, CacheEntry>, max_entries: usize) {
    if cache.len() < max_entries {
        return;
    }
    let now = Instant::now();
    cache.retain(|_, v| v.expires_at > now);

    while cache.len() >= max_entries {
        let oldest = cache
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(k, _)| k.clone());
        match oldest {
            Some(k) => {
                cache.remove(&k);
            }
            None => break,
        }
    }
}
