use fanout_core::QuotaUsage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaSourceError {
    #[error("quota lookup for {service} denied: {message}")]
    AccessDenied { service: String, message: String },
    #[error("quota source unavailable for {service}: {message}")]
    Unavailable { service: String, message: String },
}

/// External source of quota limits and usage.
#[async_trait::async_trait]
pub trait QuotaSource: Send + Sync {
    async fn service_quotas(&self, service: &str) -> Result<Vec<QuotaUsage>, QuotaSourceError>;

    /// One quota by name; the default implementation filters [`service_quotas`](Self::service_quotas).
    async fn quota(
        &self,
        service: &str,
        quota_name: &str,
    ) -> Result<Option<QuotaUsage>, QuotaSourceError> {
        let quotas = self.service_quotas(service).await?;
        Ok(find_quota(quotas, quota_name))
    }

    /// Provider-wide default quotas, used when the account-level listing fails.
    ///
    /// Sources without such a listing keep the default, which has none.
    async fn default_quotas(&self, _service: &str) -> Result<Vec<QuotaUsage>, QuotaSourceError> {
        Ok(Vec::new())
    }
}

/// Case-insensitive exact name match, else the first name containing `name`.
pub fn find_quota(quotas: Vec<QuotaUsage>, name: &str) -> Option<QuotaUsage> {
    let needle = name.to_lowercase();
    let exact = quotas
        .iter()
        .position(|q| q.quota_name.to_lowercase() == needle)
        .or_else(|| {
            quotas
                .iter()
                .position(|q| q.quota_name.to_lowercase().contains(&needle))
        })?;
    quotas.into_iter().nth(exact)
}
