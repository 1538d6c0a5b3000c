//! Scoped cache for table reads and read-only RPC results.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use parfumerie_core::UserId;

/// Who a cached response was fetched for.
///
/// Row-level security makes results depend on the caller, so entries are
/// never shared between scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheScope {
    Anon,
    User(UserId),
    Service,
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anon => f.write_str("anon"),
            Self::User(id) => write!(f, "user:{id}"),
            Self::Service => f.write_str("service"),
        }
    }
}

/// Cache key: scope, resource (table or `rpc:{name}`) and canonical params.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: CacheScope,
    pub resource: String,
    pub params: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(scope: CacheScope, resource: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            scope,
            resource: resource.into(),
            params: params.into(),
        }
    }

    /// Resource name used for an RPC's cached results.
    #[must_use]
    pub fn rpc_resource(name: &str) -> String {
        format!("rpc:{name}")
    }
}

/// A cached response body with its total count, if the server sent one.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: Arc<serde_json::Value>,
    pub count: Option<u64>,
}

/// In-memory response cache shared by every clone of a client.
#[derive(Clone)]
pub struct QueryCache {
    inner: Cache<CacheKey, CachedResponse>,
}

impl QueryCache {
    /// Create a cache with the given time-to-live and entry limit.
    #[must_use]
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { inner }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, value: CachedResponse) {
        self.inner.insert(key, value).await;
    }

    /// Drop every entry for `resource`, across all scopes.
    pub fn invalidate_resource(&self, resource: &str) {
        let target = resource.to_string();
        if let Err(e) = self
            .inner
            .invalidate_entries_if(move |key, _| key.resource == target)
        {
            tracing::warn!(error = %e, resource, "Predicate invalidation failed, clearing cache");
            self.inner.invalidate_all();
        }
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Apply pending evictions and invalidations now.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(v: serde_json::Value) -> CachedResponse {
        CachedResponse {
            body: Arc::new(v),
            count: None,
        }
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let cache = QueryCache::new(Duration::from_secs(60), 100);
        let user = UserId::new(uuid::Uuid::new_v4());
        cache
            .insert(
                CacheKey::new(CacheScope::User(user), "orders", "select=*"),
                value(json!([{"id": 1}])),
            )
            .await;

        assert!(
            cache
                .get(&CacheKey::new(CacheScope::Anon, "orders", "select=*"))
                .await
                .is_none()
        );
        assert!(
            cache
                .get(&CacheKey::new(CacheScope::User(user), "orders", "select=*"))
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_invalidate_resource_spans_scopes() {
        let cache = QueryCache::new(Duration::from_secs(60), 100);
        let user = UserId::new(uuid::Uuid::new_v4());
        let anon_key = CacheKey::new(CacheScope::Anon, "products", "select=*");
        let user_key = CacheKey::new(CacheScope::User(user), "products", "limit=1");
        let brands_key = CacheKey::new(CacheScope::Anon, "brands", "select=*");
        for key in [&anon_key, &user_key, &brands_key] {
            cache.insert(key.clone(), value(json!([]))).await;
        }

        cache.invalidate_resource("products");

        assert!(cache.get(&anon_key).await.is_none());
        assert!(cache.get(&user_key).await.is_none());
        assert!(cache.get(&brands_key).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = QueryCache::new(Duration::from_secs(60), 100);
        let key = CacheKey::new(CacheScope::Anon, CacheKey::rpc_resource("is_staff"), "{}");
        cache.insert(key.clone(), value(json!(true))).await;
        cache.invalidate_all();
        assert!(cache.get(&key).await.is_none());
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(CacheScope::Anon.to_string(), "anon");
        assert_eq!(CacheScope::Service.to_string(), "service");
        assert_eq!(CacheKey::rpc_resource("is_staff"), "rpc:is_staff");
    }
}
