//! REST and RPC client for the hosted backend.
//!
//! Reads go through the scoped [`QueryCache`]; writes invalidate the
//! resources they touch. Every request carries the `apikey` header and a
//! bearer token for the current [`Credentials`].

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use parfumerie_core::UserId;

use crate::cache::{CacheKey, CacheScope, CachedResponse, QueryCache};
use crate::config::BackendConfig;
use crate::error::{ApiErrorBody, BackendError};
use crate::query::{Query, encode_pairs};

/// Who requests are made as.
#[derive(Clone)]
pub enum Credentials {
    /// Public access with the anon key.
    Anon,
    /// A signed-in user; row-level security applies.
    User {
        access_token: SecretString,
        user_id: UserId,
    },
    /// Operator access with the service role key.
    Service,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anon => f.write_str("Anon"),
            Self::User { user_id, .. } => f
                .debug_struct("User")
                .field("access_token", &"[REDACTED]")
                .field("user_id", user_id)
                .finish(),
            Self::Service => f.write_str("Service"),
        }
    }
}

/// One page of rows and the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: u64,
}

impl<T> Page<T> {
    /// Transform every row, keeping the count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            count: self.count,
        }
    }
}

/// Client for the hosted backend.
///
/// Cloning is cheap; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
    credentials: Credentials,
}

struct BackendClientInner {
    http: reqwest::Client,
    url: String,
    anon_key: SecretString,
    service_role_key: Option<SecretString>,
    cache: QueryCache,
}

impl BackendClient {
    /// Create an anonymous client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(BackendClientInner {
                http: reqwest::Client::new(),
                url: config.url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
                cache: QueryCache::new(config.cache_ttl, config.cache_capacity),
            }),
            credentials: Credentials::Anon,
        }
    }

    /// A client acting as a signed-in user, sharing this client's cache.
    #[must_use]
    pub fn as_user(&self, access_token: &str, user_id: UserId) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            credentials: Credentials::User {
                access_token: SecretString::from(access_token.to_string()),
                user_id,
            },
        }
    }

    /// A client using the service role key.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if no service role key is configured.
    pub fn as_service(&self) -> Result<Self, BackendError> {
        if self.inner.service_role_key.is_none() {
            return Err(BackendError::Unauthorized(
                "service role key is not configured".to_string(),
            ));
        }
        Ok(Self {
            inner: Arc::clone(&self.inner),
            credentials: Credentials::Service,
        })
    }

    /// A public client sharing this client's cache.
    #[must_use]
    pub fn anon(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            credentials: Credentials::Anon,
        }
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match &self.credentials {
            Credentials::User { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    /// Cache partition for this client's credentials.
    #[must_use]
    pub const fn scope(&self) -> CacheScope {
        match &self.credentials {
            Credentials::Anon => CacheScope::Anon,
            Credentials::User { user_id, .. } => CacheScope::User(*user_id),
            Credentials::Service => CacheScope::Service,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn anon_key(&self) -> &str {
        self.inner.anon_key.expose_secret()
    }

    /// Attach `apikey` and `Authorization` for the current credentials.
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let (apikey, bearer) = match &self.credentials {
            Credentials::Anon => (self.anon_key(), self.anon_key()),
            Credentials::User { access_token, .. } => {
                (self.anon_key(), access_token.expose_secret())
            }
            Credentials::Service => {
                let key = self
                    .inner
                    .service_role_key
                    .as_ref()
                    .map_or_else(|| self.anon_key(), |k| k.expose_secret());
                (key, key)
            }
        };
        request
            .header("apikey", apikey)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.inner.url)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch one page of rows, using the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows do not deserialize.
    #[instrument(skip(self, query), fields(table = %query.table_name(), scope = %self.scope()))]
    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Page<T>, BackendError> {
        let key = CacheKey::new(self.scope(), query.table_name(), cache_params(query));

        if let Some(cached) = self.inner.cache.get(&key).await {
            debug!("Cache hit for query");
            return decode_page(&cached);
        }

        let fresh = self.fetch_raw(query).await?;
        self.inner.cache.insert(key, fresh.clone()).await;
        decode_page(&fresh)
    }

    /// Fetch one page of rows, bypassing the cache.
    ///
    /// Used where a stale read would be wrong, such as stock checks at checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows do not deserialize.
    #[instrument(skip(self, query), fields(table = %query.table_name(), scope = %self.scope()))]
    pub async fn fetch_fresh<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Page<T>, BackendError> {
        let fresh = self.fetch_raw(query).await?;
        decode_page(&fresh)
    }

    /// First row of a query, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row does not deserialize.
    pub async fn fetch_one<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Option<T>, BackendError> {
        let page = self
            .fetch::<T>(&query.clone().with_count(false).limit(1))
            .await?;
        Ok(page.data.into_iter().next())
    }

    /// Number of rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn count(&self, query: &Query) -> Result<u64, BackendError> {
        let page = self
            .fetch::<serde_json::Value>(&query.clone().select("id").with_count(true).limit(1))
            .await?;
        Ok(page.count)
    }

    async fn fetch_raw(&self, query: &Query) -> Result<CachedResponse, BackendError> {
        let url = format!(
            "{}?{}",
            self.rest_url(query.table_name()),
            query.to_query_string()
        );
        let mut request = self.authorize(self.inner.http.get(url));
        if query.wants_count() {
            request = request.header("Prefer", "count=exact");
        }

        let table = query.table_name();
        let (headers, text) = read_response(send(request, table).await?, table).await?;
        let body: serde_json::Value = parse_json(&text, query.table_name())?;
        let count = headers
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        Ok(CachedResponse {
            body: Arc::new(body),
            count,
        })
    }

    // =========================================================================
    // RPC
    // =========================================================================

    /// Call a read-only remote procedure, caching the result under `rpc:{name}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result does not deserialize.
    #[instrument(skip(self, params), fields(scope = %self.scope()))]
    pub async fn rpc_query<P, R>(&self, name: &str, params: &P) -> Result<R, BackendError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let key = CacheKey::new(
            self.scope(),
            CacheKey::rpc_resource(name),
            serde_json::to_string(params)?,
        );

        if let Some(cached) = self.inner.cache.get(&key).await {
            debug!("Cache hit for rpc");
            return Ok(R::deserialize(cached.body.as_ref())?);
        }

        let body = self.call_rpc(name, params).await?;
        let result = R::deserialize(&body)?;
        self.inner
            .cache
            .insert(
                key,
                CachedResponse {
                    body: Arc::new(body),
                    count: None,
                },
            )
            .await;
        Ok(result)
    }

    /// Call a remote procedure that changes data.
    ///
    /// Never cached. On success every resource in `invalidates` is dropped
    /// from the cache; on failure nothing is.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result does not deserialize.
    #[instrument(skip(self, params), fields(scope = %self.scope()))]
    pub async fn rpc_mutation<P, R>(
        &self,
        name: &str,
        params: &P,
        invalidates: &[&str],
    ) -> Result<R, BackendError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = self.call_rpc(name, params).await?;
        let result = R::deserialize(&body)?;
        self.invalidate_many(invalidates);
        Ok(result)
    }

    async fn call_rpc<P: Serialize + ?Sized>(
        &self,
        name: &str,
        params: &P,
    ) -> Result<serde_json::Value, BackendError> {
        let context = format!("rpc/{name}");
        let request = self
            .authorize(self.inner.http.post(self.rest_url(&context)))
            .json(params);
        let (_, text) = read_response(send(request, &context).await?, &context).await?;
        parse_json(&text, &context)
    }

    // =========================================================================
    // Table mutations
    // =========================================================================

    /// Insert one row or an array of rows and return what was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails or rows do not deserialize.
    #[instrument(skip(self, rows), fields(scope = %self.scope()))]
    pub async fn insert<B, T>(
        &self,
        table: &str,
        rows: &B,
        invalidates: &[&str],
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .authorize(self.inner.http.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(rows);
        self.mutate(request, table, invalidates).await
    }

    /// Patch every row matching `query`'s filters.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::UnfilteredMutation` if `query` has no filters,
    /// or an error if the update fails.
    #[instrument(skip(self, query, patch), fields(table = %query.table_name(), scope = %self.scope()))]
    pub async fn update<B, T>(
        &self,
        query: &Query,
        patch: &B,
        invalidates: &[&str],
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.filtered_url(query, "update")?;
        let request = self
            .authorize(self.inner.http.patch(url))
            .header("Prefer", "return=representation")
            .json(patch);
        self.mutate(request, query.table_name(), invalidates).await
    }

    /// Delete every row matching `query`'s filters.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::UnfilteredMutation` if `query` has no filters,
    /// or an error if the delete fails.
    #[instrument(skip(self, query), fields(table = %query.table_name(), scope = %self.scope()))]
    pub async fn delete<T: DeserializeOwned>(
        &self,
        query: &Query,
        invalidates: &[&str],
    ) -> Result<Vec<T>, BackendError> {
        let url = self.filtered_url(query, "delete")?;
        let request = self
            .authorize(self.inner.http.delete(url))
            .header("Prefer", "return=representation");
        self.mutate(request, query.table_name(), invalidates).await
    }

    fn filtered_url(&self, query: &Query, verb: &'static str) -> Result<String, BackendError> {
        if !query.has_filters() {
            return Err(BackendError::UnfilteredMutation(
                verb,
                query.table_name().to_string(),
            ));
        }
        Ok(format!(
            "{}?{}",
            self.rest_url(query.table_name()),
            encode_pairs(&query.mutation_pairs())
        ))
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        table: &str,
        invalidates: &[&str],
    ) -> Result<Vec<T>, BackendError> {
        let (_, text) = read_response(send(request, table).await?, table).await?;
        let rows: Vec<T> = if text.trim().is_empty() {
            Vec::new()
        } else {
            parse_json(&text, table)?
        };
        self.invalidate(table);
        self.invalidate_many(invalidates);
        Ok(rows)
    }

    // =========================================================================
    // Cache control
    // =========================================================================

    /// Drop cached reads of `resource` for every scope.
    pub fn invalidate(&self, resource: &str) {
        debug!(resource, "Invalidating cache");
        self.inner.cache.invalidate_resource(resource);
    }

    fn invalidate_many(&self, resources: &[&str]) {
        for resource in resources {
            self.invalidate(resource);
        }
    }

    /// Drop every cached read.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("url", &self.inner.url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Cache parameters for a read: the query string plus whether a total was asked for.
fn cache_params(query: &Query) -> String {
    let params = query.to_query_string();
    if query.wants_count() {
        format!("{params}&count=exact")
    } else {
        params
    }
}

/// Send a request, logging transport failures.
pub(crate) async fn send(
    request: RequestBuilder,
    context: &str,
) -> Result<reqwest::Response, BackendError> {
    request.send().await.map_err(|e| {
        tracing::error!(error = %e, context, "Backend request failed");
        BackendError::Http(e)
    })
}

/// Check status and return headers and body text.
///
/// Non-success responses are logged and mapped to [`BackendError`].
pub(crate) async fn read_response(
    response: reqwest::Response,
    context: &str,
) -> Result<(HeaderMap, String), BackendError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        tracing::warn!(context, retry_after, "Backend rate limited request");
        return Err(BackendError::RateLimited(retry_after));
    }

    let headers = response.headers().clone();
    let text = response.text().await?;

    if !status.is_success() {
        let body = ApiErrorBody::parse(&text);
        tracing::error!(
            status = %status,
            context,
            code = body.code.as_deref().unwrap_or(""),
            message = %body.message,
            "Backend returned non-success status"
        );
        return Err(BackendError::from_status(status, body));
    }

    Ok((headers, text))
}

/// Parse a JSON body; an empty body parses as `null`.
pub(crate) fn parse_json<T: DeserializeOwned>(text: &str, context: &str) -> Result<T, BackendError> {
    let parsed = if text.trim().is_empty() {
        T::deserialize(serde_json::Value::Null)
    } else {
        serde_json::from_str(text)
    };
    parsed.map_err(|e| {
        tracing::error!(
            error = %e,
            context,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        BackendError::Parse(e)
    })
}

fn decode_page<T: DeserializeOwned>(cached: &CachedResponse) -> Result<Page<T>, BackendError> {
    let data = Vec::<T>::deserialize(cached.body.as_ref())?;
    let count = cached
        .count
        .unwrap_or_else(|| u64::try_from(data.len()).unwrap_or(u64::MAX));
    Ok(Page { data, count })
}

/// Total from a `Content-Range` header such as `0-11/42` or `*/0`.
#[must_use]
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.split_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-11/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-11/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_parse_json_empty_body_is_null() {
        assert!(parse_json::<()>("", "test").is_ok());
        let none: Option<i32> = parse_json("  ", "test").unwrap_or(Some(1));
        assert_eq!(none, None);
    }

    #[test]
    fn test_decode_page_falls_back_to_len() {
        let cached = CachedResponse {
            body: Arc::new(serde_json::json!([1, 2, 3])),
            count: None,
        };
        let page: Page<i32> = decode_page(&cached).unwrap_or_else(|_| Page {
            data: Vec::new(),
            count: 99,
        });
        assert_eq!(page.count, 3);
        assert_eq!(page.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_scope_follows_credentials() {
        let client = BackendClient::new(&BackendConfig::new("http://localhost:1", "anon"));
        assert_eq!(client.scope(), CacheScope::Anon);

        let user = UserId::new(uuid::Uuid::new_v4());
        let as_user = client.as_user("token", user);
        assert_eq!(as_user.scope(), CacheScope::User(user));
        assert_eq!(as_user.user_id(), Some(user));
        assert!(client.as_service().is_err());
    }

    #[test]
    fn test_cache_params_distinguish_count() {
        let query = Query::table("brands").select("id").limit(1);
        assert_ne!(
            cache_params(&query.clone().with_count(true)),
            cache_params(&query.clone().with_count(false))
        );
        assert_eq!(
            cache_params(&query.clone().with_count(false)),
            query.with_count(false).to_query_string()
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        // Nothing listens on the discard port
        let client = BackendClient::new(&BackendConfig::new("http://127.0.0.1:9", "anon"));
        let result = client.fetch_fresh::<serde_json::Value>(&Query::table("brands")).await;
        assert!(matches!(result, Err(BackendError::Http(_))));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = BackendClient::new(&BackendConfig::new("http://localhost:1", "anon"))
            .as_user("very-secret-token", UserId::new(uuid::Uuid::new_v4()));
        assert!(!format!("{client:?}").contains("very-secret-token"));
    }
}
