//! PostgREST row store
//!
//! Speaks the REST dialect of a hosted Postgres backend:
//! `GET/POST/PATCH/DELETE {url}/rest/v1/{table}` with `col=eq.value` filters.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Query, RowStore, Table};

const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";
const PREFER_REPRESENTATION: &str = "return=representation";

#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL, without the `/rest/v1` suffix
    pub url: String,

    /// Public API key sent as `apikey`
    pub anon_key: String,

    /// Signed-in user's token; the anon key is used as bearer when absent
    pub access_token: Option<String>,

    pub timeout_secs: u64,
}

/// Row store backed by a PostgREST endpoint
pub struct RestStore {
    config: RestStoreConfig,
    client: Client,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> Result<Self> {
        Url::parse(&config.url)
            .map_err(|e| Error::config_field_invalid("store.url", e.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn table_url(&self, table: Table) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            table.name()
        )
    }

    fn bearer(&self) -> &str {
        self.config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key)
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
    }

    /// Send and map transport failures and non-2xx statuses to store errors
    async fn send(&self, table: Table, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::store_request(table.name(), e.to_string()))?;

        let status = response.status();
        debug!(table = %table, status = %status, "Store response");

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(table = %table, status = %status, "Store request rejected");
            Err(Error::StoreStatus {
                table: table.name().to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn read_rows(&self, table: Table, response: Response) -> Result<Vec<Value>> {
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| Error::store_decode(table.name(), e.to_string()))
    }
}

/// PostgREST query-string pairs for `query`
fn query_pairs(query: &Query) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = query
        .filters
        .iter()
        .map(|(column, value)| (column.clone(), format!("eq.{}", value)))
        .collect();
    if let Some((column, direction)) = &query.order {
        pairs.push(("order".to_string(), format!("{}.{}", column, direction.as_str())));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }
    pairs
}

#[async_trait]
impl RowStore for RestStore {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(query_pairs(query));

        let request = self.request(Method::GET, table).query(&pairs);
        let response = self.send(table, request).await?;
        self.read_rows(table, response).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<()> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", PREFER_MINIMAL)
            .json(&row);
        self.send(table, request).await?;
        Ok(())
    }

    async fn upsert(&self, table: Table, row: Value) -> Result<()> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", PREFER_UPSERT)
            .json(&row);
        self.send(table, request).await?;
        Ok(())
    }

    async fn update(&self, table: Table, query: &Query, patch: Value) -> Result<usize> {
        let request = self
            .request(Method::PATCH, table)
            .header("Prefer", PREFER_REPRESENTATION)
            .query(&query_pairs(query))
            .json(&patch);
        let response = self.send(table, request).await?;
        Ok(self.read_rows(table, response).await?.len())
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<usize> {
        let request = self
            .request(Method::DELETE, table)
            .header("Prefer", PREFER_REPRESENTATION)
            .query(&query_pairs(query));
        let response = self.send(table, request).await?;
        Ok(self.read_rows(table, response).await?.len())
    }
}
