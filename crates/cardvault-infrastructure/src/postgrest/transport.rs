//! PostgREST transport seam and its reqwest implementation.

use async_trait::async_trait;
use cardvault_core::error::{CardvaultError, Result};
use reqwest::Client;
use serde_json::Value;

use super::query::{Filter, SelectQuery, parse_content_range_total};
use crate::http::{ApiCredentials, REQUEST_TIMEOUT, check_response, request_error};

/// Rows returned by a select, with the exact total when it was requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub rows: Vec<Value>,
    pub total: Option<usize>,
}

/// Raw table access. The catalog repository speaks to the store only through
/// this trait, so it can be exercised without a network.
#[async_trait]
pub trait PostgrestTransport: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> Result<Rows>;

    /// Inserts `rows` (an object or an array) and returns the stored rows.
    async fn insert(&self, table: &str, rows: Value) -> Result<Vec<Value>>;

    /// Inserts `rows`, silently skipping those that conflict on `on_conflict`.
    async fn insert_ignore_duplicates(&self, table: &str, rows: Value, on_conflict: &str)
    -> Result<()>;

    /// Updates matching rows and returns how many matched.
    async fn update(&self, table: &str, filters: &[Filter], body: Value) -> Result<usize>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()>;
}

/// PostgREST over HTTP at `<api_url>/rest/v1`.
#[derive(Debug, Clone)]
pub struct HttpPostgrestTransport {
    client: Client,
    rest_url: String,
    credentials: ApiCredentials,
}

impl HttpPostgrestTransport {
    pub fn new(api_url: &str, credentials: ApiCredentials) -> Self {
        Self {
            client: Client::new(),
            rest_url: format!("{}/rest/v1", api_url.trim_end_matches('/')),
            credentials,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
        filters.iter().map(Filter::to_pair).collect()
    }
}

#[async_trait]
impl PostgrestTransport for HttpPostgrestTransport {
    async fn select(&self, query: &SelectQuery) -> Result<Rows> {
        let mut request = self
            .client
            .get(self.table_url(&query.table))
            .query(&query.to_pairs())
            .timeout(REQUEST_TIMEOUT);
        if query.count_exact {
            request = request.header("Prefer", "count=exact");
        }
        let request = self.credentials.apply(request).await?;

        tracing::debug!(table = %query.table, filters = query.filters.len(), "PostgREST select");
        let response = request
            .send()
            .await
            .map_err(|e| request_error("Select request failed", e))?;
        let response = check_response(response).await?;

        let total = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| request_error("Failed to parse select response", e))?;

        Ok(Rows { rows, total })
    }

    async fn insert(&self, table: &str, rows: Value) -> Result<Vec<Value>> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&rows)
            .timeout(REQUEST_TIMEOUT);
        let request = self.credentials.apply(request).await?;

        tracing::debug!(%table, "PostgREST insert");
        let response = request
            .send()
            .await
            .map_err(|e| request_error("Insert request failed", e))?;
        let response = check_response(response).await?;

        let stored: Value = response
            .json()
            .await
            .map_err(|e| request_error("Failed to parse insert response", e))?;
        match stored {
            Value::Array(rows) => Ok(rows),
            Value::Object(_) => Ok(vec![stored]),
            other => Err(CardvaultError::remote(
                200,
                None,
                format!("Unexpected insert response: {}", other),
            )),
        }
    }

    async fn insert_ignore_duplicates(
        &self,
        table: &str,
        rows: Value,
        on_conflict: &str,
    ) -> Result<()> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(&rows)
            .timeout(REQUEST_TIMEOUT);
        let request = self.credentials.apply(request).await?;

        tracing::debug!(%table, %on_conflict, "PostgREST upsert");
        let response = request
            .send()
            .await
            .map_err(|e| request_error("Upsert request failed", e))?;
        check_response(response).await?;
        Ok(())
    }

    async fn update(&self, table: &str, filters: &[Filter], body: Value) -> Result<usize> {
        // PostgREST answers 2xx even when nothing matched; count the returned keys.
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&Self::filter_pairs(filters))
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(&body)
            .timeout(REQUEST_TIMEOUT);
        let request = self.credentials.apply(request).await?;

        tracing::debug!(%table, "PostgREST update");
        let response = request
            .send()
            .await
            .map_err(|e| request_error("Update request failed", e))?;
        let response = check_response(response).await?;

        let matched: Vec<Value> = response
            .json()
            .await
            .map_err(|e| request_error("Failed to parse update response", e))?;
        Ok(matched.len())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        if filters.is_empty() {
            return Err(CardvaultError::internal(format!(
                "Refusing unfiltered delete on '{}'",
                table
            )));
        }
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&Self::filter_pairs(filters))
            .header("Prefer", "return=minimal")
            .timeout(REQUEST_TIMEOUT);
        let request = self.credentials.apply(request).await?;

        tracing::debug!(%table, "PostgREST delete");
        let response = request
            .send()
            .await
            .map_err(|e| request_error("Delete request failed", e))?;
        check_response(response).await?;
        Ok(())
    }
}
