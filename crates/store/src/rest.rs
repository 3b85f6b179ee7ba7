use std::time::Duration;

use khata_core::TransactionCandidate;
use serde::Deserialize;

use crate::api::{PageRequest, StoreError, StoredTransaction, TransactionStore};

/// REST client for the persistence API.
///
/// The bearer token scopes every request to one owner; the owner is never
/// part of any payload or query string.
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    inserted: u64,
}

impl RestStore {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl TransactionStore for RestStore {
    async fn insert_batch(&self, rows: Vec<TransactionCandidate>) -> Result<u64, StoreError> {
        let url = format!("{}/transactions/batch", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "transactions": rows }))
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let body: InsertResponse = resp.json().await?;
        Ok(body.inserted)
    }

    async fn fetch_page(&self, req: PageRequest) -> Result<Vec<StoredTransaction>, StoreError> {
        let url = format!("{}/transactions", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("order", "date.desc".to_string()),
                ("offset", req.offset.to_string()),
                ("limit", req.limit.to_string()),
            ])
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }
}
