// Bucket listing via the Cloud Storage JSON API.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::auth::SharedTokenSource;
use crate::http;
use crate::models::Bucket;

/// Source of the buckets to report on. Failures are fatal to the run.
#[async_trait]
pub trait BucketSource: Send + Sync {
    /// All buckets of the project, in listing order.
    async fn list_buckets(&self) -> anyhow::Result<Vec<Bucket>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketsPage {
    #[serde(default)]
    items: Vec<Bucket>,
    next_page_token: Option<String>,
}

pub struct StorageRepo {
    client: reqwest::Client,
    tokens: SharedTokenSource,
    base_url: String,
    project_id: String,
}

impl StorageRepo {
    pub fn new(
        client: reqwest::Client,
        tokens: SharedTokenSource,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.into(),
            project_id: project_id.into(),
        }
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> anyhow::Result<BucketsPage> {
        let token = self.tokens.access_token().await?;
        let mut query = vec![
            ("project", self.project_id.as_str()),
            ("fields", "items(name,location),nextPageToken"),
        ];
        if let Some(t) = page_token {
            query.push(("pageToken", t));
        }
        let resp = self
            .client
            .get(http::join(&self.base_url, "/storage/v1/b"))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await
            .context("list buckets request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "list buckets for project {} failed: HTTP {}: {}",
                self.project_id,
                status,
                body.trim()
            );
        }
        resp.json::<BucketsPage>()
            .await
            .context("decode bucket listing")
    }
}

#[async_trait]
impl BucketSource for StorageRepo {
    #[instrument(skip(self), fields(repo = "storage", operation = "list_buckets", project_id = %self.project_id))]
    async fn list_buckets(&self) -> anyhow::Result<Vec<Bucket>> {
        let mut buckets = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.fetch_page(page_token.as_deref()).await?;
            buckets.extend(page.items);
            match page.next_page_token {
                Some(t) if !t.is_empty() => page_token = Some(t),
                _ => break,
            }
        }
        debug!(buckets_count = buckets.len(), "Buckets listed");
        Ok(buckets)
    }
}
