// Time series reads via the Cloud Monitoring v3 REST API (projects.timeSeries.list).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::auth::{AuthError, SharedTokenSource};
use crate::http;
use crate::models::{MetricKind, TimeWindow};

/// Resource type of Cloud Storage bucket metrics.
pub const BUCKET_RESOURCE_TYPE: &str = "gcs_bucket";

/// One (bucket, metric) query over the report window.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub bucket_name: String,
    pub metric: MetricKind,
    pub window: TimeWindow,
    pub alignment_period_secs: u64,
}

impl MetricQuery {
    pub fn filter(&self) -> String {
        format!(
            r#"metric.type="{}" AND resource.type="{}" AND resource.labels.bucket_name="{}""#,
            self.metric.metric_type(),
            BUCKET_RESOURCE_TYPE,
            self.bucket_name
        )
    }

    /// Query string of a timeSeries.list request, without the page token.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("filter", self.filter()),
            ("interval.startTime", self.window.start_rfc3339()),
            ("interval.endTime", self.window.end_rfc3339()),
            (
                "aggregation.alignmentPeriod",
                format!("{}s", self.alignment_period_secs),
            ),
            (
                "aggregation.perSeriesAligner",
                self.metric.aligner().as_api_str().to_string(),
            ),
            ("view", "FULL".to_string()),
        ]
    }
}

/// Coarse classification of a failed query, used for substitution policy and run stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricQueryErrorKind {
    Unreachable,
    Rejected,
    Malformed,
    Auth,
}

#[derive(Debug, Error)]
pub enum MetricQueryError {
    /// Transport failure or timeout; the service never answered.
    #[error("monitoring service unreachable: {0}")]
    Unreachable(String),
    /// The service answered with a non-success status (permission, bad filter, quota).
    #[error("query rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The response body could not be decoded into time series points.
    #[error("malformed time series response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl MetricQueryError {
    pub fn kind(&self) -> MetricQueryErrorKind {
        match self {
            MetricQueryError::Unreachable(_) => MetricQueryErrorKind::Unreachable,
            MetricQueryError::Rejected { .. } => MetricQueryErrorKind::Rejected,
            MetricQueryError::Malformed(_) => MetricQueryErrorKind::Malformed,
            MetricQueryError::Auth(_) => MetricQueryErrorKind::Auth,
        }
    }
}

/// Source of metric samples for one (bucket, metric) pair.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Aligned samples, oldest first. An empty vec means no data in the window.
    async fn fetch_samples(&self, query: &MetricQuery) -> Result<Vec<f64>, MetricQueryError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeriesPage {
    #[serde(default)]
    time_series: Vec<TimeSeries>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    #[serde(default)]
    points: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct Point {
    interval: PointInterval,
    value: TypedValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointInterval {
    end_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypedValue {
    double_value: Option<f64>,
    int64_value: Option<Int64Value>,
}

/// int64 is a JSON string in proto3 JSON, but plain numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Int64Value {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
}

impl TypedValue {
    fn as_f64(&self) -> Result<f64, MetricQueryError> {
        if let Some(v) = self.double_value {
            return Ok(v);
        }
        match &self.int64_value {
            Some(Int64Value::Number(n)) => Ok(*n as f64),
            Some(Int64Value::Text(s)) => s
                .parse::<i64>()
                .map(|n| n as f64)
                .map_err(|e| MetricQueryError::Malformed(format!("int64Value {:?}: {}", s, e))),
            None => Err(MetricQueryError::Malformed(
                "point has neither doubleValue nor int64Value".into(),
            )),
        }
    }
}

/// Samples of one series, ordered by point end time (the API returns newest first).
fn series_samples(series: &TimeSeries) -> Result<Vec<f64>, MetricQueryError> {
    let mut points = Vec::with_capacity(series.points.len());
    for p in &series.points {
        let end = DateTime::parse_from_rfc3339(&p.interval.end_time)
            .map_err(|e| {
                MetricQueryError::Malformed(format!("endTime {:?}: {}", p.interval.end_time, e))
            })?
            .with_timezone(&Utc);
        points.push((end, p.value.as_f64()?));
    }
    points.sort_by_key(|(end, _)| *end);
    Ok(points.into_iter().map(|(_, v)| v).collect())
}

/// Decodes one timeSeries.list page into chronological samples (series concatenated in order).
fn decode_page(body: &[u8]) -> Result<(Vec<f64>, Option<String>), MetricQueryError> {
    let page: TimeSeriesPage =
        serde_json::from_slice(body).map_err(|e| MetricQueryError::Malformed(e.to_string()))?;
    let mut samples = Vec::new();
    for series in &page.time_series {
        samples.extend(series_samples(series)?);
    }
    let next = page.next_page_token.filter(|t| !t.is_empty());
    Ok((samples, next))
}

fn rejection_message(body: &[u8]) -> String {
    match serde_json::from_slice::<GoogleErrorBody>(body) {
        Ok(b) => b.error.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

pub struct MonitoringRepo {
    client: reqwest::Client,
    tokens: SharedTokenSource,
    base_url: String,
    project_id: String,
}

impl MonitoringRepo {
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

    async fn fetch_page(
        &self,
        query: &MetricQuery,
        page_token: Option<&str>,
    ) -> Result<(Vec<f64>, Option<String>), MetricQueryError> {
        let token = self.tokens.access_token().await?;
        let mut params = query.query_params();
        if let Some(t) = page_token {
            params.push(("pageToken", t.to_string()));
        }
        let url = http::join(
            &self.base_url,
            &format!("/v3/projects/{}/timeSeries", self.project_id),
        );
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| MetricQueryError::Unreachable(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| MetricQueryError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(MetricQueryError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }
        decode_page(&body)
    }
}

#[async_trait]
impl MetricSource for MonitoringRepo {
    #[instrument(skip(self, query), fields(repo = "monitoring", operation = "fetch_samples", bucket = %query.bucket_name, metric_type = %query.metric))]
    async fn fetch_samples(&self, query: &MetricQuery) -> Result<Vec<f64>, MetricQueryError> {
        let mut samples = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let (page, next) = self.fetch_page(query, page_token.as_deref()).await?;
            samples.extend(page);
            match next {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }
        debug!(samples_count = samples.len(), "Time series fetched");
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query(metric: MetricKind) -> MetricQuery {
        let end = Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap();
        MetricQuery {
            bucket_name: "my-bucket".into(),
            metric,
            window: TimeWindow::trailing_days(end, 30),
            alignment_period_secs: 86_400,
        }
    }

    #[test]
    fn filter_selects_metric_resource_and_bucket() {
        assert_eq!(
            query(MetricKind::RequestCount).filter(),
            r#"metric.type="storage.googleapis.com/api/request_count" AND resource.type="gcs_bucket" AND resource.labels.bucket_name="my-bucket""#
        );
    }

    #[test]
    fn query_params_carry_window_alignment_and_aligner() {
        let params = query(MetricKind::ObjectCount).query_params();
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("interval.startTime"), "2024-05-01T00:00:00.000000000Z");
        assert_eq!(get("interval.endTime"), "2024-05-31T00:00:00.000000000Z");
        assert_eq!(get("aggregation.alignmentPeriod"), "86400s");
        assert_eq!(get("aggregation.perSeriesAligner"), "ALIGN_MEAN");
        assert_eq!(get("view"), "FULL");
    }

    #[test]
    fn decode_page_orders_points_oldest_first() {
        let body = br#"{
            "timeSeries": [{
                "points": [
                    {"interval": {"startTime": "2024-05-03T00:00:00Z", "endTime": "2024-05-03T00:00:00Z"}, "value": {"doubleValue": 3.0}},
                    {"interval": {"startTime": "2024-05-02T00:00:00Z", "endTime": "2024-05-02T00:00:00Z"}, "value": {"doubleValue": 2.0}},
                    {"interval": {"startTime": "2024-05-01T00:00:00Z", "endTime": "2024-05-01T00:00:00Z"}, "value": {"doubleValue": 1.0}}
                ]
            }],
            "nextPageToken": ""
        }"#;
        let (samples, next) = decode_page(body).unwrap();
        assert_eq!(samples, vec![1.0, 2.0, 3.0]);
        assert!(next.is_none());
    }

    #[test]
    fn decode_page_accepts_int64_strings() {
        let body = br#"{"timeSeries": [{"points": [
            {"interval": {"endTime": "2024-05-01T00:00:00Z"}, "value": {"int64Value": "42"}}
        ]}], "nextPageToken": "abc"}"#;
        let (samples, next) = decode_page(body).unwrap();
        assert_eq!(samples, vec![42.0]);
        assert_eq!(next.as_deref(), Some("abc"));
    }

    #[test]
    fn decode_page_empty_body_is_no_data() {
        let (samples, next) = decode_page(b"{}").unwrap();
        assert!(samples.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn decode_page_rejects_garbage() {
        let err = decode_page(b"not json").unwrap_err();
        assert_eq!(err.kind(), MetricQueryErrorKind::Malformed);
    }

    #[test]
    fn rejection_message_prefers_google_error_message() {
        let body = br#"{"error": {"code": 400, "message": "Field filter had an invalid value", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(rejection_message(body), "Field filter had an invalid value");
        assert_eq!(rejection_message(b"  bad gateway \n"), "bad gateway");
    }
}
