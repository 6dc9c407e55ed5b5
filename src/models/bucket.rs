// Bucket identity from the listing API and the per-bucket report row.

use serde::{Deserialize, Serialize};

use super::MetricSummary;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Subset of the Cloud Storage bucket resource used by the report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Bucket {
    pub name: String,
    /// Bucket location (e.g. "US", "EUROPE-WEST1"); reported as the region column.
    #[serde(default)]
    pub location: String,
}

impl Bucket {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

/// One CSV row. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub bucket_name: String,
    pub region: String,
    pub project_id: String,
    pub request_total: f64,
    pub request_percent_change: f64,
    pub sent_total: f64,
    pub sent_percent_change: f64,
    pub received_total: f64,
    pub received_percent_change: f64,
    #[serde(rename = "total_GB_latest")]
    pub total_gb_latest: f64,
    pub total_bytes_percent_change: f64,
    pub total_objects_total: f64,
    pub total_objects_percent_change: f64,
}

/// Summaries for the five tracked metrics of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketMetrics {
    pub requests: MetricSummary,
    pub sent: MetricSummary,
    pub received: MetricSummary,
    pub total_bytes: MetricSummary,
    pub objects: MetricSummary,
}

impl BucketRecord {
    /// Selects the reported fields: total + change for counters and object count,
    /// latest (in GB) + change for stored bytes.
    pub fn assemble(bucket: &Bucket, project_id: &str, m: &BucketMetrics) -> Self {
        Self {
            bucket_name: bucket.name.clone(),
            region: bucket.location.clone(),
            project_id: project_id.to_string(),
            request_total: m.requests.total,
            request_percent_change: m.requests.percent_change,
            sent_total: m.sent.total,
            sent_percent_change: m.sent.percent_change,
            received_total: m.received.total,
            received_percent_change: m.received.percent_change,
            total_gb_latest: bytes_to_gb(m.total_bytes.latest),
            total_bytes_percent_change: m.total_bytes.percent_change,
            total_objects_total: m.objects.total,
            total_objects_percent_change: m.objects.percent_change,
        }
    }
}

pub fn bytes_to_gb(bytes: f64) -> f64 {
    bytes / BYTES_PER_GB
}
