// Shared test helpers: in-memory bucket and metric sources.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gcs_bucket_report::auth::AuthError;
use gcs_bucket_report::models::{Bucket, MetricKind, TimeWindow};
use gcs_bucket_report::monitoring_repo::{
    MetricQuery, MetricQueryError, MetricQueryErrorKind, MetricSource,
};
use gcs_bucket_report::storage_repo::BucketSource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn fixed_window() -> TimeWindow {
    TimeWindow::trailing_days(Utc.with_ymd_and_hms(2024, 6, 30, 8, 0, 0).unwrap(), 30)
}

pub enum FakeBuckets {
    Listed(Vec<Bucket>),
    PermissionDenied,
}

#[async_trait]
impl BucketSource for FakeBuckets {
    async fn list_buckets(&self) -> anyhow::Result<Vec<Bucket>> {
        match self {
            FakeBuckets::Listed(b) => Ok(b.clone()),
            FakeBuckets::PermissionDenied => {
                anyhow::bail!("HTTP 403 Forbidden: caller does not have storage.buckets.list access")
            }
        }
    }
}

/// Serves canned samples per (bucket, metric); unknown pairs return an empty series.
#[derive(Default)]
pub struct FakeMetrics {
    responses: HashMap<(String, MetricKind), Result<Vec<f64>, MetricQueryErrorKind>>,
    pub seen: Mutex<Vec<MetricQuery>>,
}

impl FakeMetrics {
    pub fn with_samples(mut self, bucket: &str, metric: MetricKind, samples: Vec<f64>) -> Self {
        self.responses
            .insert((bucket.to_string(), metric), Ok(samples));
        self
    }

    pub fn with_failure(
        mut self,
        bucket: &str,
        metric: MetricKind,
        kind: MetricQueryErrorKind,
    ) -> Self {
        self.responses.insert((bucket.to_string(), metric), Err(kind));
        self
    }

    /// Same samples for every metric of `bucket`.
    pub fn with_all(mut self, bucket: &str, samples: Vec<f64>) -> Self {
        for metric in MetricKind::ALL {
            self = self.with_samples(bucket, metric, samples.clone());
        }
        self
    }

    pub fn seen(&self) -> Vec<MetricQuery> {
        self.seen.lock().unwrap().clone()
    }
}

fn error_of(kind: MetricQueryErrorKind) -> MetricQueryError {
    match kind {
        MetricQueryErrorKind::Unreachable => {
            MetricQueryError::Unreachable("connection reset by peer".into())
        }
        MetricQueryErrorKind::Rejected => MetricQueryError::Rejected {
            status: 400,
            message: "invalid filter".into(),
        },
        MetricQueryErrorKind::Malformed => MetricQueryError::Malformed("truncated body".into()),
        MetricQueryErrorKind::Auth => MetricQueryError::Auth(AuthError::EmptyToken),
    }
}

#[async_trait]
impl MetricSource for FakeMetrics {
    async fn fetch_samples(&self, query: &MetricQuery) -> Result<Vec<f64>, MetricQueryError> {
        self.seen.lock().unwrap().push(query.clone());
        match self
            .responses
            .get(&(query.bucket_name.clone(), query.metric))
        {
            Some(Ok(samples)) => Ok(samples.clone()),
            Some(Err(kind)) => Err(error_of(*kind)),
            None => Ok(vec![]),
        }
    }
}

/// Collects formatted log output from a scoped tracing subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Installs a subscriber for the current thread until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || logs.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
