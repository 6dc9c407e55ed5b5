// Collection driver: list buckets, query and aggregate five metrics per bucket,
// assemble one record per bucket. Strictly sequential; one query in flight at a time.

use std::collections::HashMap;

use tracing::{error, info, instrument, warn};

use crate::aggregation::aggregate;
use crate::models::{Bucket, BucketMetrics, BucketRecord, MetricKind, MetricSummary, TimeWindow};
use crate::monitoring_repo::{MetricQuery, MetricQueryError, MetricQueryErrorKind, MetricSource};
use crate::storage_repo::BucketSource;

/// What the driver does with a failed metric query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// Zero summary, logged at WARN (likely transient or upstream).
    ZeroWithWarning,
    /// Zero summary, logged at ERROR (auth or request problem on our side).
    ZeroWithError,
}

pub struct SubstitutionPolicy;

impl SubstitutionPolicy {
    pub fn for_error(kind: MetricQueryErrorKind) -> Substitution {
        match kind {
            MetricQueryErrorKind::Unreachable | MetricQueryErrorKind::Malformed => {
                Substitution::ZeroWithWarning
            }
            MetricQueryErrorKind::Rejected | MetricQueryErrorKind::Auth => {
                Substitution::ZeroWithError
            }
        }
    }
}

/// One metric whose failed query was replaced by zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutedQuery {
    pub bucket_name: String,
    pub metric: MetricKind,
    pub kind: MetricQueryErrorKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub buckets: usize,
    pub queries: usize,
    /// Queries that succeeded with no points in the window.
    pub empty_series: usize,
    pub substitutions: Vec<SubstitutedQuery>,
}

impl RunStats {
    pub fn substitutions_by_kind(&self) -> HashMap<MetricQueryErrorKind, usize> {
        let mut out = HashMap::new();
        for s in &self.substitutions {
            *out.entry(s.kind).or_insert(0) += 1;
        }
        out
    }
}

/// Records in bucket-listing order plus run statistics.
#[derive(Debug, Clone, Default)]
pub struct ReportRun {
    pub records: Vec<BucketRecord>,
    pub stats: RunStats,
}

pub struct ReportDriver<'a> {
    buckets: &'a dyn BucketSource,
    metrics: &'a dyn MetricSource,
    project_id: String,
    window: TimeWindow,
    alignment_period_secs: u64,
}

impl<'a> ReportDriver<'a> {
    pub fn new(
        buckets: &'a dyn BucketSource,
        metrics: &'a dyn MetricSource,
        project_id: impl Into<String>,
        window: TimeWindow,
        alignment_period_secs: u64,
    ) -> Self {
        Self {
            buckets,
            metrics,
            project_id: project_id.into(),
            window,
            alignment_period_secs,
        }
    }

    /// Runs the whole report. Only a bucket listing failure is returned as an error.
    #[instrument(skip(self), fields(project_id = %self.project_id))]
    pub async fn run(&self) -> anyhow::Result<ReportRun> {
        let buckets = self.buckets.list_buckets().await?;
        info!(buckets_count = buckets.len(), "Collecting bucket metrics");

        let mut run = ReportRun {
            records: Vec::with_capacity(buckets.len()),
            stats: RunStats::default(),
        };
        for bucket in &buckets {
            let metrics = self.collect_bucket(bucket, &mut run.stats).await;
            run.records
                .push(BucketRecord::assemble(bucket, &self.project_id, &metrics));
            run.stats.buckets += 1;
        }
        Ok(run)
    }

    async fn collect_bucket(&self, bucket: &Bucket, stats: &mut RunStats) -> BucketMetrics {
        let mut m = BucketMetrics::default();
        for metric in MetricKind::ALL {
            let summary = self.summarize(bucket, metric, stats).await;
            match metric {
                MetricKind::RequestCount => m.requests = summary,
                MetricKind::SentBytes => m.sent = summary,
                MetricKind::ReceivedBytes => m.received = summary,
                MetricKind::TotalBytes => m.total_bytes = summary,
                MetricKind::ObjectCount => m.objects = summary,
            }
        }
        m
    }

    async fn summarize(
        &self,
        bucket: &Bucket,
        metric: MetricKind,
        stats: &mut RunStats,
    ) -> MetricSummary {
        let query = MetricQuery {
            bucket_name: bucket.name.clone(),
            metric,
            window: self.window,
            alignment_period_secs: self.alignment_period_secs,
        };
        stats.queries += 1;
        match self.metrics.fetch_samples(&query).await {
            Ok(samples) => {
                if samples.is_empty() {
                    stats.empty_series += 1;
                }
                aggregate(&samples)
            }
            Err(e) => {
                substitute(&bucket.name, metric, &e);
                stats.substitutions.push(SubstitutedQuery {
                    bucket_name: bucket.name.clone(),
                    metric,
                    kind: e.kind(),
                });
                MetricSummary::default()
            }
        }
    }
}

fn substitute(bucket_name: &str, metric: MetricKind, e: &MetricQueryError) {
    match SubstitutionPolicy::for_error(e.kind()) {
        Substitution::ZeroWithWarning => warn!(
            bucket = bucket_name,
            metric_type = %metric,
            error = %e,
            "Error fetching metrics for bucket {}, metric {}; reporting zeros",
            bucket_name,
            metric
        ),
        Substitution::ZeroWithError => error!(
            bucket = bucket_name,
            metric_type = %metric,
            error = %e,
            "Error fetching metrics for bucket {}, metric {}; reporting zeros",
            bucket_name,
            metric
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_escalates_our_side_failures() {
        assert_eq!(
            SubstitutionPolicy::for_error(MetricQueryErrorKind::Rejected),
            Substitution::ZeroWithError
        );
        assert_eq!(
            SubstitutionPolicy::for_error(MetricQueryErrorKind::Auth),
            Substitution::ZeroWithError
        );
        assert_eq!(
            SubstitutionPolicy::for_error(MetricQueryErrorKind::Unreachable),
            Substitution::ZeroWithWarning
        );
        assert_eq!(
            SubstitutionPolicy::for_error(MetricQueryErrorKind::Malformed),
            Substitution::ZeroWithWarning
        );
    }

    #[test]
    fn substitutions_by_kind_counts() {
        let stats = RunStats {
            substitutions: vec![
                SubstitutedQuery {
                    bucket_name: "a".into(),
                    metric: MetricKind::SentBytes,
                    kind: MetricQueryErrorKind::Unreachable,
                },
                SubstitutedQuery {
                    bucket_name: "b".into(),
                    metric: MetricKind::SentBytes,
                    kind: MetricQueryErrorKind::Unreachable,
                },
            ],
            ..Default::default()
        };
        let by_kind = stats.substitutions_by_kind();
        assert_eq!(by_kind.get(&MetricQueryErrorKind::Unreachable), Some(&2));
        assert_eq!(by_kind.get(&MetricQueryErrorKind::Rejected), None);
    }
}
