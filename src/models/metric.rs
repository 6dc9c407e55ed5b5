// The five Cloud Storage metrics tracked per bucket, with their per-series aligners.

use std::fmt;

/// Per-series reduction applied inside each alignment period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aligner {
    /// Rate of change; used for delta counters (requests, network bytes).
    Rate,
    /// Mean of the period; used for gauges (stored bytes, object count).
    Mean,
}

impl Aligner {
    /// Value of `aggregation.perSeriesAligner` in the Monitoring API.
    pub fn as_api_str(self) -> &'static str {
        match self {
            Aligner::Rate => "ALIGN_RATE",
            Aligner::Mean => "ALIGN_MEAN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    RequestCount,
    SentBytes,
    ReceivedBytes,
    TotalBytes,
    ObjectCount,
}

impl MetricKind {
    /// Every tracked metric, in report column order.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::RequestCount,
        MetricKind::SentBytes,
        MetricKind::ReceivedBytes,
        MetricKind::TotalBytes,
        MetricKind::ObjectCount,
    ];

    pub fn metric_type(self) -> &'static str {
        match self {
            MetricKind::RequestCount => "storage.googleapis.com/api/request_count",
            MetricKind::SentBytes => "storage.googleapis.com/network/sent_bytes_count",
            MetricKind::ReceivedBytes => "storage.googleapis.com/network/received_bytes_count",
            MetricKind::TotalBytes => "storage.googleapis.com/storage/total_bytes",
            MetricKind::ObjectCount => "storage.googleapis.com/storage/object_count",
        }
    }

    pub fn aligner(self) -> Aligner {
        match self {
            MetricKind::RequestCount | MetricKind::SentBytes | MetricKind::ReceivedBytes => {
                Aligner::Rate
            }
            MetricKind::TotalBytes | MetricKind::ObjectCount => Aligner::Mean,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_type())
    }
}
