// Report domain models

mod bucket;
mod metric;
mod summary;
mod window;

pub use bucket::{Bucket, BucketMetrics, BucketRecord, bytes_to_gb};
pub use metric::{Aligner, MetricKind};
pub use summary::MetricSummary;
pub use window::TimeWindow;
