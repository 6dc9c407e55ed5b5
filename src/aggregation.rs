// Pure reduction of one metric series into a MetricSummary.
// Samples are chronological (oldest first); empty input reduces to all zeros.

use crate::models::MetricSummary;

/// Aggregates one metric series.
///
/// `stddev` is the sample standard deviation (N-1). With a single sample it is
/// undefined and reported as 0.0. `percent_change` is 0 when the first sample
/// is 0, whatever the last sample is.
pub fn aggregate(samples: &[f64]) -> MetricSummary {
    let (Some(&first), Some(&latest)) = (samples.first(), samples.last()) else {
        return MetricSummary::default();
    };

    let total: f64 = samples.iter().sum();
    let average = total / samples.len() as f64;
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);

    MetricSummary {
        total,
        average,
        max,
        min,
        stddev: sample_stddev(samples, average),
        percent_change: percent_change(first, latest),
        latest,
    }
}

fn sample_stddev(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (samples.len() - 1) as f64).sqrt()
}

fn percent_change(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        return 0.0;
    }
    (last - first) / first * 100.0
}
