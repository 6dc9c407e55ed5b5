// Summary statistics for one metric series over the report window.

/// Seven scalars reduced from one metric's samples. `Default` is the all-zero
/// summary used for empty series and substituted query failures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSummary {
    pub total: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub stddev: f64,
    pub percent_change: f64,
    pub latest: f64,
}

impl MetricSummary {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
