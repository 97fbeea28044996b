/// Errors from policy configuration.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PolicyError {
    /// A threshold lies outside `[0, 1]` or is not a number.
    #[error("threshold '{name}' must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    /// Thresholds are not strictly increasing.
    #[error("thresholds must satisfy low < medium < high (got {low} / {medium} / {high})")]
    Unordered { low: f64, medium: f64, high: f64 },

    #[error("small_amount_limit {limit} exceeds large_amount {large_amount}")]
    SmallAmountLimit { limit: u64, large_amount: u64 },
}
