//! Unit conversion and presentation formatting
//!
//! Every formatter renders exactly two decimal digits. Inputs that are not
//! finite numbers (empty strings, garbage, `NaN` or `+Inf` from the backend)
//! render as [`INVALID_VALUE`] instead of failing.

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Rendered in place of a value that could not be parsed
pub const INVALID_VALUE: &str = "N/A";

/// Values accepted by the formatters: raw backend strings or floats
pub trait MetricInput {
    fn to_metric(&self) -> Option<f64>;
}

impl MetricInput for f64 {
    fn to_metric(&self) -> Option<f64> {
        Some(*self).filter(|v| v.is_finite())
    }
}

impl MetricInput for &str {
    fn to_metric(&self) -> Option<f64> {
        self.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl MetricInput for String {
    fn to_metric(&self) -> Option<f64> {
        self.as_str().to_metric()
    }
}

impl MetricInput for &String {
    fn to_metric(&self) -> Option<f64> {
        self.as_str().to_metric()
    }
}

/// Bytes to megabytes, e.g. `"1048576"` -> `"1.00"`
pub fn bytes_to_mb(raw: impl MetricInput) -> String {
    scaled(raw, BYTES_PER_MB)
}

/// Bytes to gigabytes, e.g. `"1073741824"` -> `"1.00"`
pub fn bytes_to_gb(raw: impl MetricInput) -> String {
    scaled(raw, BYTES_PER_GB)
}

/// Percentage with two decimals. Out-of-range values are not clamped.
pub fn percent(value: impl MetricInput) -> String {
    scaled(value, 1.0)
}

/// Plain two-decimal rendering for non-percentage figures (cpu seconds)
pub fn fixed2(value: impl MetricInput) -> String {
    scaled(value, 1.0)
}

/// `part / whole * 100`, or `None` when the denominator is missing or zero
pub fn ratio_percent(part: f64, whole: Option<f64>) -> Option<f64> {
    match whole {
        Some(w) if w != 0.0 => Some(part / w * 100.0),
        _ => None,
    }
}

fn scaled(raw: impl MetricInput, divisor: f64) -> String {
    match raw.to_metric() {
        Some(v) => format!("{:.2}", v / divisor),
        None => INVALID_VALUE.to_string(),
    }
}
