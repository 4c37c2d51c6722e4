//! Descriptive statistics and Tukey-fence outlier detection.

use crate::dataset::Dataset;
use crate::error::{ReportError, Result};
use tracing::{debug, warn};

/// Multiplier applied to the IQR to place the fences.
pub const FENCE_FACTOR: f64 = 1.5;

/// Scalar summary of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// `|mean - median| / median`; `None` when the median is zero.
    pub distance: Option<f64>,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Computes the summary of a sample. The sample must not be empty and
    /// must not contain NaN.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ReportError::shape("cannot summarize an empty column"));
        }
        if values.iter().any(|v| v.is_nan()) {
            return Err(ReportError::shape("column contains NaN"));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;

        Ok(Self {
            count: sorted.len(),
            mean,
            median,
            distance: relative_distance(mean, median),
            q1,
            q2: median,
            q3,
            iqr,
            lower_fence: q1 - FENCE_FACTOR * iqr,
            upper_fence: q3 + FENCE_FACTOR * iqr,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }

    pub fn is_lower_outlier(&self, value: f64) -> bool {
        value < self.lower_fence
    }

    pub fn is_upper_outlier(&self, value: f64) -> bool {
        value > self.upper_fence
    }
}

/// `|mean - median| / median`, undefined when the median is zero.
pub fn relative_distance(mean: f64, median: f64) -> Option<f64> {
    if median == 0.0 {
        return None;
    }
    Some(((mean - median) / median).abs())
}

/// Quantile with linear interpolation between order statistics (the default
/// method of numpy and R type 7). `q` is clamped to `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(quantile_sorted(&sorted, q))
}

/// The 50th percentile.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Summary of a joined dataset plus its two outlier partitions.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub summary: Summary,
    /// Rows strictly below the lower fence, in dataset order.
    pub lower_outliers: Dataset,
    /// Rows strictly above the upper fence, in dataset order.
    pub upper_outliers: Dataset,
}

impl Analysis {
    /// Summarizes `value_column` and partitions the rows against the fences.
    /// NULL cells are left out of both.
    pub fn compute(dataset: &Dataset, value_column: &str) -> Result<Self> {
        let values: Vec<f64> = dataset
            .numeric_column(value_column)?
            .into_iter()
            .flatten()
            .collect();

        let skipped = dataset.len() - values.len();
        if skipped > 0 {
            warn!("Ignoring {} NULL values in '{}'", skipped, value_column);
        }

        let summary = Summary::from_values(&values).map_err(|e| {
            ReportError::shape(format!("column '{value_column}': {}", inner_message(&e)))
        })?;
        if summary.distance.is_none() {
            warn!("Median of '{}' is zero; relative distance is undefined", value_column);
        }

        let lower_outliers =
            dataset.filter_numeric(value_column, |v| summary.is_lower_outlier(v))?;
        let upper_outliers =
            dataset.filter_numeric(value_column, |v| summary.is_upper_outlier(v))?;

        debug!(
            "Fences [{}, {}]: {} lower and {} upper outliers",
            summary.lower_fence,
            summary.upper_fence,
            lower_outliers.len(),
            upper_outliers.len()
        );

        Ok(Self {
            summary,
            lower_outliers,
            upper_outliers,
        })
    }
}

fn inner_message(error: &ReportError) -> String {
    match error {
        ReportError::ShapeMismatch(msg) => msg.clone(),
        other => other.to_string(),
    }
}
