//! Small descriptive-statistics helpers shared by prediction and reporting.

/// Arithmetic mean, or `None` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`), or `None` for an empty slice.
pub(crate) fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Least-squares fit of `y` against `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LinearFit {
    pub slope: f64,
    /// Pearson correlation; 0 when either series has no variance
    pub correlation: f64,
}

/// Fit `y = a + slope·x`. Needs at least two paired points.
pub(crate) fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        numerator += dx * dy;
        sum_sq_x += dx * dx;
        sum_sq_y += dy * dy;
    }

    let slope = if sum_sq_x == 0.0 { 0.0 } else { numerator / sum_sq_x };
    let denominator = (sum_sq_x * sum_sq_y).sqrt();
    let correlation = if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    };

    Some(LinearFit { slope, correlation })
}
