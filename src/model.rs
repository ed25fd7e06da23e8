/// Linear trend of the favorite's win share across years.
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};

use crate::error::ReportError;

/// `share(year) = intercept + slope * (year - base_year)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub base_year: i32,
    pub intercept: f64,
    /// Percentage points per year.
    pub slope: f64,
}

impl Trend {
    pub fn predict(&self, year: i32) -> f64 {
        self.intercept + self.slope * f64::from(year - self.base_year)
    }
}

/// Least-squares fit over `(year, share)` points. Years are centred on the
/// first one to keep the design matrix well conditioned.
pub fn fit_trend(points: &[(i32, f64)]) -> Result<Trend, ReportError> {
    let base_year = points.iter().map(|&(y, _)| y).min().unwrap_or_default();
    let distinct = points
        .iter()
        .map(|&(y, _)| y)
        .filter(|&y| y != base_year)
        .count();
    if points.len() < 2 || distinct == 0 {
        return Err(ReportError::Trend(format!(
            "need at least two distinct years, got {}",
            points.len()
        )));
    }

    let n = points.len();
    let mut x = Array2::<f64>::zeros((n, 1));
    let mut y = Array1::<f64>::zeros(n);
    for (i, &(year, share)) in points.iter().enumerate() {
        x[(i, 0)] = f64::from(year - base_year);
        y[i] = share;
    }

    let ds = Dataset::new(x, y);
    let model = LinearRegression::new()
        .fit(&ds)
        .map_err(|e| ReportError::Trend(e.to_string()))?;

    Ok(Trend {
        base_year,
        intercept: model.intercept(),
        slope: model.params()[0],
    })
}
