//! Piecewise-linear interpolation with constant extrapolation

use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

use crate::error::{ExprError, Result};

/// Linear interpolator over strictly increasing knots
///
/// Input points are collapsed through a map keyed by `x`, so repeated `x`
/// values keep only the last `y` seen. Outside the knot range the nearest
/// end value is returned.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LinearInterpolator {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ExprError::dimension_mismatch(
                format!("{} y values", x.len()),
                format!("{} y values", y.len()),
            ));
        }
        let mut knots: BTreeMap<OrderedFloat<f64>, f64> = BTreeMap::new();
        for (&xi, &yi) in x.iter().zip(y) {
            if xi.is_finite() && yi.is_finite() {
                knots.insert(OrderedFloat(xi), yi);
            }
        }
        if knots.is_empty() {
            return Err(ExprError::EmptyData {
                reason: "interpolation needs at least one finite point".to_string(),
            });
        }
        let (x, y) = knots.into_iter().map(|(k, v)| (k.into_inner(), v)).unzip();
        Ok(Self { x, y })
    }

    pub fn knots(&self) -> (&[f64], &[f64]) {
        (&self.x, &self.y)
    }

    pub fn evaluate(&self, at: f64) -> f64 {
        if at.is_nan() {
            return f64::NAN;
        }
        let n = self.x.len();
        if at <= self.x[0] {
            return self.y[0];
        }
        if at >= self.x[n - 1] {
            return self.y[n - 1];
        }
        // First knot strictly greater than `at`; 1 <= hi <= n - 1 here
        let hi = self.x.partition_point(|&k| k <= at);
        let lo = hi - 1;
        let t = (at - self.x[lo]) / (self.x[hi] - self.x[lo]);
        self.y[lo] + t * (self.y[hi] - self.y[lo])
    }
}
