//! Robust locally weighted linear regression (lowess)
//!
//! Follows the classic Cleveland algorithm as implemented by R's `lowess()`:
//! tricube neighbourhood weights, bisquare robustness weights from six times
//! the median absolute residual, and linear interpolation across points
//! closer than `delta` to the last evaluated one.

use crate::error::{ExprError, Result};

/// Configurable parameters for lowess smoothing
#[derive(Debug, Clone)]
pub struct LowessParams {
    /// Fraction of points in each local neighbourhood
    pub span: f64,
    /// Number of robustness iterations
    pub iterations: usize,
    /// Points within `delta` of the last fitted point are interpolated;
    /// `None` uses 1% of the x range
    pub delta: Option<f64>,
}

impl Default for LowessParams {
    fn default() -> Self {
        Self {
            span: 2.0 / 3.0,
            iterations: 3,
            delta: None,
        }
    }
}

/// Smoothed curve, sorted by `x`
#[derive(Debug, Clone, PartialEq)]
pub struct LowessFit {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Smooth `y` against `x`
///
/// Pairs with a non-finite coordinate are dropped. The result holds one
/// point per remaining pair, sorted by `x` (ties keep input order).
pub fn lowess(x: &[f64], y: &[f64], params: &LowessParams) -> Result<LowessFit> {
    if x.len() != y.len() {
        return Err(ExprError::dimension_mismatch(
            format!("{} y values", x.len()),
            format!("{} y values", y.len()),
        ));
    }
    if !(params.span > 0.0 && params.span <= 1.0) {
        return Err(ExprError::invalid_argument(format!(
            "lowess span must lie in (0, 1], got {}",
            params.span
        )));
    }

    let mut order: Vec<usize> = (0..x.len())
        .filter(|&i| x[i].is_finite() && y[i].is_finite())
        .collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    let xs: Vec<f64> = order.iter().map(|&i| x[i]).collect();
    let ys: Vec<f64> = order.iter().map(|&i| y[i]).collect();

    let n = xs.len();
    if n == 0 {
        return Err(ExprError::EmptyData {
            reason: "lowess needs at least one finite (x, y) pair".to_string(),
        });
    }
    if n == 1 {
        return Ok(LowessFit { x: xs, y: ys });
    }

    let delta = params.delta.unwrap_or(0.01 * (xs[n - 1] - xs[0]));
    let fitted = Smoother::new(&xs, &ys).run(params.span, params.iterations, delta);
    Ok(LowessFit { x: xs, y: fitted })
}

struct Smoother<'a> {
    x: &'a [f64],
    y: &'a [f64],
    fitted: Vec<f64>,
    robustness: Vec<f64>,
    scratch: Vec<f64>,
}

impl<'a> Smoother<'a> {
    fn new(x: &'a [f64], y: &'a [f64]) -> Self {
        let n = x.len();
        Self {
            x,
            y,
            fitted: vec![0.0; n],
            robustness: vec![1.0; n],
            scratch: vec![0.0; n],
        }
    }

    /// Weighted local linear fit at `at` over the window `left..=right`;
    /// `None` when every weight is zero
    fn local_fit(&mut self, at: f64, left: usize, right: usize, robust: bool) -> Option<f64> {
        let (x, n) = (self.x, self.x.len());
        let range = x[n - 1] - x[0];
        let h = (at - x[left]).max(x[right] - at);
        let (h9, h1) = (0.999 * h, 0.001 * h);
        let w = &mut self.scratch;

        let mut total = 0.0;
        let mut j = left;
        while j < n {
            w[j] = 0.0;
            let r = (x[j] - at).abs();
            if r <= h9 {
                w[j] = if r <= h1 {
                    1.0
                } else {
                    let u = r / h;
                    (1.0 - u * u * u).powi(3)
                };
                if robust {
                    w[j] *= self.robustness[j];
                }
                total += w[j];
            } else if x[j] > at {
                break;
            }
            j += 1;
        }
        let last = j - 1;
        if total <= 0.0 {
            return None;
        }
        for wj in &mut w[left..=last] {
            *wj /= total;
        }

        if h > 0.0 {
            let center: f64 = (left..=last).map(|j| w[j] * x[j]).sum();
            let spread: f64 = (left..=last).map(|j| w[j] * (x[j] - center).powi(2)).sum();
            if spread.sqrt() > 0.001 * range {
                let slope = (at - center) / spread;
                for j in left..=last {
                    w[j] *= slope * (x[j] - center) + 1.0;
                }
            }
        }

        Some((left..=last).map(|j| w[j] * self.y[j]).sum())
    }

    /// One pass over all points with the current robustness weights
    fn pass(&mut self, window: usize, delta: f64, robust: bool) {
        let (x, n) = (self.x, self.x.len());
        let mut left = 0;
        let mut right = window - 1;
        let mut last: Option<usize> = None;
        let mut i = 0;

        loop {
            if right < n - 1 && x[i] - x[left] > x[right + 1] - x[i] {
                left += 1;
                right += 1;
                continue;
            }

            let value = self.local_fit(x[i], left, right, robust);
            self.fitted[i] = value.unwrap_or(self.y[i]);

            if let Some(l) = last {
                if l + 1 < i {
                    let span = x[i] - x[l];
                    for j in (l + 1)..i {
                        let alpha = (x[j] - x[l]) / span;
                        self.fitted[j] = alpha * self.fitted[i] + (1.0 - alpha) * self.fitted[l];
                    }
                }
            }

            let anchor = i;
            let mut newest = anchor;
            let cut = x[anchor] + delta;
            i = anchor + 1;
            while i < n && x[i] <= cut {
                if x[i] == x[anchor] {
                    self.fitted[i] = self.fitted[anchor];
                    newest = i;
                }
                i += 1;
            }
            last = Some(newest);
            i = (newest + 1).max(i - 1);
            if newest >= n - 1 {
                break;
            }
        }
    }

    /// Update bisquare robustness weights; false once residuals are
    /// negligible
    fn reweight(&mut self) -> bool {
        let n = self.x.len();
        let residuals: Vec<f64> = (0..n).map(|i| self.y[i] - self.fitted[i]).collect();
        let scale = residuals.iter().map(|r| r.abs()).sum::<f64>() / n as f64;

        let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
        abs.sort_by(f64::total_cmp);
        let m = n / 2;
        let cmad = if n % 2 == 0 {
            3.0 * (abs[m] + abs[m - 1])
        } else {
            6.0 * abs[m]
        };
        if cmad < 1e-7 * scale {
            return false;
        }

        let (c9, c1) = (0.999 * cmad, 0.001 * cmad);
        for (w, r) in self.robustness.iter_mut().zip(&residuals) {
            let r = r.abs();
            *w = if r <= c1 {
                1.0
            } else if r <= c9 {
                let u = r / cmad;
                (1.0 - u * u).powi(2)
            } else {
                0.0
            };
        }
        true
    }

    fn run(mut self, span: f64, iterations: usize, delta: f64) -> Vec<f64> {
        let n = self.x.len();
        let window = ((span * n as f64 + 1e-7) as usize).clamp(2, n);
        for iteration in 0..=iterations {
            self.pass(window, delta, iteration > 0);
            if iteration == iterations || !self.reweight() {
                break;
            }
        }
        self.fitted
    }
}
