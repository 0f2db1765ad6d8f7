//! Householder QR decomposition with limited column pivoting
//!
//! Columns are processed in their given order. A column whose norm, after
//! the reflections of the earlier columns, drops below `tolerance` times its
//! original norm is linearly dependent on those columns: it is moved to the
//! end and excluded from the rank. Independent columns keep their relative
//! order, so sequential sums of squares follow the order of the design.

use ndarray::{Array2, ArrayView2};

/// Relative tolerance for detecting aliased columns (matches R's `lm`)
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct PivotedQr {
    /// R in the upper triangle; Householder vectors, minus their first
    /// element, below the diagonal
    qr: Array2<f64>,
    /// First element of each Householder vector
    heads: Vec<f64>,
    /// `2 / (v'v)` of each Householder vector
    taus: Vec<f64>,
    /// `pivot[k]` is the original index of the column now at position `k`
    pivot: Vec<usize>,
    rank: usize,
}

impl PivotedQr {
    pub fn decompose(x: ArrayView2<'_, f64>, tolerance: f64) -> Self {
        let (nrow, ncol) = x.dim();
        let mut a = x.to_owned();
        let mut pivot: Vec<usize> = (0..ncol).collect();
        let original_norms: Vec<f64> = (0..ncol)
            .map(|j| a.column(j).iter().map(|v| v * v).sum::<f64>().sqrt())
            .collect();

        let mut heads = Vec::new();
        let mut taus = Vec::new();
        let mut limit = ncol;
        let mut k = 0;

        while k < limit && k < nrow {
            let norm = (k..nrow).map(|i| a[[i, k]] * a[[i, k]]).sum::<f64>().sqrt();

            if norm <= tolerance * original_norms[pivot[k]] {
                // Aliased: rotate this column to the end
                for i in 0..nrow {
                    for j in k..ncol - 1 {
                        a.swap([i, j], [i, j + 1]);
                    }
                }
                pivot[k..].rotate_left(1);
                limit -= 1;
                continue;
            }

            // Sign chosen to avoid cancellation
            let alpha = if a[[k, k]] > 0.0 { -norm } else { norm };
            let v0 = a[[k, k]] - alpha;
            a[[k, k]] = alpha;

            let mut v_norm_sq = v0 * v0;
            for i in (k + 1)..nrow {
                v_norm_sq += a[[i, k]] * a[[i, k]];
            }
            let tau = 2.0 / v_norm_sq;

            for j in (k + 1)..ncol {
                let mut dot = v0 * a[[k, j]];
                for i in (k + 1)..nrow {
                    dot += a[[i, k]] * a[[i, j]];
                }
                let scale = tau * dot;
                a[[k, j]] -= scale * v0;
                for i in (k + 1)..nrow {
                    a[[i, j]] -= scale * a[[i, k]];
                }
            }

            heads.push(v0);
            taus.push(tau);
            k += 1;
        }

        Self {
            qr: a,
            heads,
            taus,
            pivot,
            rank: k,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn n_rows(&self) -> usize {
        self.qr.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.qr.ncols()
    }

    pub fn pivot(&self) -> &[usize] {
        &self.pivot
    }

    /// Original indices of the columns that could not be estimated
    pub fn aliased(&self) -> &[usize] {
        &self.pivot[self.rank..]
    }

    fn reflect(&self, k: usize, y: &mut [f64]) {
        let v0 = self.heads[k];
        let mut dot = v0 * y[k];
        for i in (k + 1)..y.len() {
            dot += self.qr[[i, k]] * y[i];
        }
        let scale = self.taus[k] * dot;
        y[k] -= scale * v0;
        for i in (k + 1)..y.len() {
            y[i] -= scale * self.qr[[i, k]];
        }
    }

    /// `Q'y`, the effects vector
    pub fn qty(&self, y: &[f64]) -> Vec<f64> {
        assert_eq!(y.len(), self.n_rows());
        let mut out = y.to_vec();
        for k in 0..self.rank {
            self.reflect(k, &mut out);
        }
        out
    }

    /// `Qv`
    pub fn qy(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.n_rows());
        let mut out = v.to_vec();
        for k in (0..self.rank).rev() {
            self.reflect(k, &mut out);
        }
        out
    }

    /// Solve `R b = effects[..rank]` and scatter back to the original column
    /// order; aliased columns get `NaN`
    pub fn coefficients(&self, effects: &[f64]) -> Vec<f64> {
        let r = self.rank;
        let mut b = vec![0.0; r];
        for i in (0..r).rev() {
            let mut s = effects[i];
            for j in (i + 1)..r {
                s -= self.qr[[i, j]] * b[j];
            }
            b[i] = s / self.qr[[i, i]];
        }

        let mut coef = vec![f64::NAN; self.n_columns()];
        for (pos, value) in b.into_iter().enumerate() {
            coef[self.pivot[pos]] = value;
        }
        coef
    }

    /// Diagonal of `(R'R)^-1` in the original column order, i.e. coefficient
    /// variances up to the residual variance; aliased columns get `NaN`
    pub fn unscaled_variances(&self) -> Vec<f64> {
        let r = self.rank;
        // Invert the upper-triangular R column by column
        let mut r_inv = Array2::<f64>::zeros((r, r));
        for c in 0..r {
            for i in (0..=c).rev() {
                let mut s = if i == c { 1.0 } else { 0.0 };
                for j in (i + 1)..=c {
                    s -= self.qr[[i, j]] * r_inv[[j, c]];
                }
                r_inv[[i, c]] = s / self.qr[[i, i]];
            }
        }

        let mut out = vec![f64::NAN; self.n_columns()];
        for pos in 0..r {
            let v: f64 = (pos..r).map(|c| r_inv[[pos, c]] * r_inv[[pos, c]]).sum();
            out[self.pivot[pos]] = v;
        }
        out
    }
}
