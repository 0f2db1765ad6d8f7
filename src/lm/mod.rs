//! Linear models: design matrices, pivoted QR, weighted least squares and
//! sequential ANOVA

mod anova;
mod design;
mod fitting;
mod qr;

pub use anova::{sequential_anova, AnovaTerm};
pub use design::{ColumnInfo, DesignBuilder, DesignMatrix, INTERCEPT};
pub use fitting::{fit_linear_model, CoefficientSummary, FitParams, FitResult, FitSummary, LinearModelFit};
pub use qr::{PivotedQr, DEFAULT_TOLERANCE};
