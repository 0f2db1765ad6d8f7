//! exprkit: named expression matrices and the statistics around them
//!
//! Dense and sparse matrices with string-keyed rows and columns, reducers
//! that skip missing values, rank/distance/ROC utilities, weighted linear
//! model fitting with sequential ANOVA, and voom-style precision weights.
//!
//! # Example
//!
//! ```ignore
//! use exprkit::prelude::*;
//!
//! // Load data
//! let counts = read_matrix("counts.tsv", MatrixKind::Dense)?.into_dense();
//! let samples = read_sample_table("samples.tsv", &[])?.reorder(counts.column_names())?;
//!
//! // Model and precision weights
//! let design = DesignBuilder::new(&samples).factor("treatment").build()?;
//! let voom = estimate_mean_variance(&counts, &design, None, &VoomParams::default())?;
//!
//! // Weighted fit
//! let fit = fit_linear_model(&voom.log2cpm, &design, Some(&voom.weights), &FitParams::default())?;
//! let summaries = fit.summaries();
//! ```

pub mod cli;
pub mod data;
pub mod error;
pub mod filter;
pub mod io;
pub mod lm;
pub mod stats;
pub mod voom;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::{new_matrix, AnyMatrix, DenseMatrix, MatrixKind, NamedMatrix, SampleTable, SparseMatrix};
    pub use crate::error::{ExprError, Result};
    pub use crate::filter::{PresenceFilter, RowFilter, RowLevelFilter, RowNameFilter, RowStatistic};
    pub use crate::io::{read_matrix, read_sample_table, write_matrix, write_summaries, SummaryFormat};
    pub use crate::lm::{fit_linear_model, DesignBuilder, DesignMatrix, FitParams, FitResult, FitSummary, LinearModelFit};
    pub use crate::stats::{benjamini_hochberg, correlation, mean, median, quantile, variance};
    pub use crate::voom::{estimate_mean_variance, MeanVarianceResult, VoomParams};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use ndarray::array;

    #[test]
    fn test_full_pipeline() {
        // Create test data with differential expression
        let counts = DenseMatrix::with_names(
            array![
                [100.0, 110.0, 90.0, 400.0, 420.0, 380.0],  // Up-regulated
                [500.0, 520.0, 480.0, 500.0, 510.0, 490.0], // No change
                [300.0, 310.0, 290.0, 75.0, 80.0, 70.0],    // Down-regulated
                [50.0, 55.0, 45.0, 50.0, 52.0, 48.0],       // No change (low)
                [200.0, 220.0, 180.0, 200.0, 210.0, 190.0], // No change (medium)
                [150.0, 160.0, 140.0, 300.0, 320.0, 280.0], // Up-regulated 2
                [400.0, 420.0, 380.0, 100.0, 110.0, 90.0],  // Down-regulated 2
                [80.0, 85.0, 75.0, 80.0, 82.0, 78.0],       // No change (low-med)
                [600.0, 620.0, 580.0, 600.0, 610.0, 590.0], // No change (high)
                [250.0, 260.0, 240.0, 500.0, 520.0, 480.0], // Up-regulated 3
            ],
            [
                "gene_up", "gene_nc1", "gene_down", "gene_nc2", "gene_nc3", "gene_up2", "gene_down2",
                "gene_nc4", "gene_nc5", "gene_up3",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            (1..=6).map(|i| format!("s{}", i)).collect(),
        )
        .unwrap();

        let mut samples = SampleTable::new((1..=6).map(|i| format!("s{}", i)).collect()).unwrap();
        samples
            .add_factor(
                "treatment",
                ["control", "control", "control", "treated", "treated", "treated"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )
            .unwrap();

        let design = DesignBuilder::new(&samples).factor("treatment").build().unwrap();
        let voom = estimate_mean_variance(&counts, &design, None, &VoomParams::default()).unwrap();
        let fit = fit_linear_model(&voom.log2cpm, &design, Some(&voom.weights), &FitParams::default()).unwrap();

        let effect = fit.coefficients().row_by_name("treatment_treated_vs_control").unwrap();
        assert_eq!(effect.len(), 10);
        assert!(effect[0] > 1.0, "gene_up should be up-regulated");
        assert!(effect[2] < -1.0, "gene_down should be down-regulated");
        assert!(effect[1].abs() < 0.5, "gene_nc1 should be unchanged");

        let up = fit.result_by_name("gene_up").unwrap();
        let flat = fit.result_by_name("gene_nc1").unwrap();
        assert!(up.p_value < flat.p_value);
        assert_eq!(fit.summaries().len(), 10);
    }
}
