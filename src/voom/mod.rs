//! voom-style precision weights for count data

mod interpolate;
mod lowess;
mod mean_variance;

pub use interpolate::LinearInterpolator;
pub use lowess::{lowess, LowessFit, LowessParams};
pub use mean_variance::{
    estimate_mean_variance, library_sizes, log2_cpm, MeanVarianceResult, VoomParams, PRIOR_COUNT,
};
