//! Training infrastructure: parallel scramble generation and labeling,
//! batch loading, the gradient learner, the epoch loop, and metrics.

pub mod dataset;
pub mod generation;
pub mod learner;
pub mod loader;
pub mod metrics;
pub mod trainer;
