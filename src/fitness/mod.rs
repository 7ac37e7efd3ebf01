// Fitness module organization
// metric (squared RGB difference + normalization) and the incremental scoring of one shape

pub mod metrics;
pub mod scoring;
pub mod sqdiff;

// Re-export commonly used types and functions
pub use metrics::{psnr_from_distance, to_distance, to_squared_diff, MetricsSnapshot};
pub use scoring::{compute_difference_change, compute_optimal_color, score};
pub use sqdiff::squared_difference;
