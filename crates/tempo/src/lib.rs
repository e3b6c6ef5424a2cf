pub mod candidates;
pub mod error;
pub mod onset;
pub mod peaks;
pub mod pipeline;
pub mod tempo;

pub use error::EstimateError;
pub use pipeline::{AnalysisJob, AnalysisReport, TempoPipeline};
pub use tempo::{AnalysisStats, TempoAnalysis, TempoEstimator};
