//! # Waste Forecast
//!
//! A Rust library for predicting kitchen food waste from operational,
//! calendar, and weather features.
//!
//! The library spans the two time-separated halves of that job. A batch
//! run cleans a raw waste table, derives calendar and trailing-average
//! features, fixes the feature schema, fits a scaling profile, trains a
//! gradient boosted model under randomized hyperparameter search, and
//! persists everything as one artifact set. A serving process later loads
//! that set and assembles single-row feature vectors against the same
//! schema and scaling, so the vector a model sees at prediction time is
//! column-for-column the one it was fit on, or the request fails with a
//! schema mismatch instead of silently predicting garbage.
//!
//! ## Quick Start
//!
//! ```no_run
//! use waste_forecast::artifacts::ArtifactPaths;
//! use waste_forecast::preprocess::preprocess;
//! use waste_forecast::training::{train_and_persist, TrainingConfig};
//!
//! # fn main() -> waste_forecast::Result<()> {
//! // Batch side: raw CSV in, artifact set out
//! let prepared = preprocess("data/raw/train.csv".as_ref())?;
//! let paths = ArtifactPaths::new("artifacts");
//! let outcome = train_and_persist(&prepared, &TrainingConfig::default(), &paths)?;
//! println!("{}", outcome.artifacts.bundle.metrics);
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod preprocess;
pub mod temporal;
pub mod training;

// Re-export commonly used types
pub use crate::artifacts::{ArtifactPaths, ArtifactSet, ModelArtifactBundle};
pub use crate::error::{PipelineError, Result};
pub use crate::features::{
    assemble, FeatureMatrix, FeatureRecord, FeatureSchema, ScalingProfile,
};
pub use crate::models::{Regressor, TrainedRegressor};
pub use crate::temporal::TemporalSnapshot;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
