//! Persisted model artifacts
//!
//! One training run produces three JSON documents (the model bundle, the
//! standalone scaling profile, and the temporal snapshot) and the serving
//! path loads them together. Writes go through a staging file and a
//! rename, so a failed run leaves the previous generation untouched.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::features::{FeatureSchema, ScalingProfile};
use crate::metrics::RegressionMetrics;
use crate::models::gradient_boost::{GradientBoostParams, TrainedGradientBoost};
use crate::temporal::TemporalSnapshot;

/// Everything a serving process needs from one training run.
///
/// Created once by the training orchestrator and read-only thereafter; a
/// retraining run replaces the whole bundle, never patches it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifactBundle {
    /// The fitted model
    pub model: TrainedGradientBoost,
    /// Ordered feature columns the model was fit on
    pub schema: FeatureSchema,
    /// Standardization parameters fitted on the training batch
    pub scaling: ScalingProfile,
    /// Hyperparameters selected by the search
    pub chosen_params: GradientBoostParams,
    /// Train/test evaluation metrics
    pub metrics: RegressionMetrics,
}

/// The artifact set produced together by one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// The model bundle
    pub bundle: ModelArtifactBundle,
    /// Trailing waste averages frozen at training time
    pub snapshot: TemporalSnapshot,
}

/// File locations for one artifact generation.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    dir: PathBuf,
}

impl ArtifactPaths {
    /// Artifact locations under a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The model bundle document.
    pub fn bundle(&self) -> PathBuf {
        self.dir.join("bundle.json")
    }

    /// The standalone scaling profile document.
    pub fn scaler(&self) -> PathBuf {
        self.dir.join("scaler.json")
    }

    /// The temporal snapshot document.
    pub fn snapshot(&self) -> PathBuf {
        self.dir.join("snapshot.json")
    }
}

impl ArtifactSet {
    /// Persist the bundle, the standalone scaling profile, and the
    /// temporal snapshot.
    ///
    /// All three documents are staged before any of them replaces a
    /// previous generation, so a run that fails midway persists nothing.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        fs::create_dir_all(paths.dir())?;

        let staged = [
            stage(paths.bundle(), serde_json::to_vec_pretty(&self.bundle)?)?,
            stage(
                paths.scaler(),
                serde_json::to_vec_pretty(&self.bundle.scaling)?,
            )?,
            stage(
                paths.snapshot(),
                serde_json::to_vec_pretty(&self.snapshot)?,
            )?,
        ];
        for (staging, path) in staged {
            fs::rename(staging, path)?;
        }

        info!(dir = %paths.dir().display(), "artifact set saved");
        Ok(())
    }

    /// Load an artifact set produced by one training run.
    ///
    /// The standalone scaling profile is checked against the one embedded
    /// in the bundle; a mismatch means the directory mixes generations and
    /// is refused.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let bundle: ModelArtifactBundle = read_json(&paths.bundle())?;
        let scaler: ScalingProfile = read_json(&paths.scaler())?;
        let snapshot: TemporalSnapshot = read_json(&paths.snapshot())?;

        if scaler != bundle.scaling {
            return Err(PipelineError::DataError(format!(
                "Artifact directory {} mixes generations: scaler.json does not match the bundle",
                paths.dir().display()
            )));
        }

        Ok(Self { bundle, snapshot })
    }
}

fn stage(path: PathBuf, contents: Vec<u8>) -> Result<(PathBuf, PathBuf)> {
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, contents)?;
    Ok((staging, path))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read(path).map_err(|e| {
        PipelineError::DataError(format!("Cannot read artifact {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_slice(&contents)?)
}
