//! Swappable handle to the served artifact generation

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use waste_forecast::artifacts::{ArtifactPaths, ArtifactSet};
use waste_forecast::error::Result;

/// Process-wide handle to the currently served artifact set.
///
/// A request clones the inner [`Arc`] once and holds one consistent
/// generation for its whole lifetime; [`ModelHandle::reload`] swaps
/// generations wholesale, so an in-flight request observes either the old
/// set or the new one, never a mixture.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<RwLock<Arc<ArtifactSet>>>,
}

impl ModelHandle {
    /// Wrap an already loaded artifact set.
    pub fn new(artifacts: ArtifactSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(artifacts))),
        }
    }

    /// Load the artifact set from disk, as done once at service start.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        Ok(Self::new(ArtifactSet::load(paths)?))
    }

    /// The current artifact generation.
    pub fn current(&self) -> Arc<ArtifactSet> {
        Arc::clone(&self.inner.read())
    }

    /// Replace the served generation with a freshly persisted one. The old
    /// generation stays alive until its last in-flight request finishes.
    pub fn reload(&self, paths: &ArtifactPaths) -> Result<()> {
        let fresh = Arc::new(ArtifactSet::load(paths)?);
        *self.inner.write() = fresh;
        info!(dir = %paths.dir().display(), "artifact set reloaded");
        Ok(())
    }
}
