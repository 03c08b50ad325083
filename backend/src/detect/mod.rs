pub mod mock;

use std::time::Duration;

use shared::DetectionResult;

#[allow(dead_code)]
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("image preprocessing failed: {0}")]
    Preprocessing(String),
    #[error("detection backend failed: {0}")]
    Backend(String),
}

/// A candidate image as handed to a detector. The mock implementation
/// never reads `bytes`; a model-backed one would.
pub struct ImageUpload<'a> {
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub bytes: &'a [u8],
}

/// Screening backend behind the analysis endpoint.
///
/// [`mock::MockDetector`] is the only implementation today; a
/// model-backed detector plugs in here without touching the routes.
pub trait Detector: Send + Sync {
    fn analyze(&self, upload: &ImageUpload<'_>) -> Result<DetectionResult, DetectError>;

    /// Latency the caller should wait out before `analyze`, real or
    /// simulated.
    fn processing_delay(&self) -> Duration {
        Duration::ZERO
    }
}
