pub mod models;
pub mod session;
pub mod upload;

pub use models::{
    AnalysisRecord, AnalyzeResponse, AnomalyArea, AnomalyClassification, DetectionResult,
    ResultMetadata, UserProfile,
};
pub use session::{AnalysisSession, SessionError, SessionState};
pub use upload::{FileCandidate, UploadError, UploadPolicy};
