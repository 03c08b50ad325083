use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Outcome of a single screening request. Produced once per analysis
/// invocation and discarded unless the caller is signed in, in which
/// case it is flattened into an [`AnalysisRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub prediction: String,
    /// Percentage in [0, 100].
    pub confidence: f32,
    pub recommendation: String,
    pub image_type: Option<String>,
    pub resolution: Option<String>,
    pub format: Option<String>,
    pub tissues: Option<String>,
    pub sensitivity: Option<String>,
    pub specificity: Option<String>,
    pub accuracy: Option<String>,
    /// Percentage in [0, 100]; absent for a clear outcome.
    pub cancer_risk_score: Option<f32>,
    pub diagnostic_notes: Option<String>,
    pub metadata: Option<ResultMetadata>,
    #[serde(default)]
    pub areas: Vec<AnomalyArea>,
}

impl DetectionResult {
    pub fn is_anomalous(&self) -> bool {
        !self.areas.is_empty()
    }
}

/// Cosmetic details about how the (simulated) model ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub processing_time: String,
    pub analysis_technique: String,
    pub detection_algorithm: String,
    pub ai_model_version: String,
    pub detection_threshold: f32,
}

/// A flagged region of interest within the analyzed image.
///
/// Coordinates and dimensions are percentages of the image dimensions,
/// in [0, 100]. Width and height are always strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub size: Option<String>,
    pub description: Option<String>,
    pub confidence: Option<f32>,
    pub classification: Option<AnomalyClassification>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum AnomalyClassification {
    Suspicious,
    Benign,
    Indeterminate,
}

/// Persisted form of a [`DetectionResult`]: the result fields plus the
/// owning user, the stored image and a creation timestamp. Immutable
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    pub prediction: String,
    pub confidence: f32,
    pub recommendation: String,
    pub image_type: Option<String>,
    pub resolution: Option<String>,
    pub format: Option<String>,
    pub tissues: Option<String>,
    pub sensitivity: Option<String>,
    pub specificity: Option<String>,
    pub accuracy: Option<String>,
    pub cancer_risk_score: Option<f32>,
    pub diagnostic_notes: Option<String>,
    pub metadata: Option<ResultMetadata>,
    #[serde(default)]
    pub areas: Vec<AnomalyArea>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(user_id: Uuid, image_url: String, result: DetectionResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            image_url,
            prediction: result.prediction,
            confidence: result.confidence,
            recommendation: result.recommendation,
            image_type: result.image_type,
            resolution: result.resolution,
            format: result.format,
            tissues: result.tissues,
            sensitivity: result.sensitivity,
            specificity: result.specificity,
            accuracy: result.accuracy,
            cancer_risk_score: result.cancer_risk_score,
            diagnostic_notes: result.diagnostic_notes,
            metadata: result.metadata,
            areas: result.areas,
            created_at: Utc::now(),
        }
    }

    pub fn to_detection_result(&self) -> DetectionResult {
        DetectionResult {
            prediction: self.prediction.clone(),
            confidence: self.confidence,
            recommendation: self.recommendation.clone(),
            image_type: self.image_type.clone(),
            resolution: self.resolution.clone(),
            format: self.format.clone(),
            tissues: self.tissues.clone(),
            sensitivity: self.sensitivity.clone(),
            specificity: self.specificity.clone(),
            accuracy: self.accuracy.clone(),
            cancer_risk_score: self.cancer_risk_score,
            diagnostic_notes: self.diagnostic_notes.clone(),
            metadata: self.metadata.clone(),
            areas: self.areas.clone(),
        }
    }
}

/// Profile data owned and mutated by the external identity service;
/// read-only on this side of the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response body of the analysis endpoint. `record_id` and `saved` only
/// carry information for authenticated callers; a failed save degrades
/// to `saved: false` plus a warning while the result is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub result: DetectionResult,
    pub record_id: Option<Uuid>,
    pub saved: bool,
    pub warning: Option<String>,
}
