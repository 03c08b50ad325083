use std::time::Duration;

use rand::Rng;
use rand::rngs::ThreadRng;
use shared::{AnomalyArea, AnomalyClassification, DetectionResult, ResultMetadata};

use super::{DetectError, Detector, ImageUpload};

struct OutcomeTemplate {
    prediction: &'static str,
    recommendation: &'static str,
    confidence: (f32, f32),
    /// None marks the clear outcome: no risk score, no areas.
    risk_score: Option<(f32, f32)>,
    classification: Option<AnomalyClassification>,
    tissues: &'static [&'static str],
}

const OUTCOMES: [OutcomeTemplate; 4] = [
    OutcomeTemplate {
        prediction: "Benign tumor suspicion detected",
        recommendation: "Consult a specialist for a complementary evaluation.",
        confidence: (80.0, 92.0),
        risk_score: Some((20.0, 45.0)),
        classification: Some(AnomalyClassification::Benign),
        tissues: &["Soft tissue", "Glandular tissue"],
    },
    OutcomeTemplate {
        prediction: "Potential pulmonary anomaly identified",
        recommendation: "A prompt consultation with a pulmonologist is recommended.",
        confidence: (70.0, 86.0),
        risk_score: Some((40.0, 70.0)),
        classification: Some(AnomalyClassification::Suspicious),
        tissues: &["Lung parenchyma"],
    },
    OutcomeTemplate {
        prediction: "No significant anomaly detected",
        recommendation: "Continue routine check-ups as advised by your physician.",
        confidence: (88.0, 97.0),
        risk_score: None,
        classification: None,
        tissues: &["Soft tissue"],
    },
    OutcomeTemplate {
        prediction: "Bone anomalies detected",
        recommendation: "A consultation with an orthopedist is recommended for evaluation.",
        confidence: (75.0, 88.0),
        risk_score: Some((30.0, 60.0)),
        classification: Some(AnomalyClassification::Indeterminate),
        tissues: &["Cortical bone", "Trabecular bone"],
    },
];

const IMAGE_TYPES: [&str; 4] = [
    "Chest X-ray",
    "Brain MRI",
    "Mammography",
    "Abdominal CT scan",
];
const RESOLUTIONS: [&str; 3] = ["512x512", "1024x1024", "2048x2048"];
const FORMATS: [&str; 3] = ["DICOM", "JPEG", "PNG"];
const TECHNIQUES: [&str; 3] = [
    "Convolutional feature extraction",
    "Multi-scale texture analysis",
    "Region proposal screening",
];
const ALGORITHMS: [&str; 3] = [
    "DenseNet-201 ensemble",
    "ResNet-50 v2",
    "EfficientNet-B4",
];
const MODEL_VERSIONS: [&str; 2] = ["medscan-2.3.1", "medscan-2.4.0"];
const THRESHOLDS: [f32; 3] = [0.5, 0.65, 0.75];
const AREA_DESCRIPTIONS: [&str; 4] = [
    "Dense region with irregular margins",
    "Localized opacity",
    "Calcification cluster",
    "Well-circumscribed nodular lesion",
];
const AREA_LOCATIONS: [&str; 3] = [
    "upper outer quadrant",
    "lower lobe",
    "medial region",
];

fn pick<'a>(rng: &mut ThreadRng, items: &'a [&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

fn percent_string(rng: &mut ThreadRng, lo: f32, hi: f32) -> String {
    format!("{:.1}%", rng.random_range(lo..hi))
}

fn generate_areas(rng: &mut ThreadRng, template: &OutcomeTemplate) -> Vec<AnomalyArea> {
    let count = rng.random_range(1..=3);
    (0..count)
        .map(|_| {
            let classification = if rng.random_bool(0.7) {
                template.classification
            } else {
                Some(AnomalyClassification::Indeterminate)
            };
            AnomalyArea {
                x: round1(rng.random_range(10.0..70.0)),
                y: round1(rng.random_range(10.0..70.0)),
                width: round1(rng.random_range(4.0..25.0)),
                height: round1(rng.random_range(4.0..25.0)),
                size: Some(format!("{:.1} cm", rng.random_range(0.4..2.8))),
                description: Some(pick(rng, &AREA_DESCRIPTIONS).to_string()),
                confidence: Some(round1(rng.random_range(55.0..95.0))),
                classification,
            }
        })
        .collect()
}

/// Build one synthetic detection result. Every field is drawn from the
/// fixed candidate sets above; the image content is never inspected.
pub fn generate_result() -> DetectionResult {
    let mut rng = rand::rng();
    let template = &OUTCOMES[rng.random_range(0..OUTCOMES.len())];

    let (lo, hi) = template.confidence;
    let confidence = round1(rng.random_range(lo..hi));

    let cancer_risk_score = template
        .risk_score
        .map(|(lo, hi)| round1(rng.random_range(lo..hi)));

    let areas = if template.risk_score.is_some() {
        generate_areas(&mut rng, template)
    } else {
        Vec::new()
    };

    let diagnostic_notes = areas.first().map(|area| {
        format!(
            "Image quality adequate. The detection shows a potential mass of {} in the {}.",
            area.size.as_deref().unwrap_or("unknown size"),
            pick(&mut rng, &AREA_LOCATIONS),
        )
    });

    let metadata = ResultMetadata {
        processing_time: format!("{:.1}s", rng.random_range(1.2..3.9)),
        analysis_technique: pick(&mut rng, &TECHNIQUES).to_string(),
        detection_algorithm: pick(&mut rng, &ALGORITHMS).to_string(),
        ai_model_version: pick(&mut rng, &MODEL_VERSIONS).to_string(),
        detection_threshold: THRESHOLDS[rng.random_range(0..THRESHOLDS.len())],
    };

    DetectionResult {
        prediction: template.prediction.to_string(),
        confidence,
        recommendation: template.recommendation.to_string(),
        image_type: Some(pick(&mut rng, &IMAGE_TYPES).to_string()),
        resolution: Some(pick(&mut rng, &RESOLUTIONS).to_string()),
        format: Some(pick(&mut rng, &FORMATS).to_string()),
        tissues: Some(pick(&mut rng, template.tissues).to_string()),
        sensitivity: Some(percent_string(&mut rng, 88.0, 97.5)),
        specificity: Some(percent_string(&mut rng, 86.0, 96.5)),
        accuracy: Some(percent_string(&mut rng, 88.0, 96.0)),
        cancer_risk_score,
        diagnostic_notes,
        metadata: Some(metadata),
        areas,
    }
}

/// Random stand-in for a real inference backend. Always succeeds after
/// a fixed simulated latency.
pub struct MockDetector {
    delay: Duration,
}

impl MockDetector {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_secs(2),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for MockDetector {
    fn analyze(&self, _upload: &ImageUpload<'_>) -> Result<DetectionResult, DetectError> {
        Ok(generate_result())
    }

    fn processing_delay(&self) -> Duration {
        self.delay
    }
}
