use std::collections::HashMap;

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared::{AnalysisRecord, AnomalyArea, ResultMetadata, UserProfile};

/// Thin gateway over the managed tables: analysis records (with their
/// areas and metadata embedded as JSON attributes) and the profiles
/// table owned by the external identity service.
#[derive(Clone)]
pub struct DynamoRepository {
    client: Client,
    profiles_table: String,
    results_table: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Item not found")]
    NotFound,
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

impl DynamoRepository {
    pub fn new(client: Client, profiles_table: String, results_table: String) -> Self {
        Self {
            client,
            profiles_table,
            results_table,
        }
    }

    pub async fn put_result(&self, record: &AnalysisRecord) -> Result<(), RepositoryError> {
        let item = result_item(record)?;

        self.client
            .put_item()
            .table_name(&self.results_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        log::info!("Stored analysis record {} for user {}", record.id, record.user_id);
        Ok(())
    }

    pub async fn get_result(&self, id: Uuid) -> Result<Option<AnalysisRecord>, RepositoryError> {
        let mut key = HashMap::new();
        key.insert("id".to_string(), AttributeValue::S(id.to_string()));

        let result = self
            .client
            .get_item()
            .table_name(&self.results_table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            Ok(Some(parse_result_from_item(item)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_results_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<AnalysisRecord>, RepositoryError> {
        let result = self
            .client
            .scan()
            .table_name(&self.results_table)
            .filter_expression("user_id = :user_id")
            .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        let mut records = Vec::new();
        if let Some(items) = result.items {
            for item in items {
                records.push(parse_result_from_item(item)?);
            }
        }
        Ok(records)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        let mut key = HashMap::new();
        key.insert("id".to_string(), AttributeValue::S(user_id.to_string()));

        let result = self
            .client
            .get_item()
            .table_name(&self.profiles_table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            Ok(Some(parse_profile_from_item(item)?))
        } else {
            Ok(None)
        }
    }
}

fn insert_opt_s(
    item: &mut HashMap<String, AttributeValue>,
    attr: &str,
    value: &Option<String>,
) {
    if let Some(value) = value {
        item.insert(attr.to_string(), AttributeValue::S(value.clone()));
    }
}

fn result_item(
    record: &AnalysisRecord,
) -> Result<HashMap<String, AttributeValue>, RepositoryError> {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(record.id.to_string()));
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(record.user_id.to_string()),
    );
    item.insert(
        "image_url".to_string(),
        AttributeValue::S(record.image_url.clone()),
    );
    item.insert(
        "prediction".to_string(),
        AttributeValue::S(record.prediction.clone()),
    );
    item.insert(
        "confidence".to_string(),
        AttributeValue::N(record.confidence.to_string()),
    );
    item.insert(
        "recommendation".to_string(),
        AttributeValue::S(record.recommendation.clone()),
    );

    insert_opt_s(&mut item, "image_type", &record.image_type);
    insert_opt_s(&mut item, "resolution", &record.resolution);
    insert_opt_s(&mut item, "format", &record.format);
    insert_opt_s(&mut item, "tissues", &record.tissues);
    insert_opt_s(&mut item, "sensitivity", &record.sensitivity);
    insert_opt_s(&mut item, "specificity", &record.specificity);
    insert_opt_s(&mut item, "accuracy", &record.accuracy);
    insert_opt_s(&mut item, "diagnostic_notes", &record.diagnostic_notes);

    if let Some(score) = record.cancer_risk_score {
        item.insert(
            "cancer_risk_score".to_string(),
            AttributeValue::N(score.to_string()),
        );
    }

    if let Some(metadata) = &record.metadata {
        item.insert(
            "metadata".to_string(),
            AttributeValue::S(serde_json::to_string(metadata)?),
        );
    }

    item.insert(
        "areas".to_string(),
        AttributeValue::S(serde_json::to_string(&record.areas)?),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(record.created_at.to_rfc3339()),
    );

    Ok(item)
}

fn get_s(item: &HashMap<String, AttributeValue>, attr: &str) -> Option<String> {
    item.get(attr).and_then(|v| v.as_s().ok()).cloned()
}

fn require_s(
    item: &HashMap<String, AttributeValue>,
    attr: &str,
) -> Result<String, RepositoryError> {
    get_s(item, attr).ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {attr}")))
}

fn get_n(item: &HashMap<String, AttributeValue>, attr: &str) -> Option<f32> {
    item.get(attr)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<f32>().ok())
}

fn parse_result_from_item(
    item: HashMap<String, AttributeValue>,
) -> Result<AnalysisRecord, RepositoryError> {
    let id = item
        .get("id")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidData("Invalid record id".to_string()))?;

    let user_id = item
        .get("user_id")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidData("Invalid user_id".to_string()))?;

    let confidence = get_n(&item, "confidence")
        .ok_or_else(|| RepositoryError::InvalidData("Invalid confidence".to_string()))?;

    let metadata: Option<ResultMetadata> = item
        .get("metadata")
        .and_then(|v| v.as_s().ok())
        .map(|s| serde_json::from_str(s))
        .transpose()?;

    let areas: Vec<AnomalyArea> = item
        .get("areas")
        .and_then(|v| v.as_s().ok())
        .map(|s| serde_json::from_str(s))
        .transpose()?
        .unwrap_or_default();

    let created_at = item
        .get("created_at")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RepositoryError::InvalidData("Invalid created_at".to_string()))?;

    Ok(AnalysisRecord {
        id,
        user_id,
        image_url: require_s(&item, "image_url")?,
        prediction: require_s(&item, "prediction")?,
        confidence,
        recommendation: require_s(&item, "recommendation")?,
        image_type: get_s(&item, "image_type"),
        resolution: get_s(&item, "resolution"),
        format: get_s(&item, "format"),
        tissues: get_s(&item, "tissues"),
        sensitivity: get_s(&item, "sensitivity"),
        specificity: get_s(&item, "specificity"),
        accuracy: get_s(&item, "accuracy"),
        cancer_risk_score: get_n(&item, "cancer_risk_score"),
        diagnostic_notes: get_s(&item, "diagnostic_notes"),
        metadata,
        areas,
        created_at,
    })
}

fn parse_profile_from_item(
    item: HashMap<String, AttributeValue>,
) -> Result<UserProfile, RepositoryError> {
    let id = item
        .get("id")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidData("Invalid profile id".to_string()))?;

    let created_at = item
        .get("created_at")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RepositoryError::InvalidData("Invalid created_at".to_string()))?;

    Ok(UserProfile {
        id,
        first_name: get_s(&item, "first_name"),
        last_name: get_s(&item, "last_name"),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{AnomalyClassification, DetectionResult};

    fn make_record(area_count: usize) -> AnalysisRecord {
        let areas = (0..area_count)
            .map(|i| AnomalyArea {
                x: 10.0 + i as f32,
                y: 20.0,
                width: 8.5,
                height: 6.0,
                size: Some("1.2 cm".to_string()),
                description: Some("Localized opacity".to_string()),
                confidence: Some(77.7),
                classification: Some(AnomalyClassification::Suspicious),
            })
            .collect();

        let result = DetectionResult {
            prediction: "Potential pulmonary anomaly identified".to_string(),
            confidence: 76.3,
            recommendation: "A prompt consultation with a pulmonologist is recommended."
                .to_string(),
            image_type: Some("Chest X-ray".to_string()),
            resolution: Some("1024x1024".to_string()),
            format: Some("DICOM".to_string()),
            tissues: Some("Lung parenchyma".to_string()),
            sensitivity: Some("94.2%".to_string()),
            specificity: Some("91.8%".to_string()),
            accuracy: Some("93.0%".to_string()),
            cancer_risk_score: Some(52.5),
            diagnostic_notes: Some("Image quality adequate.".to_string()),
            metadata: Some(ResultMetadata {
                processing_time: "2.4s".to_string(),
                analysis_technique: "Region proposal screening".to_string(),
                detection_algorithm: "ResNet-50 v2".to_string(),
                ai_model_version: "medscan-2.3.1".to_string(),
                detection_threshold: 0.5,
            }),
            areas,
        };
        AnalysisRecord::new(Uuid::new_v4(), "images/u/hash.dcm".to_string(), result)
    }

    #[test]
    fn result_item_round_trips_with_areas() {
        for area_count in [0, 1, 3] {
            let record = make_record(area_count);
            let item = result_item(&record).unwrap();
            let parsed = parse_result_from_item(item).unwrap();

            assert_eq!(parsed.areas.len(), area_count);
            assert_eq!(parsed, record);
        }
    }

    #[test]
    fn sparse_record_round_trips_without_optional_attributes() {
        let mut record = make_record(0);
        record.image_type = None;
        record.resolution = None;
        record.format = None;
        record.tissues = None;
        record.sensitivity = None;
        record.specificity = None;
        record.accuracy = None;
        record.cancer_risk_score = None;
        record.diagnostic_notes = None;
        record.metadata = None;

        let item = result_item(&record).unwrap();
        assert!(!item.contains_key("cancer_risk_score"));
        assert!(!item.contains_key("metadata"));

        let parsed = parse_result_from_item(item).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn missing_required_attribute_is_invalid_data() {
        let record = make_record(1);
        let mut item = result_item(&record).unwrap();
        item.remove("prediction");

        let err = parse_result_from_item(item).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }

    #[test]
    fn profile_parses_with_and_without_names() {
        let id = Uuid::new_v4();
        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S(id.to_string()));
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(Utc::now().to_rfc3339()),
        );

        let profile = parse_profile_from_item(item.clone()).unwrap();
        assert_eq!(profile.id, id);
        assert!(profile.first_name.is_none());

        item.insert(
            "first_name".to_string(),
            AttributeValue::S("Sophie".to_string()),
        );
        let profile = parse_profile_from_item(item).unwrap();
        assert_eq!(profile.first_name.as_deref(), Some("Sophie"));
    }
}
