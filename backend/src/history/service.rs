use uuid::Uuid;

use shared::{AnalysisRecord, DetectionResult};

use crate::db::repository::{DynamoRepository, RepositoryError};
use crate::storage::image_store::{ImageStore, StorageError};

/// Per-user analysis history over the repository and the image store.
/// Owns the authorization boundary: a record only leaves this service
/// towards the user it belongs to.
#[derive(Clone)]
pub struct HistoryService {
    db_repo: DynamoRepository,
    image_store: ImageStore,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Analysis record not found")]
    NotFound,
    #[error("Record belongs to a different user")]
    Forbidden,
}

fn authorize(record: &AnalysisRecord, requester: Uuid) -> Result<(), HistoryError> {
    if record.user_id != requester {
        return Err(HistoryError::Forbidden);
    }
    Ok(())
}

impl HistoryService {
    pub fn new(db_repo: DynamoRepository, image_store: ImageStore) -> Self {
        Self {
            db_repo,
            image_store,
        }
    }

    /// Store the uploaded image and persist the computed result for the
    /// given user. The result itself was already delivered to the
    /// caller; a failure here degrades to a warning, never a rollback.
    pub async fn archive(
        &self,
        user_id: Uuid,
        image_data: &[u8],
        mime_type: &str,
        result: &DetectionResult,
    ) -> Result<AnalysisRecord, HistoryError> {
        let image_url = self.image_store.store(user_id, image_data, mime_type).await?;
        let record = AnalysisRecord::new(user_id, image_url, result.clone());
        self.db_repo.put_result(&record).await?;
        Ok(record)
    }

    /// The requester's records, newest first.
    pub async fn list_for(&self, user_id: Uuid) -> Result<Vec<AnalysisRecord>, HistoryError> {
        let mut records = self.db_repo.list_results_by_user(user_id).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// A single record, only if it belongs to the requester. An owner
    /// mismatch yields `Forbidden` without exposing the record body.
    pub async fn fetch_for(
        &self,
        requester: Uuid,
        id: Uuid,
    ) -> Result<AnalysisRecord, HistoryError> {
        let record = self
            .db_repo
            .get_result(id)
            .await?
            .ok_or(HistoryError::NotFound)?;
        authorize(&record, requester)?;
        Ok(record)
    }

    /// Image bytes backing a record, with their MIME type. Callers go
    /// through `fetch_for` first, so the ownership check has already
    /// run on `record`.
    pub async fn fetch_image(
        &self,
        record: &AnalysisRecord,
    ) -> Result<(Vec<u8>, &'static str), HistoryError> {
        let bytes = self.image_store.fetch(&record.image_url).await?;
        Ok((bytes, ImageStore::mime_for_key(&record.image_url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(user_id: Uuid) -> AnalysisRecord {
        let result = DetectionResult {
            prediction: "Bone anomalies detected".to_string(),
            confidence: 81.7,
            recommendation: "A consultation with an orthopedist is recommended for evaluation."
                .to_string(),
            image_type: None,
            resolution: None,
            format: None,
            tissues: None,
            sensitivity: None,
            specificity: None,
            accuracy: None,
            cancer_risk_score: Some(44.0),
            diagnostic_notes: None,
            metadata: None,
            areas: vec![],
        };
        AnalysisRecord::new(user_id, "images/u/h.png".to_string(), result)
    }

    #[test]
    fn owner_passes_authorization() {
        let owner = Uuid::new_v4();
        let record = make_record(owner);
        assert!(authorize(&record, owner).is_ok());
    }

    #[test]
    fn other_user_is_forbidden() {
        let record = make_record(Uuid::new_v4());
        let err = authorize(&record, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, HistoryError::Forbidden));
    }
}
