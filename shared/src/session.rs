use thiserror::Error;

use crate::models::DetectionResult;
use crate::upload::{FileCandidate, UploadError, UploadPolicy};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] UploadError),
    #[error("no file selected for analysis")]
    NoFileSelected,
    #[error("an analysis is already in flight")]
    AnalysisInFlight,
    #[error("analysis already completed; reset to start a new one")]
    AlreadyCompleted,
    #[error("no analysis in flight")]
    NotAnalyzing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Previewing,
    Analyzing,
    Completed,
}

/// One upload/analysis flow, from file selection to a displayed result.
///
/// The session is the single owner of its mutable state; every
/// transition is an explicit method call and invalid transitions are
/// rejected without touching state. Exactly one analysis can be in
/// flight at a time, and nothing here is shared across sessions.
#[derive(Debug)]
pub struct AnalysisSession {
    policy: UploadPolicy,
    state: SessionState,
    file: Option<FileCandidate>,
    preview: Option<String>,
    result: Option<DetectionResult>,
    error: Option<String>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::with_policy(UploadPolicy::default())
    }

    pub fn with_policy(policy: UploadPolicy) -> Self {
        Self {
            policy,
            state: SessionState::Idle,
            file: None,
            preview: None,
            result: None,
            error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selected_file(&self) -> Option<&FileCandidate> {
        self.file.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Select a candidate upload. Runs the validator; on pass the
    /// session moves to `Previewing` and any prior result is dropped.
    /// On failure the current state is kept and the error surfaced.
    pub fn select_file(&mut self, candidate: FileCandidate) -> Result<(), SessionError> {
        if self.state == SessionState::Analyzing {
            return Err(SessionError::AnalysisInFlight);
        }
        self.policy.validate(&candidate)?;

        self.file = Some(candidate);
        self.preview = None;
        self.result = None;
        self.error = None;
        self.state = SessionState::Previewing;
        Ok(())
    }

    /// Attach the displayable representation the caller decoded from
    /// the selected file (a data or object URL).
    pub fn set_preview(&mut self, preview: String) -> Result<(), SessionError> {
        if self.file.is_none() {
            return Err(SessionError::NoFileSelected);
        }
        self.preview = Some(preview);
        Ok(())
    }

    /// Begin analysis of the previewed file. Valid only in
    /// `Previewing`; from anywhere else this is a rejected no-op.
    pub fn start_analysis(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Previewing => {
                self.error = None;
                self.state = SessionState::Analyzing;
                Ok(())
            }
            SessionState::Analyzing => Err(SessionError::AnalysisInFlight),
            SessionState::Completed => Err(SessionError::AlreadyCompleted),
            SessionState::Idle => Err(SessionError::NoFileSelected),
        }
    }

    /// Deliver the detection result for the in-flight analysis.
    pub fn complete_analysis(&mut self, result: DetectionResult) -> Result<(), SessionError> {
        if self.state != SessionState::Analyzing {
            return Err(SessionError::NotAnalyzing);
        }
        self.result = Some(result);
        self.state = SessionState::Completed;
        Ok(())
    }

    /// Report a failed analysis. The file and preview are kept so the
    /// user can retry; only the in-flight state is unwound.
    pub fn fail_analysis(&mut self, message: String) -> Result<(), SessionError> {
        if self.state != SessionState::Analyzing {
            return Err(SessionError::NotAnalyzing);
        }
        self.error = Some(message);
        self.state = SessionState::Previewing;
        Ok(())
    }

    /// Discard file, preview and result and return to `Idle`. Rejected
    /// while an analysis is in flight.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Analyzing {
            return Err(SessionError::AnalysisInFlight);
        }
        self.file = None;
        self.preview = None;
        self.result = None;
        self.error = None;
        self.state = SessionState::Idle;
        Ok(())
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::MAX_UPLOAD_BYTES;

    fn png(name: &str) -> FileCandidate {
        FileCandidate {
            file_name: name.to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 2048,
        }
    }

    fn result() -> DetectionResult {
        DetectionResult {
            prediction: "No significant anomaly detected".to_string(),
            confidence: 92.1,
            recommendation: "Continue routine check-ups.".to_string(),
            image_type: None,
            resolution: None,
            format: None,
            tissues: None,
            sensitivity: None,
            specificity: None,
            accuracy: None,
            cancer_risk_score: None,
            diagnostic_notes: None,
            metadata: None,
            areas: vec![],
        }
    }

    #[test]
    fn full_flow_reaches_completed() {
        let mut session = AnalysisSession::new();
        assert_eq!(session.state(), SessionState::Idle);

        session.select_file(png("scan.png")).unwrap();
        assert_eq!(session.state(), SessionState::Previewing);

        session.set_preview("blob:scan".to_string()).unwrap();
        session.start_analysis().unwrap();
        assert_eq!(session.state(), SessionState::Analyzing);

        session.complete_analysis(result()).unwrap();
        assert_eq!(session.state(), SessionState::Completed);
        assert!(session.result().is_some());
    }

    #[test]
    fn start_analysis_from_idle_is_rejected() {
        let mut session = AnalysisSession::new();
        assert_eq!(
            session.start_analysis(),
            Err(SessionError::NoFileSelected)
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_analysis_is_accepted_exactly_once() {
        let mut session = AnalysisSession::new();
        session.select_file(png("scan.png")).unwrap();

        session.start_analysis().unwrap();
        assert_eq!(
            session.start_analysis(),
            Err(SessionError::AnalysisInFlight)
        );

        session.complete_analysis(result()).unwrap();
        assert_eq!(
            session.start_analysis(),
            Err(SessionError::AlreadyCompleted)
        );
    }

    #[test]
    fn select_and_reset_are_rejected_while_analyzing() {
        let mut session = AnalysisSession::new();
        session.select_file(png("scan.png")).unwrap();
        session.start_analysis().unwrap();

        assert_eq!(
            session.select_file(png("other.png")),
            Err(SessionError::AnalysisInFlight)
        );
        assert_eq!(session.reset(), Err(SessionError::AnalysisInFlight));
        assert_eq!(session.state(), SessionState::Analyzing);
    }

    #[test]
    fn validation_failure_keeps_current_state() {
        let mut session = AnalysisSession::new();
        session.select_file(png("scan.png")).unwrap();

        let oversized = FileCandidate {
            file_name: "huge.png".to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: MAX_UPLOAD_BYTES + 1,
        };
        let err = session.select_file(oversized).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(UploadError::FileTooLarge(_))
        ));

        // The previously selected file is untouched.
        assert_eq!(session.state(), SessionState::Previewing);
        assert_eq!(session.selected_file().unwrap().file_name, "scan.png");
    }

    #[test]
    fn reset_from_completed_clears_everything() {
        let mut session = AnalysisSession::new();
        session.select_file(png("scan.png")).unwrap();
        session.set_preview("blob:scan".to_string()).unwrap();
        session.start_analysis().unwrap();
        session.complete_analysis(result()).unwrap();

        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.selected_file().is_none());
        assert!(session.preview().is_none());
        assert!(session.result().is_none());

        // A fresh selection starts an independent flow with no leakage.
        session.select_file(png("next.png")).unwrap();
        assert!(session.result().is_none());
        assert!(session.preview().is_none());
    }

    #[test]
    fn failed_analysis_returns_to_previewing_with_file_kept() {
        let mut session = AnalysisSession::new();
        session.select_file(png("scan.png")).unwrap();
        session.start_analysis().unwrap();

        session.fail_analysis("backend unavailable".to_string()).unwrap();
        assert_eq!(session.state(), SessionState::Previewing);
        assert_eq!(session.last_error(), Some("backend unavailable"));
        assert!(session.selected_file().is_some());

        // Retry is possible from here.
        session.start_analysis().unwrap();
        assert_eq!(session.state(), SessionState::Analyzing);
    }
}
