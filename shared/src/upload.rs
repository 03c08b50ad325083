use thiserror::Error;

/// 10 MiB, matching the upload control on the marketing page.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/dicom"];

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "dcm"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("unsupported file format: {0:?} (accepted: JPEG, PNG, DICOM)")]
    UnsupportedFormat(String),
    #[error("file of {0} bytes exceeds the 10 MiB upload limit")]
    FileTooLarge(u64),
}

/// What the validator sees of a candidate upload. The file contents are
/// read by the caller only after the candidate passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileCandidate {
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    fn has_allowed_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
    }
}

/// Gate applied to every upload before it reaches the detector or
/// storage. Pure: rejects with an error kind, accepts with no side
/// effect.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn validate(&self, candidate: &FileCandidate) -> Result<(), UploadError> {
        if !self.is_accepted_format(candidate) {
            return Err(UploadError::UnsupportedFormat(candidate.mime_type.clone()));
        }
        if candidate.size_bytes > self.max_bytes {
            return Err(UploadError::FileTooLarge(candidate.size_bytes));
        }
        Ok(())
    }

    fn is_accepted_format(&self, candidate: &FileCandidate) -> bool {
        if ALLOWED_MIME_TYPES.contains(&candidate.mime_type.as_str()) {
            return true;
        }
        // Browsers frequently hand DICOM files over with no usable MIME
        // type; fall back to the extension allow-list in that case.
        let generic =
            candidate.mime_type.is_empty() || candidate.mime_type == "application/octet-stream";
        generic && candidate.has_allowed_extension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, mime: &str, size: u64) -> FileCandidate {
        FileCandidate {
            file_name: name.to_string(),
            mime_type: mime.to_string(),
            size_bytes: size,
        }
    }

    #[test]
    fn accepts_every_allowed_type_within_limit() {
        let policy = UploadPolicy::default();
        for mime in ALLOWED_MIME_TYPES {
            assert!(policy.validate(&candidate("scan.bin", mime, 1024)).is_ok());
            assert!(
                policy
                    .validate(&candidate("scan.bin", mime, MAX_UPLOAD_BYTES))
                    .is_ok(),
                "exact limit must pass for {mime}"
            );
        }
    }

    #[test]
    fn rejects_unknown_mime_type() {
        let policy = UploadPolicy::default();
        let err = policy
            .validate(&candidate("scan.gif", "image/gif", 1024))
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_oversized_file_with_size_error() {
        let policy = UploadPolicy::default();
        let err = policy
            .validate(&candidate("scan.png", "image/png", MAX_UPLOAD_BYTES + 1))
            .unwrap_err();
        assert_eq!(err, UploadError::FileTooLarge(MAX_UPLOAD_BYTES + 1));
    }

    #[test]
    fn format_is_checked_before_size() {
        let policy = UploadPolicy::default();
        let err = policy
            .validate(&candidate("scan.gif", "image/gif", MAX_UPLOAD_BYTES + 1))
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedFormat(_)));
    }

    #[test]
    fn generic_mime_falls_back_to_extension() {
        let policy = UploadPolicy::default();
        assert!(
            policy
                .validate(&candidate("study.dcm", "application/octet-stream", 1024))
                .is_ok()
        );
        assert!(policy.validate(&candidate("study.DCM", "", 1024)).is_ok());
        assert!(
            policy
                .validate(&candidate("notes.txt", "application/octet-stream", 1024))
                .is_err()
        );
    }
}
