use reelscope_core::{Config, JobError};
use std::path::Path;

/// Reasons an upload is refused before anything is staged or sent.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Video too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported video extension: {extension} (allowed: {allowed:?})")]
    UnsupportedExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Unsupported content type: {content_type} (allowed: {allowed:?})")]
    UnsupportedContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Content type {content_type} does not match extension .{extension}")]
    MismatchedContentType {
        extension: String,
        content_type: String,
    },

    #[error("Missing file extension: {0}")]
    MissingExtension(String),

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for JobError {
    fn from(err: ValidationError) -> Self {
        JobError::invalid_input(err.to_string())
    }
}

/// Upload gate for video files.
pub struct VideoValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

fn extension_of(filename: &str) -> Result<String, ValidationError> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))
}

fn expected_content_types(extension: &str) -> Option<&'static [&'static str]> {
    match extension {
        "mp4" => Some(&["video/mp4"]),
        "mov" => Some(&["video/quicktime"]),
        "avi" => Some(&["video/x-msvideo", "video/avi"]),
        "webm" => Some(&["video/webm"]),
        "mkv" => Some(&["video/x-matroska"]),
        "m4v" => Some(&["video/x-m4v", "video/mp4"]),
        _ => None,
    }
}

impl VideoValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_video_size_bytes(),
            config.video_allowed_extensions().to_vec(),
            config.video_allowed_content_types().to_vec(),
        )
    }

    pub fn validate_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = extension_of(filename)?;
        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::UnsupportedExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }
        Ok(())
    }

    /// An empty allow-list accepts any declared type.
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if self.allowed_content_types.is_empty() {
            return Ok(());
        }
        let normalized = content_type.trim().to_lowercase();
        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::UnsupportedContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }
        Ok(())
    }

    /// Reject a declared type that contradicts the file extension.
    pub fn validate_match(&self, filename: &str, content_type: &str) -> Result<(), ValidationError> {
        let extension = extension_of(filename)?;
        let Some(expected) = expected_content_types(&extension) else {
            tracing::debug!(
                extension = %extension,
                content_type = %content_type,
                "Unknown video extension, skipping content type cross-check"
            );
            return Ok(());
        };

        let normalized = content_type.trim().to_lowercase();
        if !expected.iter().any(|ct| *ct == normalized) {
            return Err(ValidationError::MismatchedContentType {
                extension,
                content_type: content_type.to_string(),
            });
        }
        Ok(())
    }

    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        size: usize,
    ) -> Result<(), ValidationError> {
        self.validate_size(size)?;
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        self.validate_match(filename, content_type)?;
        Ok(())
    }
}
