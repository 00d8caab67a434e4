use std::path::Path;

use crate::codec::{ImageCodec, ImageInfo};

/// Per-file validation errors for product image uploads
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported file type: {content_type} (allowed: {allowed:?})")]
    UnsupportedType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Unsupported file extension: {extension} (allowed: {allowed:?})")]
    UnsupportedExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,

    #[error("Invalid image content: {0}")]
    InvalidImageContent(String),
}

/// Product image file validator
///
/// Runs the declared-metadata checks in a fixed order (size, MIME type,
/// extension) and the deep content check through the codec. The declared
/// MIME type and the extension are validated independently; a permitted
/// but mismatched pair is accepted because the content check is what
/// actually decides whether the bytes are an image.
pub struct FileValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
    suggestion_dimension_threshold: u32,
}

impl FileValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
        suggestion_dimension_threshold: u32,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
            suggestion_dimension_threshold,
        }
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate declared content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::UnsupportedType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate file extension, returning the normalized (lowercase)
    /// extension for temp artifact naming.
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::UnsupportedExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    /// Run the declared-metadata checks in contract order.
    ///
    /// Short-circuits on the first failure so an oversized file with a bad
    /// extension reports the size problem only.
    pub fn validate_declared(
        &self,
        filename: &str,
        content_type: &str,
        size: usize,
    ) -> Result<String, ValidationError> {
        self.validate_file_size(size)?;
        self.validate_content_type(content_type)?;
        self.validate_extension(filename)
    }

    /// Deep content validation: the bytes must decode as a real image with
    /// non-zero dimensions, whatever the declared metadata claimed.
    pub fn deep_validate(
        &self,
        codec: &dyn ImageCodec,
        data: &[u8],
    ) -> Result<ImageInfo, ValidationError> {
        let info = codec
            .probe(data)
            .map_err(|e| ValidationError::InvalidImageContent(e.to_string()))?;

        if info.width == 0 || info.height == 0 {
            return Err(ValidationError::InvalidImageContent(format!(
                "image has degenerate dimensions {}x{}",
                info.width, info.height
            )));
        }

        Ok(info)
    }

    /// Non-fatal advice for accepted files. Never fails the file; callers
    /// log these alongside the audit line.
    pub fn suggestions(&self, info: &ImageInfo) -> Vec<String> {
        let mut suggestions = Vec::new();

        if info.width > self.suggestion_dimension_threshold
            || info.height > self.suggestion_dimension_threshold
        {
            suggestions.push(format!(
                "Image is {}x{} px; resizing below {} px per side before upload would speed up processing",
                info.width, info.height, self.suggestion_dimension_threshold
            ));
        }

        suggestions
    }
}
