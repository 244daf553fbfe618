//! Document file intake
//!
//! Validates a user-selected file against the size ceiling and extension
//! allow-list before anything is transmitted. Validation is pure: a rejected
//! file never touches the current selection.

use crate::error::ValidationError;
use crate::models::SelectedFile;
use dwm_common::config::IntakeConfig;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Document file validator
#[derive(Debug, Clone)]
pub struct FileIntake {
    max_size_bytes: u64,
    allowed_extensions: BTreeSet<String>,
}

impl FileIntake {
    pub fn new(config: &IntakeConfig) -> Self {
        Self {
            max_size_bytes: config.max_size_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed_extensions.iter().map(String::as_str)
    }

    /// Validate name and size, returning the lower-cased extension
    ///
    /// Checks run in order: size, extension presence, extension membership.
    pub fn validate(&self, file_name: &str, size_bytes: u64) -> Result<String, ValidationError> {
        if size_bytes > self.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size_bytes,
                max_size_bytes: self.max_size_bytes,
            });
        }

        let extension = extension_of(file_name).ok_or_else(|| ValidationError::MissingExtension {
            file_name: file_name.to_string(),
        })?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::UnsupportedType {
                extension,
                allowed: self
                    .allowed_extensions
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        Ok(extension)
    }

    /// Validate and wrap a file as the new selection
    pub fn select(
        &self,
        file_name: impl Into<String>,
        content: impl Into<Arc<[u8]>>,
    ) -> Result<SelectedFile, ValidationError> {
        let file_name = file_name.into();
        let content = content.into();

        match self.validate(&file_name, content.len() as u64) {
            Ok(extension) => {
                tracing::debug!(
                    file_name = %file_name,
                    size_bytes = content.len(),
                    extension = %extension,
                    "File accepted by intake"
                );
                Ok(SelectedFile::new(file_name, extension, content))
            }
            Err(e) => {
                tracing::warn!(file_name = %file_name, error = %e, "File rejected by intake");
                Err(e)
            }
        }
    }
}

/// Lower-cased text after the last dot, if non-empty
fn extension_of(file_name: &str) -> Option<String> {
    // Only the final path component counts
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);

    match base.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext.to_lowercase()),
        _ => None,
    }
}
