//! Selected and uploaded file models

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A validated, not yet transmitted file
///
/// The raw content is shared, so cloning a selection does not copy the bytes.
/// Content is never serialized into snapshots.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFile {
    name: String,
    size_bytes: u64,
    /// Lower-case extension without the dot
    extension: String,
    #[serde(skip)]
    content: Arc<[u8]>,
}

impl SelectedFile {
    /// Only file intake constructs selections, after validation
    pub(crate) fn new(name: String, extension: String, content: Arc<[u8]>) -> Self {
        Self {
            name,
            size_bytes: content.len() as u64,
            extension,
            content,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

/// Stable reference returned by the file transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedReference {
    /// Opaque locator handed to the job backend
    pub file_url: String,
    pub file_name: String,
    pub file_size_bytes: u64,
}
