use serde::{Deserialize, Serialize};

/// Named configuration bundle from the policy store
///
/// Only `id` is used by the pipeline (as the embed selection identifier);
/// the rest is display metadata passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub watermark_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<String>,
}
