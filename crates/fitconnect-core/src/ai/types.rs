//! Wire types for the Sensay replica API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub content: &'a str,
    pub skip_chat_history: bool,
    pub source: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replica {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "ownerID")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
    /// Everything else the API returns, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
pub(crate) struct ReplicaList {
    #[serde(default)]
    pub items: Vec<Replica>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReplica {
    pub name: String,
    pub purpose: String,
    pub short_description: String,
    pub greeting: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ownerID")]
    pub owner_id: String,
    pub slug: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggested_questions: Vec<String>,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    pub model: String,
    pub system_message: String,
}

#[derive(Deserialize)]
pub(crate) struct CreatedReplica {
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct CreatedTraining {
    #[serde(default, rename = "knowledgeBaseID")]
    pub knowledge_base_id: Option<i64>,
}

/// Body of a training entry update. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl TrainingUpdate {
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            raw_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_text.as_deref().map_or(true, str::is_empty)
            && self.processed_text.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingItem {
    pub id: i64,
    #[serde(default)]
    pub replica_uuid: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub processed_text: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct TrainingList {
    #[serde(default)]
    pub items: Vec<TrainingItem>,
}

#[derive(Deserialize)]
pub(crate) struct SuccessFlag {
    #[serde(default)]
    pub success: bool,
}

#[derive(Deserialize)]
pub(crate) struct SignedUpload {
    #[serde(default, rename = "signedURL")]
    pub signed_url: Option<String>,
}
