//! The FitConnect replica definition and the steps that bring it to life
//! on the replica API.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::ai::{LlmSettings, NewReplica, SensayClient, TrainingUpdate};

pub const CLIENT_CONFIG_FILE: &str = "replica-client-config.json";
pub const DEFAULT_MODEL: &str = "claude-4-sonnet-20250514";

const PERSONALITY: &str = "You are a specialized assistant from FitConnect that helps people find the perfect personal trainer through a structured questionnaire and personalized.

IMPORTANT: You must follow EXACTLY the instructions contained in the training file initial.txt. Follow the conversation flow, style, and all rules specified in this file.

Main traits:
- Be friendly, informal, and motivating
- Pass confidence and encourage the user
- Use short, natural phrases
- Always wait for the response before proceeding
- Follow the exact order of questions in the questionnaire
- Make motivational comments between questions
- At the end, present a maximum of 3 recommended personal trainers

Your goal is to collect all the necessary information following the structured flow and then present the best options for personal trainers for the user.";

#[derive(Debug, Clone)]
pub struct ReplicaDefinition {
    pub name: String,
    pub purpose: String,
    pub short_description: String,
    pub greeting: String,
    pub kind: String,
    pub owner_id: String,
    pub slug: String,
    pub tags: Vec<String>,
    pub model: String,
    pub personality: String,
    /// Relative to the training directory.
    pub training_file: PathBuf,
}

pub fn default_replica() -> ReplicaDefinition {
    ReplicaDefinition {
        name: "FitConnect".to_string(),
        purpose: "We connect you to the perfect personal trainer through artificial intelligence. \
                  No complications, no wasted time, just the ideal match for your goals."
            .to_string(),
        short_description: "Connect you to the perfect personal trainer".to_string(),
        greeting: "Hello! I'm your personal assistant to find the perfect personal trainer for you. \
                   Let's discover together which professional perfectly matches your goals and \
                   preferences. Ready to start?"
            .to_string(),
        kind: "character".to_string(),
        owner_id: crate::config::DEFAULT_OWNER_ID.to_string(),
        slug: "fitconnect-assistant-english".to_string(),
        tags: ["fitness", "personal-trainer", "health", "training", "matchmaking"]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        model: DEFAULT_MODEL.to_string(),
        personality: PERSONALITY.to_string(),
        training_file: PathBuf::from("initial.txt"),
    }
}

impl ReplicaDefinition {
    pub fn to_new_replica(&self) -> NewReplica {
        NewReplica {
            name: self.name.clone(),
            purpose: self.purpose.clone(),
            short_description: self.short_description.clone(),
            greeting: self.greeting.clone(),
            kind: self.kind.clone(),
            owner_id: self.owner_id.clone(),
            slug: self.slug.clone(),
            tags: self.tags.clone(),
            profile_image: None,
            suggested_questions: Vec::new(),
            llm: LlmSettings {
                model: self.model.clone(),
                system_message: self.personality.clone(),
            },
        }
    }
}

/// What `provision` writes next to the training data so clients can find the replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub name: String,
    pub uuid: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Provisioned {
    pub client_config: ClientConfig,
    /// Knowledge-base entry holding the training file, if one was uploaded.
    pub training_id: Option<i64>,
}

/// Open a training entry on `replica_uuid` and fill it. Returns the entry id.
pub async fn train_text(
    client: &SensayClient,
    replica_uuid: &str,
    update: &TrainingUpdate,
    api_version: Option<&str>,
) -> Result<i64> {
    let training_id = client.create_training_entry(replica_uuid).await?;
    client
        .update_training_entry(replica_uuid, training_id, update, api_version)
        .await
        .with_context(|| format!("filling training entry {}", training_id))?;
    info!(replica_uuid, training_id, "training content uploaded");
    Ok(training_id)
}

/// Training text tagged with where it came from, e.g. `("file_upload", "faq.txt")`.
pub fn text_with_source(text: &str, kind: &str, source: &str) -> TrainingUpdate {
    let mut metadata = Map::new();
    metadata.insert("source".to_string(), Value::String(source.to_string()));
    metadata.insert("type".to_string(), Value::String(kind.to_string()));
    metadata.insert(
        "extracted_at".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    TrainingUpdate {
        raw_text: Some(text.to_string()),
        metadata: Some(metadata),
        ..Default::default()
    }
}

/// Create the replica, train it on its training file when present, and save
/// the client config to `output`.
pub async fn provision(
    client: &SensayClient,
    definition: &ReplicaDefinition,
    training_dir: &Path,
    output: &Path,
) -> Result<Provisioned> {
    info!(name = %definition.name, slug = %definition.slug, "creating replica");
    let uuid = client.create_replica(&definition.to_new_replica()).await?;

    let training_path = training_dir.join(&definition.training_file);
    let training_id = if training_path.is_file() {
        let text = fs::read_to_string(&training_path)
            .with_context(|| format!("reading {}", training_path.display()))?;
        Some(train_text(client, &uuid, &TrainingUpdate::raw(text), None).await?)
    } else {
        warn!(path = %training_path.display(), "training file not found, replica left untrained");
        None
    };

    let client_config = ClientConfig {
        name: definition.name.clone(),
        uuid,
        slug: definition.slug.clone(),
        created_at: Utc::now(),
    };
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, serde_json::to_string_pretty(&client_config)?)
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(Provisioned {
        client_config,
        training_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_create(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/replicas"))
            .and(body_partial_json(json!({
                "name": "FitConnect",
                "type": "character",
                "ownerID": "fitconnect-admin",
                "slug": "fitconnect-assistant-english",
                "llm": {"model": DEFAULT_MODEL}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "uuid": "new-uuid"})))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn default_replica_serializes_api_names() {
        let body = serde_json::to_value(default_replica().to_new_replica()).unwrap();
        assert_eq!(body["shortDescription"], "Connect you to the perfect personal trainer");
        assert_eq!(body["llm"]["systemMessage"].as_str().unwrap(), PERSONALITY);
        assert_eq!(body["tags"].as_array().unwrap().len(), 5);
        assert!(body.get("profileImage").is_none());
    }

    #[tokio::test]
    async fn provision_trains_and_writes_config() {
        let server = MockServer::start().await;
        mock_create(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/replicas/new-uuid/training"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "knowledgeBaseID": 99})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/replicas/new-uuid/training/99"))
            .and(body_json(json!({"rawText": "Ask about goals first."})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("initial.txt"), "Ask about goals first.").unwrap();
        let output = tmp.path().join(CLIENT_CONFIG_FILE);

        let client = SensayClient::new(&server.uri(), "s", "2025-05-01");
        let result = provision(&client, &default_replica(), tmp.path(), &output)
            .await
            .unwrap();

        assert_eq!(result.training_id, Some(99));
        let saved = ClientConfig::load(&output).unwrap();
        assert_eq!(saved.uuid, "new-uuid");
        assert_eq!(saved.slug, "fitconnect-assistant-english");

        let raw: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert!(raw.get("createdAt").is_some());
    }

    #[tokio::test]
    async fn provision_without_training_file_skips_training() {
        let server = MockServer::start().await;
        mock_create(&server).await;

        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join(CLIENT_CONFIG_FILE);
        let client = SensayClient::new(&server.uri(), "s", "2025-05-01");
        let result = provision(&client, &default_replica(), tmp.path(), &output)
            .await
            .unwrap();

        assert_eq!(result.training_id, None);
        assert!(output.exists());
    }

    #[test]
    fn source_metadata_is_attached() {
        let update = text_with_source("content", "file_upload", "faq.txt");
        assert_eq!(update.raw_text.as_deref(), Some("content"));
        let metadata = update.metadata.unwrap();
        assert_eq!(metadata["type"], "file_upload");
        assert_eq!(metadata["source"], "faq.txt");
        assert!(metadata.contains_key("extracted_at"));
    }
}
