use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use anyhow::{Result, anyhow};
use tracing::debug;

use crate::ai::types::*;
use crate::config::Config;

const ORG_SECRET_HEADER: &str = "X-ORGANIZATION-SECRET";
const API_VERSION_HEADER: &str = "X-API-Version";
const USER_ID_HEADER: &str = "X-USER-ID";

/// Client for the Sensay replica API.
#[derive(Clone)]
pub struct SensayClient {
    client: Client,
    base_url: String,
    org_secret: String,
    api_version: String,
}

impl SensayClient {
    pub fn new(base_url: &str, org_secret: &str, api_version: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            org_secret: org_secret.to_string(),
            api_version: api_version.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(&config.api_url, config.org_secret()?, &config.api_version))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.versioned_request(method, path, &self.api_version)
    }

    fn versioned_request(&self, method: Method, path: &str, api_version: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, api_version, "replica API request");
        self.client
            .request(method, url)
            .header(ORG_SECRET_HEADER, &self.org_secret)
            .header(API_VERSION_HEADER, api_version)
            .header("Content-Type", "application/json")
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Sensay API error {}: {}", status, text));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = Self::send(request).await?;
        Ok(response.json().await?)
    }

    /// Ask a replica for a reply. Returns `None` when the API answered without content.
    pub async fn chat_completion(
        &self,
        replica_uuid: &str,
        user_id: &str,
        content: &str,
    ) -> Result<Option<String>> {
        let request = ChatCompletionRequest {
            content,
            skip_chat_history: true,
            source: "web",
        };

        let response: ChatCompletionResponse = Self::send_json(
            self.request(Method::POST, &format!("/v1/replicas/{}/chat/completions", replica_uuid))
                .header(USER_ID_HEADER, user_id)
                .json(&request),
        )
        .await?;

        Ok(response.content.filter(|c| !c.is_empty()))
    }

    pub async fn list_replicas(&self, owner_id: &str) -> Result<Vec<Replica>> {
        let list: ReplicaList = Self::send_json(
            self.request(Method::GET, "/v1/replicas")
                .query(&[("ownerID", owner_id)]),
        )
        .await?;
        Ok(list.items)
    }

    pub async fn get_replica(&self, replica_uuid: &str) -> Result<Replica> {
        Self::send_json(self.request(Method::GET, &format!("/v1/replicas/{}", replica_uuid))).await
    }

    /// Create a replica and return its UUID.
    pub async fn create_replica(&self, replica: &NewReplica) -> Result<String> {
        let created: CreatedReplica =
            Self::send_json(self.request(Method::POST, "/v1/replicas").json(replica)).await?;
        created
            .uuid
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow!("replica UUID missing from create response"))
    }

    pub async fn delete_replica(&self, replica_uuid: &str) -> Result<()> {
        Self::send(self.request(Method::DELETE, &format!("/v1/replicas/{}", replica_uuid))).await?;
        Ok(())
    }

    /// Open an empty knowledge-base entry for a replica and return its id.
    pub async fn create_training_entry(&self, replica_uuid: &str) -> Result<i64> {
        let created: CreatedTraining = Self::send_json(
            self.request(Method::POST, &format!("/v1/replicas/{}/training", replica_uuid)),
        )
        .await?;
        created
            .knowledge_base_id
            .ok_or_else(|| anyhow!("training ID missing from create response"))
    }

    /// Fill a knowledge-base entry. `api_version` overrides the client default for this call.
    pub async fn update_training_entry(
        &self,
        replica_uuid: &str,
        training_id: i64,
        update: &TrainingUpdate,
        api_version: Option<&str>,
    ) -> Result<()> {
        let request = self
            .versioned_request(
                Method::PUT,
                &format!("/v1/replicas/{}/training/{}", replica_uuid, training_id),
                api_version.unwrap_or(&self.api_version),
            )
            .json(update);
        Self::send(request).await?;
        Ok(())
    }

    pub async fn list_training(&self, limit: u32) -> Result<Vec<TrainingItem>> {
        let list: TrainingList = Self::send_json(
            self.request(Method::GET, "/v1/training")
                .query(&[("limit", limit.to_string())]),
        )
        .await?;
        Ok(list.items)
    }

    pub async fn delete_training(&self, training_id: i64) -> Result<()> {
        let flag: SuccessFlag = Self::send_json(
            self.request(Method::DELETE, &format!("/v1/training/{}", training_id)),
        )
        .await?;
        if !flag.success {
            return Err(anyhow!("training entry {} was not deleted", training_id));
        }
        Ok(())
    }

    /// Signed URL a training file can be PUT to.
    pub async fn training_upload_url(&self, replica_uuid: &str, filename: &str) -> Result<String> {
        let upload: SignedUpload = Self::send_json(
            self.request(
                Method::GET,
                &format!("/v1/replicas/{}/training/files/upload", replica_uuid),
            )
            .query(&[("filename", filename)]),
        )
        .await?;
        upload
            .signed_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow!("upload URL missing from response"))
    }

    /// PUT raw bytes to a signed URL. No API headers are sent.
    pub async fn upload_signed(&self, signed_url: &str, bytes: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .put(signed_url)
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("file upload failed with status: {}", response.status()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SensayClient {
        SensayClient::new(&server.uri(), "test-secret", "2025-05-01")
    }

    #[tokio::test]
    async fn chat_completion_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/replicas/rep-1/chat/completions"))
            .and(header("X-ORGANIZATION-SECRET", "test-secret"))
            .and(header("X-API-Version", "2025-05-01"))
            .and(header("X-USER-ID", "visitor"))
            .and(body_json(json!({
                "content": "Usuário: oi",
                "skip_chat_history": true,
                "source": "web"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "content": "Olá!"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let reply = client.chat_completion("rep-1", "visitor", "Usuário: oi").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Olá!"));
    }

    #[tokio::test]
    async fn chat_completion_empty_content_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "content": ""})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.chat_completion("r", "u", "x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/replicas/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("replica not found"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_replica("missing").await.unwrap_err().to_string();
        assert!(err.contains("404"), "{err}");
        assert!(err.contains("replica not found"), "{err}");
    }

    #[tokio::test]
    async fn list_replicas_filters_by_owner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/replicas"))
            .and(query_param("ownerID", "fitconnect-admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "items": [{
                    "uuid": "r-1",
                    "name": "FitConnect",
                    "slug": "fitconnect-assistant",
                    "shortDescription": "Connect you",
                    "ownerID": "fitconnect-admin",
                    "tags": ["fitness"],
                    "private": false,
                    "chat_history_count": 3
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let replicas = client.list_replicas("fitconnect-admin").await.unwrap();
        assert_eq!(replicas.len(), 1);
        assert_eq!(replicas[0].uuid, "r-1");
        assert_eq!(replicas[0].short_description.as_deref(), Some("Connect you"));
        assert_eq!(replicas[0].extra["chat_history_count"], 3);
    }

    #[tokio::test]
    async fn create_replica_requires_uuid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/replicas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let replica = crate::replica::default_replica().to_new_replica();
        assert!(client.create_replica(&replica).await.is_err());
    }

    #[tokio::test]
    async fn update_training_can_override_api_version() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/replicas/r-1/training/42"))
            .and(header("X-API-Version", "2025-03-25"))
            .and(body_json(json!({"processedText": "clean"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let update = TrainingUpdate {
            processed_text: Some("clean".into()),
            ..Default::default()
        };
        client
            .update_training_entry("r-1", 42, &update, Some("2025-03-25"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_training_checks_success_flag() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/training/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.delete_training(7).await.is_err());
    }

    #[tokio::test]
    async fn upload_goes_to_signed_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/replicas/r-1/training/files/upload"))
            .and(query_param("filename", "initial.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "signedURL": format!("{}/bucket/initial.txt", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/bucket/initial.txt"))
            .and(header("Content-Type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.training_upload_url("r-1", "initial.txt").await.unwrap();
        client.upload_signed(&url, b"hello".to_vec()).await.unwrap();
    }
}
