//! HTTP client for the watermark job backend
//!
//! One reqwest client serves all three collaborator roles:
//! - `POST {base}/files` (multipart `file`) → UploadedReference
//! - `POST {base}/watermark/embed` `{fileUrl, watermarkText}` → `{taskId}`
//! - `POST {base}/watermark/extract` `{fileUrl}` → `{taskId}`
//! - `GET  {base}/watermark/tasks/{taskId}` → StatusResponse
//! - `GET  {base}/policies?status=active` → `[Policy]`

use super::{FileTransport, JobBackend, PolicyStore, StatusResponse, SubmitResponse};
use crate::error::{BackendError, TransportError};
use crate::models::{Policy, SelectedFile, UploadedReference};
use async_trait::async_trait;
use dwm_common::config::BackendConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("dwm-pipeline/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    file_url: &'a str,
    watermark_text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    file_url: &'a str,
}

/// Backend HTTP client
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn post_job<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<SubmitResponse, BackendError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let submitted: SubmitResponse = Self::read_json(response).await?;
        if submitted.task_id.trim().is_empty() {
            return Err(BackendError::InvalidResponse(
                "backend returned an empty task id".to_string(),
            ));
        }

        tracing::debug!(task_id = %submitted.task_id, path, "Job accepted by backend");
        Ok(submitted)
    }
}

#[async_trait]
impl FileTransport for HttpBackendClient {
    async fn upload(&self, file: &SelectedFile) -> Result<UploadedReference, TransportError> {
        let part = reqwest::multipart::Part::bytes(file.content().to_vec())
            .file_name(file.name().to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(
            file_name = %file.name(),
            size_bytes = file.size_bytes(),
            "Uploading file to transport"
        );

        let response = self
            .http_client
            .post(self.url("/files"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<UploadedReference>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl JobBackend for HttpBackendClient {
    async fn submit_embed(
        &self,
        file_url: &str,
        watermark_text: &str,
    ) -> Result<SubmitResponse, BackendError> {
        self.post_job(
            "/watermark/embed",
            &EmbedRequest {
                file_url,
                watermark_text,
            },
        )
        .await
    }

    async fn submit_extract(&self, file_url: &str) -> Result<SubmitResponse, BackendError> {
        self.post_job("/watermark/extract", &ExtractRequest { file_url })
            .await
    }

    async fn get_status(&self, task_id: &str) -> Result<StatusResponse, BackendError> {
        let response = self
            .http_client
            .get(self.url(&format!("/watermark/tasks/{}", task_id)))
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Self::read_json(response).await
    }
}

#[async_trait]
impl PolicyStore for HttpBackendClient {
    async fn list_active_policies(&self) -> Result<Vec<Policy>, BackendError> {
        let response = self
            .http_client
            .get(self.url("/policies"))
            .query(&[("status", "active")])
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Self::read_json(response).await
    }
}
