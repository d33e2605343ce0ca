/// Client for the video platform REST API (sessions, archives, renders).
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use relay_shared::errors::UpstreamError;
use relay_shared::models::{ArchiveOptions, RenderRequest};

use crate::auth::Credentials;

/// One page of the archive listing.
#[derive(Debug, Deserialize)]
pub struct ArchiveList {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub items: Vec<Value>,
}

pub struct PlatformClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl PlatformClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn project_url(&self, path: &str) -> String {
        format!(
            "{}/v2/project/{}{}",
            self.base_url,
            self.credentials.api_key(),
            path
        )
    }

    /// Authenticate, send, and decode a JSON response. Empty bodies decode to `null`.
    async fn send(&self, request: RequestBuilder) -> Result<Value, UpstreamError> {
        let token = self.credentials.project_jwt()?;
        let resp = request
            .header("X-OPENTOK-AUTH", token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            debug!("Platform returned {}: {}", status, body);
            return Err(UpstreamError::from_response(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    /// Create a routed session with manual archiving and return its id.
    pub async fn create_session(&self) -> Result<String, UpstreamError> {
        let request = self
            .client
            .post(format!("{}/session/create", self.base_url))
            .form(&[("archiveMode", "manual"), ("p2p.preference", "disabled")]);
        let value = self.send(request).await?;

        let session_id = value
            .as_array()
            .and_then(|sessions| sessions.first())
            .and_then(|s| s.get("session_id"))
            .and_then(|id| id.as_str())
            .ok_or_else(|| UpstreamError::Decode("session_id missing from response".to_string()))?;

        info!("Created session {}", session_id);
        Ok(session_id.to_string())
    }

    pub async fn list_archives(
        &self,
        offset: u32,
        count: u32,
        session_id: Option<&str>,
    ) -> Result<ArchiveList, UpstreamError> {
        let mut query = vec![
            ("offset", offset.to_string()),
            ("count", count.to_string()),
        ];
        if let Some(id) = session_id.filter(|id| !id.is_empty()) {
            query.push(("sessionId", id.to_string()));
        }

        let request = self.client.get(self.project_url("/archive")).query(&query);
        let value = self.send(request).await?;
        serde_json::from_value(value).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    pub async fn start_archive(&self, options: &ArchiveOptions) -> Result<Value, UpstreamError> {
        let request = self.client.post(self.project_url("/archive")).json(options);
        let archive = self.send(request).await?;
        info!(
            "Started {:?} archive {} for session {}",
            options.output_mode,
            id_of(&archive).unwrap_or("?"),
            options.session_id
        );
        Ok(archive)
    }

    pub async fn stop_archive(&self, archive_id: &str) -> Result<Value, UpstreamError> {
        let request = self
            .client
            .post(self.project_url(&format!("/archive/{}/stop", archive_id)));
        let archive = self.send(request).await?;
        info!("Stopped archive {}", archive_id);
        Ok(archive)
    }

    pub async fn start_render(&self, render: &RenderRequest) -> Result<Value, UpstreamError> {
        let request = self.client.post(self.project_url("/render")).json(render);
        let started = self.send(request).await?;
        info!(
            "Started render {} for session {}",
            id_of(&started).unwrap_or("?"),
            render.session_id
        );
        Ok(started)
    }

    pub async fn stop_render(&self, render_id: &str) -> Result<Value, UpstreamError> {
        let request = self
            .client
            .delete(self.project_url(&format!("/render/{}", render_id)));
        let stopped = self.send(request).await?;
        info!("Stopped render {}", render_id);
        Ok(stopped)
    }
}

/// The `id` field of a platform resource, if present.
pub fn id_of(resource: &Value) -> Option<&str> {
    resource.get("id").and_then(|id| id.as_str())
}
