use crate::api::{CrmApi, LoginResponse};
use crate::contacts::Contact;
use crate::dashboard::parse_count;
use crate::error::ApiError;
use crate::forms::{Credentials, SignupRequest};
use crate::profile::{Profile, ProfileUpdate, TagRequest};
use crate::task::{NewTask, OwnerId, Stage, Task, TaskId};
use async_trait::async_trait;
use anyhow::{bail, Context};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct StatusUpdate {
    status: Stage,
}

/// `CrmApi` over the backend's JSON REST endpoints.
pub struct HttpApi {
    client: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid api url {base_url:?}"))?;
        if base_url.cannot_be_a_base() {
            bail!("api url {base_url} cannot carry a path");
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Appends path segments to the base URL, escaping each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        let builder = self.client.request(method, url.clone());
        let token = self.token.read().ok().and_then(|t| t.clone());
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends and checks the status; non-2xx becomes `ApiError::Status` with the server's message.
    async fn send(&self, builder: RequestBuilder, endpoint: &str) -> Result<Response, ApiError> {
        debug!(endpoint, "sending request");
        let response = builder.send().await.map_err(|source| {
            warn!(endpoint, error = %source, "request failed");
            ApiError::Transport {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = server_message(&body);
        warn!(endpoint, status = status.as_u16(), %message, "request rejected");
        Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(builder, endpoint).await?;
        let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

/// The `message` field of an error body, if the body is JSON and has one.
fn server_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

#[async_trait]
impl CrmApi for HttpApi {
    fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = self.url(&["owners", "login"]);
        self.send_json(self.request(Method::POST, &url).json(credentials), url.path())
            .await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<(), ApiError> {
        let url = self.url(&["owners", "signup"]);
        self.send(self.request(Method::POST, &url).json(request), url.path())
            .await
            .map(|_| ())
    }

    async fn list_contacts(&self, owner: OwnerId) -> Result<Vec<Contact>, ApiError> {
        let url = self.url(&["contacts", owner.to_string().as_str()]);
        self.send_json(self.request(Method::GET, &url), url.path()).await
    }

    async fn suggested_contacts(&self, owner: OwnerId) -> Result<Vec<Contact>, ApiError> {
        let url = self.url(&["contacts", owner.to_string().as_str(), "suggestions"]);
        self.send_json(self.request(Method::GET, &url), url.path()).await
    }

    async fn list_tasks(&self, owner: OwnerId) -> Result<Vec<Task>, ApiError> {
        let url = self.url(&["kanban", owner.to_string().as_str()]);
        self.send_json(self.request(Method::GET, &url), url.path()).await
    }

    async fn count_tasks(&self, owner: OwnerId, stage: Stage) -> Result<u64, ApiError> {
        let url = self.url(&["kanban", owner.to_string().as_str(), stage.label()]);
        let body: serde_json::Value = self
            .send_json(self.request(Method::GET, &url), url.path())
            .await?;
        Ok(parse_count(&body))
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let url = self.url(&["kanban"]);
        self.send_json(self.request(Method::POST, &url).json(task), url.path())
            .await
    }

    async fn update_task_status(&self, id: &TaskId, stage: Stage) -> Result<(), ApiError> {
        let url = self.url(&["kanban", id.0.as_str()]);
        let body = StatusUpdate { status: stage };
        self.send(self.request(Method::PUT, &url).json(&body), url.path())
            .await
            .map(|_| ())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        let url = self.url(&["kanban", id.0.as_str()]);
        self.send(self.request(Method::DELETE, &url), url.path())
            .await
            .map(|_| ())
    }

    async fn get_profile(&self, owner: OwnerId) -> Result<Profile, ApiError> {
        let url = self.url(&["profile", owner.to_string().as_str()]);
        self.send_json(self.request(Method::GET, &url), url.path()).await
    }

    async fn update_profile(&self, owner: OwnerId, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        let url = self.url(&["profile", owner.to_string().as_str()]);
        self.send_json(self.request(Method::PUT, &url).json(update), url.path())
            .await
    }

    async fn add_tag(&self, owner: OwnerId, tag: &str) -> Result<(), ApiError> {
        let url = self.url(&["profile", owner.to_string().as_str(), "tags"]);
        let body = TagRequest {
            tag: tag.to_string(),
        };
        self.send(self.request(Method::POST, &url).json(&body), url.path())
            .await
            .map(|_| ())
    }

    async fn remove_tag(&self, owner: OwnerId, tag: &str) -> Result<(), ApiError> {
        let url = self.url(&["profile", owner.to_string().as_str(), "tags", tag]);
        self.send(self.request(Method::DELETE, &url), url.path())
            .await
            .map(|_| ())
    }
}
