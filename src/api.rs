//! The backend seam. `HttpApi` talks to the real service; tests use an in-memory fake.

use crate::contacts::Contact;
use crate::error::ApiError;
use crate::forms::{Credentials, SignupRequest};
use crate::profile::{Profile, ProfileUpdate};
use crate::task::{NewTask, OwnerId, Stage, Task, TaskId};
use async_trait::async_trait;
use serde::Deserialize;

/// Body returned by a successful login.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "OwnerID", alias = "owner_id", alias = "id")]
    pub owner_id: OwnerId,
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "accessToken", alias = "access_token")]
    pub token: Option<String>,
}

#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Token sent as a bearer credential on later calls.
    fn set_token(&self, token: Option<String>);

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;
    async fn signup(&self, request: &SignupRequest) -> Result<(), ApiError>;

    async fn list_contacts(&self, owner: OwnerId) -> Result<Vec<Contact>, ApiError>;
    async fn suggested_contacts(&self, owner: OwnerId) -> Result<Vec<Contact>, ApiError>;

    async fn list_tasks(&self, owner: OwnerId) -> Result<Vec<Task>, ApiError>;
    async fn count_tasks(&self, owner: OwnerId, stage: Stage) -> Result<u64, ApiError>;
    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError>;
    async fn update_task_status(&self, id: &TaskId, stage: Stage) -> Result<(), ApiError>;
    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError>;

    async fn get_profile(&self, owner: OwnerId) -> Result<Profile, ApiError>;
    async fn update_profile(&self, owner: OwnerId, update: &ProfileUpdate) -> Result<Profile, ApiError>;
    async fn add_tag(&self, owner: OwnerId, tag: &str) -> Result<(), ApiError>;
    async fn remove_tag(&self, owner: OwnerId, tag: &str) -> Result<(), ApiError>;
}
