//! Runs backend calls off the UI thread and reports each result as an `ApiEvent`.
//!
//! Every call is an independent tokio task; nothing here orders or merges them.
//! The UI loop drains the receiving end between frames. Each result is stamped
//! with the session it was requested under so results from before a logout can
//! be told apart.

use crate::api::{CrmApi, LoginResponse};
use crate::contacts::Contact;
use crate::dashboard::StageSummary;
use crate::error::ApiError;
use crate::forms::{Credentials, SignupRequest};
use crate::kanban_board::PlannedMove;
use crate::profile::{Profile, ProfileUpdate};
use crate::task::{NewTask, OwnerId, Stage, Task, TaskId};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug)]
pub enum ApiEvent {
    LoggedIn(Result<LoginResponse, ApiError>),
    SignedUp(Result<(), ApiError>),
    TasksLoaded(Result<Vec<Task>, ApiError>),
    TaskCreated(Result<Task, ApiError>),
    StatusUpdated {
        planned: PlannedMove,
        result: Result<(), ApiError>,
    },
    TaskDeleted {
        id: TaskId,
        result: Result<(), ApiError>,
    },
    ContactsLoaded(Result<Vec<Contact>, ApiError>),
    SuggestionsLoaded(Result<Vec<Contact>, ApiError>),
    ProfileLoaded {
        request: u64,
        result: Result<Profile, ApiError>,
    },
    ProfileUpdated(Result<Profile, ApiError>),
    TagAdded {
        tag: String,
        result: Result<(), ApiError>,
    },
    TagRemoved {
        tag: String,
        result: Result<(), ApiError>,
    },
    SummaryLoaded(StageSummary),
}

#[derive(Debug)]
pub struct Envelope {
    pub session: u64,
    pub event: ApiEvent,
}

pub struct SyncClient {
    api: Arc<dyn CrmApi>,
    runtime: Handle,
    tx: UnboundedSender<Envelope>,
    session: u64,
    profile_fetch: Option<JoinHandle<()>>,
    profile_request: u64,
}

impl SyncClient {
    pub fn new(api: Arc<dyn CrmApi>, runtime: Handle) -> (Self, UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Self {
            api,
            runtime,
            tx,
            session: 0,
            profile_fetch: None,
            profile_request: 0,
        };
        (client, rx)
    }

    pub fn set_token(&self, token: Option<String>) {
        self.api.set_token(token);
    }

    /// Forgets the current session: results of calls already in flight are stale.
    pub fn end_session(&mut self) {
        self.cancel_profile_fetch();
        self.set_token(None);
        self.session += 1;
    }

    pub fn is_current(&self, envelope: &Envelope) -> bool {
        envelope.session == self.session
    }

    /// `false` once the fetch that produced `request` was cancelled or replaced.
    pub fn is_current_profile(&self, request: u64) -> bool {
        self.profile_fetch.is_some() && request == self.profile_request
    }

    fn spawn<F>(&self, call: F) -> JoinHandle<()>
    where
        F: Future<Output = ApiEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let event = call.await;
            if tx.send(Envelope { session, event }).is_err() {
                warn!("ui loop is gone, dropping api result");
            }
        })
    }

    pub fn login(&self, credentials: Credentials) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { ApiEvent::LoggedIn(api.login(&credentials).await) });
    }

    pub fn signup(&self, request: SignupRequest) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { ApiEvent::SignedUp(api.signup(&request).await) });
    }

    pub fn fetch_tasks(&self, owner: OwnerId) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { ApiEvent::TasksLoaded(api.list_tasks(owner).await) });
    }

    pub fn create_task(&self, task: NewTask) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { ApiEvent::TaskCreated(api.create_task(&task).await) });
    }

    pub fn update_status(&self, planned: PlannedMove) {
        let api = Arc::clone(&self.api);
        info!(task = %planned.task_id, from = %planned.from, to = %planned.to, "moving task");
        self.spawn(async move {
            let result = api.update_task_status(&planned.task_id, planned.to).await;
            ApiEvent::StatusUpdated { planned, result }
        });
    }

    pub fn delete_task(&self, id: TaskId) {
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.delete_task(&id).await;
            ApiEvent::TaskDeleted { id, result }
        });
    }

    pub fn fetch_contacts(&self, owner: OwnerId) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { ApiEvent::ContactsLoaded(api.list_contacts(owner).await) });
        let api = Arc::clone(&self.api);
        self.spawn(async move { ApiEvent::SuggestionsLoaded(api.suggested_contacts(owner).await) });
    }

    /// Starts a profile fetch, replacing any that is still running.
    pub fn fetch_profile(&mut self, owner: OwnerId) {
        self.cancel_profile_fetch();
        self.profile_request += 1;
        let request = self.profile_request;
        let api = Arc::clone(&self.api);
        let handle = self.spawn(async move {
            let result = api.get_profile(owner).await;
            ApiEvent::ProfileLoaded { request, result }
        });
        self.profile_fetch = Some(handle);
    }

    /// Aborts an in-flight profile fetch. A result it already queued is
    /// still delivered but no longer passes `is_current_profile`.
    pub fn cancel_profile_fetch(&mut self) {
        if let Some(handle) = self.profile_fetch.take() {
            if !handle.is_finished() {
                info!("cancelling profile fetch");
            }
            handle.abort();
        }
    }

    pub fn update_profile(&self, owner: OwnerId, update: ProfileUpdate) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { ApiEvent::ProfileUpdated(api.update_profile(owner, &update).await) });
    }

    pub fn add_tag(&self, owner: OwnerId, tag: String) {
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.add_tag(owner, &tag).await;
            ApiEvent::TagAdded { tag, result }
        });
    }

    pub fn remove_tag(&self, owner: OwnerId, tag: String) {
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.remove_tag(owner, &tag).await;
            ApiEvent::TagRemoved { tag, result }
        });
    }

    /// Counts every stage concurrently. A stage whose request fails counts as zero.
    pub fn fetch_summary(&self, owner: OwnerId) {
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let counts = join_all(Stage::ALL.iter().map(|&stage| {
                let api = Arc::clone(&api);
                async move {
                    let count = api.count_tasks(owner, stage).await.unwrap_or_else(|err| {
                        warn!(%stage, error = %err, "stage count failed, using zero");
                        0
                    });
                    (stage, count)
                }
            }))
            .await;
            ApiEvent::SummaryLoaded(StageSummary::from_counts(counts))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::kanban_board::tests::task;

    #[tokio::test]
    async fn failing_stage_counts_as_zero() {
        let fake = Arc::new(FakeApi::with_tasks(vec![
            task("a", Stage::Review),
            task("b", Stage::InContact),
            task("c", Stage::InContact),
        ]));
        fake.fail_counts_for.lock().unwrap().push(Stage::Review);
        let (client, mut rx) = SyncClient::new(fake, Handle::current());

        client.fetch_summary(OwnerId(1));
        let Some(Envelope {
            event: ApiEvent::SummaryLoaded(summary),
            ..
        }) = rx.recv().await
        else {
            panic!("expected summary");
        };
        assert_eq!(summary.slices[Stage::Review.index()].count, 0);
        assert_eq!(summary.slices[Stage::InContact.index()].count, 2);
        assert_eq!(summary.total(), 2);
    }

    #[tokio::test]
    async fn cancelled_profile_fetch_never_reports() {
        let fake = Arc::new(FakeApi::default());
        let (mut client, mut rx) = SyncClient::new(fake, Handle::current());

        client.fetch_profile(OwnerId(1));
        client.cancel_profile_fetch();
        client.fetch_tasks(OwnerId(1));

        let event = rx.recv().await.map(|e| e.event);
        assert!(matches!(event, Some(ApiEvent::TasksLoaded(Ok(_)))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn profile_result_queued_before_cancel_is_stale() {
        let fake = Arc::new(FakeApi::default());
        let (mut client, mut rx) = SyncClient::new(fake, Handle::current());

        client.fetch_profile(OwnerId(1));
        let Some(Envelope {
            event: ApiEvent::ProfileLoaded { request, .. },
            ..
        }) = rx.recv().await
        else {
            panic!("expected profile result");
        };
        assert!(client.is_current_profile(request));

        client.cancel_profile_fetch();
        assert!(!client.is_current_profile(request));
    }

    #[tokio::test]
    async fn results_from_an_ended_session_are_stale() {
        let fake = Arc::new(FakeApi::default());
        let (mut client, mut rx) = SyncClient::new(fake, Handle::current());

        client.fetch_tasks(OwnerId(1));
        client.end_session();
        client.fetch_tasks(OwnerId(2));

        let mut owners = Vec::new();
        for _ in 0..2 {
            let envelope = rx.recv().await.unwrap();
            owners.push((envelope.session, client.is_current(&envelope)));
        }
        owners.sort();
        assert_eq!(owners, vec![(0, false), (1, true)]);
    }
}
