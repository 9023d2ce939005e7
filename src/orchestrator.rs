//! Top-level entry point: the [`Orchestrator`] handle, its builder, and
//! configuration.
//!
//! The orchestrator is spawned via [`OrchestratorBuilder`], which starts the
//! actor task that owns all resource caches. Every method on the handle
//! sends a message to that task; reads go through published
//! [`DashboardSnapshot`]s.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::WatchStream;

use crate::actor::{Dashboard, OrchestratorMessage, run_orchestrator};
use crate::client::ResourceClient;
use crate::command::{ContactDefaults, NewContact, NewDeal, NewTask, TaskDefaults};
use crate::error::{OrchestratorError, WriteError};
use crate::record::Record;
use crate::resource::ResourceKind;
use crate::snapshot::DashboardSnapshot;
use crate::view::ViewKind;

/// Default capacity of the request mailbox.
const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Configuration for an [`Orchestrator`].
///
/// # Examples
///
/// ```
/// use dashboard_sync::OrchestratorConfig;
///
/// let config = OrchestratorConfig {
///     mailbox_capacity: 8,
///     ..OrchestratorConfig::default()
/// };
/// assert_eq!(config.contact_defaults.contact_type, "lead");
/// assert_eq!(config.task_defaults.status, "pending");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Number of requests that may queue before senders wait.
    ///
    /// Default: 32.
    pub mailbox_capacity: usize,

    /// Values filled into new contacts that leave them unset.
    pub contact_defaults: ContactDefaults,

    /// Values filled into new tasks that leave them unset.
    pub task_defaults: TaskDefaults,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            contact_defaults: ContactDefaults::default(),
            task_defaults: TaskDefaults::default(),
        }
    }
}

/// Handle to the dashboard data orchestrator.
///
/// Owns nothing but channels: the caches live on the actor task. `Clone` is
/// cheap, and the actor stops once every clone is dropped or
/// [`shutdown`](Orchestrator::shutdown) is called.
#[derive(Clone)]
pub struct Orchestrator {
    sender: mpsc::Sender<OrchestratorMessage>,
    snapshots: watch::Receiver<DashboardSnapshot>,
    config: Arc<OrchestratorConfig>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("alive", &self.is_alive())
            .field("revision", &self.snapshots.borrow().revision)
            .finish()
    }
}

impl Orchestrator {
    /// Start configuring an orchestrator backed by `client`.
    pub fn builder(client: impl ResourceClient) -> OrchestratorBuilder {
        OrchestratorBuilder::new(client)
    }

    /// Activate `view`, fetching every resource it needs that is idle,
    /// failed, or ready but empty.
    ///
    /// Returns as soon as the fetches are issued; each one settles on its
    /// own and publishes a new snapshot.
    ///
    /// # Returns
    ///
    /// The kinds for which a fetch was issued (empty when nothing was stale).
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::ActorGone`] if the actor has stopped.
    pub async fn activate_view(
        &self,
        view: ViewKind,
    ) -> Result<BTreeSet<ResourceKind>, OrchestratorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::ActivateView { view, reply: tx })
            .await
            .map_err(|_| OrchestratorError::ActorGone)?;
        rx.await.map_err(|_| OrchestratorError::ActorGone)
    }

    /// Refetch `kind` regardless of the staleness policy, unless a fetch
    /// for it is already outstanding.
    ///
    /// Meant for a manual retry after a failed fetch.
    ///
    /// # Returns
    ///
    /// `true` if a fetch was issued.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::ActorGone`] if the actor has stopped.
    pub async fn force_refresh(&self, kind: ResourceKind) -> Result<bool, OrchestratorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::ForceRefresh { kind, reply: tx })
            .await
            .map_err(|_| OrchestratorError::ActorGone)?;
        rx.await.map_err(|_| OrchestratorError::ActorGone)
    }

    /// Validate `input`, create the contact remotely, and append the
    /// returned record to the contacts cache without refetching.
    ///
    /// # Returns
    ///
    /// The canonical record returned by the server.
    ///
    /// # Errors
    ///
    /// * [`WriteError::Validation`] - the input or the returned record is
    ///   invalid; nothing was changed.
    /// * [`WriteError::Remote`] - the remote create failed; nothing was
    ///   changed.
    /// * [`WriteError::ActorGone`] - the actor has stopped.
    pub async fn create_contact(&self, input: NewContact) -> Result<Record, WriteError> {
        input.validate()?;
        let fields = input.to_fields(&self.config.contact_defaults);
        self.create(ResourceKind::Contacts, fields).await
    }

    /// Validate `input`, create the deal remotely, and append it to the
    /// deals cache.
    ///
    /// # Errors
    ///
    /// Same as [`create_contact`](Self::create_contact).
    pub async fn create_deal(&self, input: NewDeal) -> Result<Record, WriteError> {
        input.validate()?;
        self.create(ResourceKind::Deals, input.to_fields()).await
    }

    /// Validate `input`, create the task remotely, and append it to the
    /// tasks cache.
    ///
    /// # Errors
    ///
    /// Same as [`create_contact`](Self::create_contact).
    pub async fn create_task(&self, input: NewTask) -> Result<Record, WriteError> {
        input.validate()?;
        let fields = input.to_fields(&self.config.task_defaults);
        self.create(ResourceKind::Tasks, fields).await
    }

    async fn create(&self, kind: ResourceKind, fields: Record) -> Result<Record, WriteError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::Create {
                kind,
                fields,
                reply: tx,
            })
            .await
            .map_err(|_| WriteError::ActorGone)?;
        rx.await.map_err(|_| WriteError::ActorGone)?
    }

    /// Validate `input`, update contact `id` remotely, and replace the cached
    /// record in place with the one the server returns.
    ///
    /// Fields left unset in `input` are not sent.
    ///
    /// # Errors
    ///
    /// * [`WriteError::Validation`] - the input or the returned record is
    ///   invalid, or no cached contact has `id` (no remote call is made);
    ///   nothing was changed.
    /// * [`WriteError::Remote`] - the remote update failed; nothing was
    ///   changed.
    /// * [`WriteError::ActorGone`] - the actor has stopped.
    pub async fn update_contact(
        &self,
        id: impl Into<Value>,
        input: NewContact,
    ) -> Result<Record, WriteError> {
        input.validate()?;
        self.update(ResourceKind::Contacts, id.into(), input.to_update_fields())
            .await
    }

    /// Validate `input` and update deal `id`.
    ///
    /// # Errors
    ///
    /// Same as [`update_contact`](Self::update_contact).
    pub async fn update_deal(
        &self,
        id: impl Into<Value>,
        input: NewDeal,
    ) -> Result<Record, WriteError> {
        input.validate()?;
        self.update(ResourceKind::Deals, id.into(), input.to_fields())
            .await
    }

    /// Validate `input` and update task `id`.
    ///
    /// # Errors
    ///
    /// Same as [`update_contact`](Self::update_contact).
    pub async fn update_task(
        &self,
        id: impl Into<Value>,
        input: NewTask,
    ) -> Result<Record, WriteError> {
        input.validate()?;
        self.update(ResourceKind::Tasks, id.into(), input.to_update_fields())
            .await
    }

    /// Delete contact `id` remotely and drop it from the cache.
    ///
    /// # Errors
    ///
    /// * [`WriteError::Validation`] - no cached contact has `id`; no remote
    ///   call is made.
    /// * [`WriteError::Remote`] - the remote delete failed; the contact
    ///   stays cached.
    /// * [`WriteError::ActorGone`] - the actor has stopped.
    pub async fn delete_contact(&self, id: impl Into<Value>) -> Result<(), WriteError> {
        self.delete(ResourceKind::Contacts, id.into()).await
    }

    /// Delete deal `id`.
    ///
    /// # Errors
    ///
    /// Same as [`delete_contact`](Self::delete_contact).
    pub async fn delete_deal(&self, id: impl Into<Value>) -> Result<(), WriteError> {
        self.delete(ResourceKind::Deals, id.into()).await
    }

    /// Delete task `id`.
    ///
    /// # Errors
    ///
    /// Same as [`delete_contact`](Self::delete_contact).
    pub async fn delete_task(&self, id: impl Into<Value>) -> Result<(), WriteError> {
        self.delete(ResourceKind::Tasks, id.into()).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: Value,
        fields: Record,
    ) -> Result<Record, WriteError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::Update {
                kind,
                id,
                fields,
                reply: tx,
            })
            .await
            .map_err(|_| WriteError::ActorGone)?;
        rx.await.map_err(|_| WriteError::ActorGone)?
    }

    async fn delete(&self, kind: ResourceKind, id: Value) -> Result<(), WriteError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::Delete { kind, id, reply: tx })
            .await
            .map_err(|_| WriteError::ActorGone)?;
        rx.await.map_err(|_| WriteError::ActorGone)?
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A fresh receiver for snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    /// Snapshots as a stream, starting with the current one.
    pub fn snapshots(&self) -> WatchStream<DashboardSnapshot> {
        WatchStream::new(self.snapshots.clone())
    }

    /// Wait until a published snapshot satisfies `predicate`.
    ///
    /// The current snapshot is checked first.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::ActorGone`] if the actor stops before the
    /// predicate holds.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&DashboardSnapshot) -> bool,
    ) -> Result<DashboardSnapshot, OrchestratorError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| OrchestratorError::ActorGone)?;
        Ok(snapshot.clone())
    }

    /// Wait until no resource has a fetch outstanding.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::ActorGone`] if the actor stops first.
    pub async fn settled(&self) -> Result<DashboardSnapshot, OrchestratorError> {
        self.wait_for(DashboardSnapshot::is_settled).await
    }

    /// Returns `false` once the actor has stopped.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Stop the actor. Outstanding fetches still complete on the transport
    /// but their results are discarded.
    ///
    /// Calling `shutdown` more than once is safe.
    pub async fn shutdown(&self) {
        // A send error means the actor has already stopped.
        let _ = self.sender.send(OrchestratorMessage::Shutdown).await;
    }
}

/// Builder for configuring and spawning an [`Orchestrator`].
///
/// # Examples
///
/// ```no_run
/// use dashboard_sync::{Orchestrator, ResourceClient, ViewKind};
///
/// # async fn example(client: impl ResourceClient) {
/// let dashboard = Orchestrator::builder(client)
///     .mailbox_capacity(64)
///     .initial_view(ViewKind::Dashboard)
///     .spawn();
/// let snapshot = dashboard.settled().await.expect("orchestrator running");
/// println!("{} contacts", snapshot.stats.total_contacts);
/// # }
/// ```
pub struct OrchestratorBuilder {
    client: Arc<dyn ResourceClient>,
    config: OrchestratorConfig,
    initial_view: Option<ViewKind>,
}

impl OrchestratorBuilder {
    /// Create a builder with the default configuration.
    pub fn new(client: impl ResourceClient) -> Self {
        Self {
            client: Arc::new(client),
            config: OrchestratorConfig::default(),
            initial_view: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the request mailbox capacity (minimum 1).
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.mailbox_capacity = capacity;
        self
    }

    /// Activate `view` as soon as the orchestrator starts.
    pub fn initial_view(mut self, view: ViewKind) -> Self {
        self.initial_view = Some(view);
        self
    }

    /// Spawn the actor task and return its handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(self) -> Orchestrator {
        let (sender, rx) = mpsc::channel(self.config.mailbox_capacity.max(1));
        let (settle_tx, settle_rx) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(DashboardSnapshot::default());

        let mut dashboard = Dashboard::new(self.client, settle_tx, publisher);
        if let Some(view) = self.initial_view {
            dashboard.activate_view(view);
        }

        tracing::info!(
            mailbox_capacity = self.config.mailbox_capacity,
            initial_view = ?self.initial_view,
            "dashboard orchestrator started"
        );
        tokio::spawn(run_orchestrator(dashboard, rx, settle_rx));

        Orchestrator {
            sender,
            snapshots,
            config: Arc::new(self.config),
        }
    }
}
