//! Actor loop that owns every resource cache and applies all state changes.
//!
//! The actor runs as a single tokio task and processes one message at a
//! time, so the caches need no locks. Remote calls are issued from the actor
//! (the client future is created there) and awaited on detached tasks that
//! report back through an internal settlement channel. Completion order
//! between those tasks is not guaranteed; the fetch guard keeps at most one
//! fetch per resource outstanding, so whichever settles is the only writer.
//!
//! Public API lives in [`Orchestrator`](crate::Orchestrator); this module is
//! internal to the crate.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::client::ResourceClient;
use crate::coordinator::{ResourceCaches, resources_needed};
use crate::error::{FetchError, RemoteError, ValidationError, WriteError};
use crate::mutation;
use crate::record::Record;
use crate::resource::{Phase, ResourceKind};
use crate::snapshot::DashboardSnapshot;
use crate::stats::{AggregateStats, compute_stats};
use crate::view::ViewKind;

/// Reply channel for a create or update request.
pub(crate) type RecordReply = oneshot::Sender<Result<Record, WriteError>>;

/// Reply channel for a delete request.
pub(crate) type DeleteReply = oneshot::Sender<Result<(), WriteError>>;

/// Messages sent from [`Orchestrator`](crate::Orchestrator) to the actor.
pub(crate) enum OrchestratorMessage {
    /// Activate a view, fetching whatever it needs.
    ActivateView {
        view: ViewKind,
        /// Kinds for which a fetch was issued.
        reply: oneshot::Sender<BTreeSet<ResourceKind>>,
    },

    /// Refetch one resource unless it is already loading.
    ForceRefresh {
        kind: ResourceKind,
        /// Whether a fetch was issued.
        reply: oneshot::Sender<bool>,
    },

    /// Send already-validated fields to the remote create call.
    Create {
        kind: ResourceKind,
        fields: Record,
        reply: RecordReply,
    },

    /// Send already-validated fields to the remote update of record `id`.
    Update {
        kind: ResourceKind,
        id: Value,
        fields: Record,
        reply: RecordReply,
    },

    /// Delete record `id` remotely.
    Delete {
        kind: ResourceKind,
        id: Value,
        reply: DeleteReply,
    },

    /// Stop the actor loop.
    Shutdown,
}

/// Results reported by detached remote-call tasks.
pub(crate) enum Settlement {
    Fetch {
        kind: ResourceKind,
        result: Result<Vec<Record>, FetchError>,
    },
    Create {
        kind: ResourceKind,
        request_id: Uuid,
        result: Result<Record, RemoteError>,
        reply: RecordReply,
    },
    Update {
        kind: ResourceKind,
        request_id: Uuid,
        id: Value,
        result: Result<Record, RemoteError>,
        reply: RecordReply,
    },
    Delete {
        kind: ResourceKind,
        request_id: Uuid,
        id: Value,
        result: Result<(), RemoteError>,
        reply: DeleteReply,
    },
}

/// State owned by the actor.
pub(crate) struct Dashboard {
    caches: ResourceCaches,
    stats: AggregateStats,
    active_view: ViewKind,
    revision: u64,
    client: Arc<dyn ResourceClient>,
    settle_tx: mpsc::UnboundedSender<Settlement>,
    publisher: watch::Sender<DashboardSnapshot>,
}

impl Dashboard {
    /// Create the actor state with every cache idle.
    pub(crate) fn new(
        client: Arc<dyn ResourceClient>,
        settle_tx: mpsc::UnboundedSender<Settlement>,
        publisher: watch::Sender<DashboardSnapshot>,
    ) -> Self {
        Self {
            caches: ResourceCaches::new(),
            stats: AggregateStats::default(),
            active_view: ViewKind::default(),
            revision: 0,
            client,
            settle_tx,
            publisher,
        }
    }

    /// Record `view` as active and issue a fetch for every stale resource
    /// it depends on.
    ///
    /// The needed set is computed once, before any fetch is issued.
    pub(crate) fn activate_view(&mut self, view: ViewKind) -> BTreeSet<ResourceKind> {
        let _span = tracing::info_span!("activate_view", view = %view).entered();

        self.active_view = view;
        let mut issued = BTreeSet::new();
        for kind in resources_needed(view, &self.caches) {
            if self.issue_fetch(kind) {
                issued.insert(kind);
            }
        }

        tracing::debug!(fetches = issued.len(), "view activated");
        self.publish();
        issued
    }

    /// Issue a fetch for `kind` unless one is already outstanding.
    pub(crate) fn force_refresh(&mut self, kind: ResourceKind) -> bool {
        if self.caches.get(kind).phase() == Phase::Loading {
            tracing::debug!(resource = %kind, "refresh skipped, fetch already outstanding");
            return false;
        }
        let issued = self.issue_fetch(kind);
        if issued {
            self.publish();
        }
        issued
    }

    /// Issue the remote create; the result arrives as a [`Settlement`].
    pub(crate) fn create(&mut self, kind: ResourceKind, fields: Record, reply: RecordReply) {
        let request_id = Uuid::new_v4();
        tracing::info!(resource = %kind, %request_id, "create issued");

        let create = self.client.create(kind, fields);
        self.settle_later(create, move |result| Settlement::Create {
            kind,
            request_id,
            result,
            reply,
        });
    }

    /// Issue the remote update of a cached record.
    ///
    /// An id that is not cached is rejected without a remote call.
    pub(crate) fn update(
        &mut self,
        kind: ResourceKind,
        id: Value,
        fields: Record,
        reply: RecordReply,
    ) {
        if let Err(e) = self.expect_cached(kind, &id) {
            let _ = reply.send(Err(e.into()));
            return;
        }
        let request_id = Uuid::new_v4();
        tracing::info!(resource = %kind, %request_id, %id, "update issued");

        let update = self.client.update(kind, id.clone(), fields);
        self.settle_later(update, move |result| Settlement::Update {
            kind,
            request_id,
            id,
            result,
            reply,
        });
    }

    /// Issue the remote delete of a cached record.
    ///
    /// An id that is not cached is rejected without a remote call.
    pub(crate) fn delete(&mut self, kind: ResourceKind, id: Value, reply: DeleteReply) {
        if let Err(e) = self.expect_cached(kind, &id) {
            let _ = reply.send(Err(e.into()));
            return;
        }
        let request_id = Uuid::new_v4();
        tracing::info!(resource = %kind, %request_id, %id, "delete issued");

        let delete = self.client.delete(kind, id.clone());
        self.settle_later(delete, move |result| Settlement::Delete {
            kind,
            request_id,
            id,
            result,
            reply,
        });
    }

    /// Apply the result of a remote call.
    pub(crate) fn settle(&mut self, settlement: Settlement) {
        match settlement {
            Settlement::Fetch { kind, result } => self.settle_fetch(kind, result),
            Settlement::Create {
                kind,
                request_id,
                result,
                reply,
            } => {
                let _span =
                    tracing::info_span!("create", resource = %kind, %request_id).entered();
                let outcome = self.settle_create(kind, result);
                let _ = reply.send(outcome);
            }
            Settlement::Update {
                kind,
                request_id,
                id,
                result,
                reply,
            } => {
                let _span =
                    tracing::info_span!("update", resource = %kind, %request_id, %id).entered();
                let outcome = self.settle_update(kind, &id, result);
                let _ = reply.send(outcome);
            }
            Settlement::Delete {
                kind,
                request_id,
                id,
                result,
                reply,
            } => {
                let _span =
                    tracing::info_span!("delete", resource = %kind, %request_id, %id).entered();
                let outcome = self.settle_delete(kind, &id, result);
                let _ = reply.send(outcome);
            }
        }
    }

    fn issue_fetch(&mut self, kind: ResourceKind) -> bool {
        if let Err(e) = self.caches.get_mut(kind).begin_load() {
            tracing::error!(resource = %kind, error = %e, "fetch guard violated");
            return false;
        }

        let fetch = self.client.fetch(kind);
        self.settle_later(fetch, move |result| Settlement::Fetch { kind, result });

        tracing::debug!(resource = %kind, "fetch issued");
        true
    }

    /// Await `call` on a detached task and send its settlement back.
    fn settle_later<F, S>(&self, call: F, settlement: S)
    where
        F: Future + Send + 'static,
        F::Output: Send,
        S: FnOnce(F::Output) -> Settlement + Send + 'static,
    {
        let settle_tx = self.settle_tx.clone();
        tokio::spawn(async move {
            let result = call.await;
            // A closed channel means the actor has stopped; any reply sender
            // is dropped with the settlement and the caller sees `ActorGone`.
            let _ = settle_tx.send(settlement(result));
        });
    }

    fn expect_cached(&self, kind: ResourceKind, id: &Value) -> Result<(), ValidationError> {
        if mutation::contains_record(&self.caches, kind, id) {
            Ok(())
        } else {
            tracing::debug!(resource = %kind, %id, "write rejected, record not cached");
            Err(mutation::unknown_record(id))
        }
    }

    fn settle_fetch(&mut self, kind: ResourceKind, result: Result<Vec<Record>, FetchError>) {
        let cache = self.caches.get_mut(kind);
        let transition = match result {
            Ok(data) => {
                tracing::debug!(resource = %kind, count = data.len(), "fetch completed");
                cache.complete_load(data)
            }
            Err(error) => {
                tracing::warn!(resource = %kind, error = %error, "fetch failed");
                cache.fail_load(error)
            }
        };

        if let Err(e) = transition {
            tracing::error!(resource = %kind, error = %e, "settlement without outstanding fetch");
            return;
        }

        self.stats = compute_stats(&self.caches);
        self.publish();
    }

    fn settle_create(
        &mut self,
        kind: ResourceKind,
        result: Result<Record, RemoteError>,
    ) -> Result<Record, WriteError> {
        let record = result.inspect_err(|e| tracing::warn!(error = %e, "remote create failed"))?;
        let stats = mutation::apply_created(&mut self.caches, kind, record.clone())
            .inspect_err(|e| tracing::warn!(error = %e, "created record rejected"))?;
        self.commit(stats);
        tracing::info!("record created");
        Ok(record)
    }

    fn settle_update(
        &mut self,
        kind: ResourceKind,
        id: &Value,
        result: Result<Record, RemoteError>,
    ) -> Result<Record, WriteError> {
        let record = result.inspect_err(|e| tracing::warn!(error = %e, "remote update failed"))?;
        let stats = mutation::apply_updated(&mut self.caches, kind, id, record.clone())
            .inspect_err(|e| tracing::warn!(error = %e, "updated record rejected"))?;
        self.commit(stats);
        tracing::info!("record updated");
        Ok(record)
    }

    fn settle_delete(
        &mut self,
        kind: ResourceKind,
        id: &Value,
        result: Result<(), RemoteError>,
    ) -> Result<(), WriteError> {
        result.inspect_err(|e| tracing::warn!(error = %e, "remote delete failed"))?;
        match mutation::apply_deleted(&mut self.caches, kind, id) {
            Ok(stats) => {
                self.commit(stats);
                tracing::info!("record deleted");
            }
            // A refetch that settled meanwhile already dropped the record.
            Err(e) => tracing::debug!(error = %e, "deleted record no longer cached"),
        }
        Ok(())
    }

    fn commit(&mut self, stats: AggregateStats) {
        self.stats = stats;
        self.publish();
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot =
            DashboardSnapshot::capture(self.revision, self.active_view, &self.caches, &self.stats);
        self.publisher.send_replace(snapshot);
    }
}

/// Runs the actor loop until [`OrchestratorMessage::Shutdown`] arrives or
/// every [`Orchestrator`](crate::Orchestrator) handle is dropped.
///
/// Settlements from outstanding remote calls are interleaved with requests
/// in arrival order. Once the loop exits, the snapshot publisher is dropped
/// and late settlements are discarded.
pub(crate) async fn run_orchestrator(
    mut dashboard: Dashboard,
    mut rx: mpsc::Receiver<OrchestratorMessage>,
    mut settle_rx: mpsc::UnboundedReceiver<Settlement>,
) {
    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(OrchestratorMessage::ActivateView { view, reply }) => {
                    let issued = dashboard.activate_view(view);
                    let _ = reply.send(issued);
                }
                Some(OrchestratorMessage::ForceRefresh { kind, reply }) => {
                    let issued = dashboard.force_refresh(kind);
                    let _ = reply.send(issued);
                }
                Some(OrchestratorMessage::Create { kind, fields, reply }) => {
                    dashboard.create(kind, fields, reply);
                }
                Some(OrchestratorMessage::Update { kind, id, fields, reply }) => {
                    dashboard.update(kind, id, fields, reply);
                }
                Some(OrchestratorMessage::Delete { kind, id, reply }) => {
                    dashboard.delete(kind, id, reply);
                }
                Some(OrchestratorMessage::Shutdown) | None => break,
            },
            Some(settlement) = settle_rx.recv() => dashboard.settle(settlement),
        }
    }
    tracing::info!("dashboard orchestrator stopped");
}
