//! Interface to the external transport that talks to the remote resource API.
//!
//! The orchestrator never imports transport internals. It issues calls
//! through [`ResourceClient`] and awaits the returned futures on detached
//! tasks, so every future must be `'static`: implementors clone whatever
//! shared state they need into the future.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{FetchError, RemoteError};
use crate::record::Record;
use crate::resource::ResourceKind;

/// Future returned by [`ResourceClient::fetch`].
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Vec<Record>, FetchError>> + Send>>;

/// Future returned by [`ResourceClient::create`].
pub type CreateFuture = Pin<Box<dyn Future<Output = Result<Record, RemoteError>> + Send>>;

/// Future returned by [`ResourceClient::update`].
pub type UpdateFuture = Pin<Box<dyn Future<Output = Result<Record, RemoteError>> + Send>>;

/// Future returned by [`ResourceClient::delete`].
pub type DeleteFuture = Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send>>;

/// The remote fetch and write collaborator.
///
/// # Contract
///
/// - [`fetch`](ResourceClient::fetch) resolves with the full current
///   collection (no pagination or filtering) or rejects with an error.
/// - [`create`](ResourceClient::create) resolves with the canonical created
///   record, including its server-assigned `id`.
/// - [`update`](ResourceClient::update) resolves with the canonical record
///   after the change; [`delete`](ResourceClient::delete) resolves once the
///   record is gone.
/// - Calling either method issues the request; awaiting only collects the
///   result. The orchestrator calls them on its own task and awaits elsewhere.
pub trait ResourceClient: Send + Sync + 'static {
    /// Fetch the whole collection for `kind`.
    fn fetch(&self, kind: ResourceKind) -> FetchFuture;

    /// Create a record of `kind` from `fields`.
    fn create(&self, kind: ResourceKind, fields: Record) -> CreateFuture;

    /// Overwrite the updatable fields of record `id`.
    fn update(&self, kind: ResourceKind, id: Value, fields: Record) -> UpdateFuture;

    /// Delete record `id`.
    fn delete(&self, kind: ResourceKind, id: Value) -> DeleteFuture;
}

impl<C: ResourceClient + ?Sized> ResourceClient for Arc<C> {
    fn fetch(&self, kind: ResourceKind) -> FetchFuture {
        (**self).fetch(kind)
    }

    fn create(&self, kind: ResourceKind, fields: Record) -> CreateFuture {
        (**self).create(kind, fields)
    }

    fn update(&self, kind: ResourceKind, id: Value, fields: Record) -> UpdateFuture {
        (**self).update(kind, id, fields)
    }

    fn delete(&self, kind: ResourceKind, id: Value) -> DeleteFuture {
        (**self).delete(kind, id)
    }
}

/// Scriptable client used by the crate's unit tests.
#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use super::*;

    type FetchReply = oneshot::Sender<Result<Vec<Record>, FetchError>>;

    /// A client whose fetches stay outstanding until the test resolves them.
    ///
    /// Writes resolve immediately with the next scripted response.
    #[derive(Default)]
    pub(crate) struct GatedClient {
        pending: Mutex<HashMap<ResourceKind, VecDeque<FetchReply>>>,
        fetch_log: Mutex<Vec<ResourceKind>>,
        create_log: Mutex<Vec<(ResourceKind, Record)>>,
        create_responses: Mutex<VecDeque<Result<Record, RemoteError>>>,
        update_log: Mutex<Vec<(ResourceKind, Value, Record)>>,
        update_responses: Mutex<VecDeque<Result<Record, RemoteError>>>,
        delete_log: Mutex<Vec<(ResourceKind, Value)>>,
        delete_responses: Mutex<VecDeque<Result<(), RemoteError>>>,
    }

    impl GatedClient {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Every fetch issued so far, in issue order.
        pub(crate) fn fetches(&self) -> Vec<ResourceKind> {
            self.fetch_log.lock().expect("fetch log").clone()
        }

        pub(crate) fn fetch_count(&self, kind: ResourceKind) -> usize {
            self.fetches().into_iter().filter(|k| *k == kind).count()
        }

        /// Fetches issued but not yet resolved for `kind`.
        pub(crate) fn outstanding(&self, kind: ResourceKind) -> usize {
            self.pending
                .lock()
                .expect("pending")
                .get(&kind)
                .map_or(0, VecDeque::len)
        }

        /// Resolve the oldest outstanding fetch for `kind`.
        pub(crate) fn resolve(&self, kind: ResourceKind, result: Result<Vec<Record>, FetchError>) {
            let reply = self
                .pending
                .lock()
                .expect("pending")
                .get_mut(&kind)
                .and_then(VecDeque::pop_front)
                .expect("no outstanding fetch to resolve");
            reply.send(result).expect("fetch task dropped");
        }

        pub(crate) fn push_create(&self, result: Result<Record, RemoteError>) {
            self.create_responses
                .lock()
                .expect("create responses")
                .push_back(result);
        }

        pub(crate) fn creates(&self) -> Vec<(ResourceKind, Record)> {
            self.create_log.lock().expect("create log").clone()
        }

        pub(crate) fn push_update(&self, result: Result<Record, RemoteError>) {
            self.update_responses
                .lock()
                .expect("update responses")
                .push_back(result);
        }

        pub(crate) fn updates(&self) -> Vec<(ResourceKind, Value, Record)> {
            self.update_log.lock().expect("update log").clone()
        }

        pub(crate) fn push_delete(&self, result: Result<(), RemoteError>) {
            self.delete_responses
                .lock()
                .expect("delete responses")
                .push_back(result);
        }

        pub(crate) fn deletes(&self) -> Vec<(ResourceKind, Value)> {
            self.delete_log.lock().expect("delete log").clone()
        }
    }

    impl ResourceClient for GatedClient {
        fn fetch(&self, kind: ResourceKind) -> FetchFuture {
            let (tx, rx) = oneshot::channel();
            self.fetch_log.lock().expect("fetch log").push(kind);
            self.pending
                .lock()
                .expect("pending")
                .entry(kind)
                .or_default()
                .push_back(tx);
            Box::pin(async move {
                rx.await
                    .unwrap_or_else(|_| Err(FetchError::new("fetch abandoned")))
            })
        }

        fn create(&self, kind: ResourceKind, fields: Record) -> CreateFuture {
            self.create_log
                .lock()
                .expect("create log")
                .push((kind, fields));
            let result = self
                .create_responses
                .lock()
                .expect("create responses")
                .pop_front()
                .unwrap_or_else(|| Err(RemoteError::new("no scripted response")));
            Box::pin(async move { result })
        }

        fn update(&self, kind: ResourceKind, id: Value, fields: Record) -> UpdateFuture {
            self.update_log
                .lock()
                .expect("update log")
                .push((kind, id, fields));
            let result = self
                .update_responses
                .lock()
                .expect("update responses")
                .pop_front()
                .unwrap_or_else(|| Err(RemoteError::new("no scripted response")));
            Box::pin(async move { result })
        }

        fn delete(&self, kind: ResourceKind, id: Value) -> DeleteFuture {
            self.delete_log.lock().expect("delete log").push((kind, id));
            let result = self
                .delete_responses
                .lock()
                .expect("delete responses")
                .pop_front()
                .unwrap_or_else(|| Err(RemoteError::new("no scripted response")));
            Box::pin(async move { result })
        }
    }
}
