//! Async data orchestration for a CRM dashboard: per-resource caches,
//! view-driven fetching, derived stats, and local application of writes.

mod actor;
mod client;
mod command;
mod coordinator;
mod error;
mod mutation;
mod orchestrator;
mod record;
mod resource;
mod snapshot;
mod stats;
mod view;

pub use client::{CreateFuture, DeleteFuture, FetchFuture, ResourceClient, UpdateFuture};
pub use command::{ContactDefaults, NewContact, NewDeal, NewTask, TaskDefaults};
pub use coordinator::{ResourceCaches, needs_fetch, resources_needed};
pub use error::{
    CacheError, FetchError, OrchestratorError, RemoteError, ValidationError, WriteError,
};
pub use mutation::{
    apply_contact_created, apply_created, apply_deleted, apply_updated, contains_record,
    validate_created,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorConfig};
pub use record::{ID_FIELD, Record};
pub use resource::{Phase, ResourceCache, ResourceKind};
pub use snapshot::{DashboardSnapshot, ResourceSnapshot};
pub use stats::{AggregateStats, ContactTypeStats, PENDING_STATUS, compute_stats};
pub use view::ViewKind;
