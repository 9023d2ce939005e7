//! Read-only view of the orchestrator state published to the presentation
//! layer.
//!
//! A new [`DashboardSnapshot`] is published after every state change:
//! view activation, fetch settlement, and successful create. Snapshots are
//! plain owned values, so readers never observe a cache mid-update.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::coordinator::ResourceCaches;
use crate::error::FetchError;
use crate::record::Record;
use crate::resource::{Phase, ResourceCache, ResourceKind};
use crate::stats::AggregateStats;
use crate::view::ViewKind;

/// Published state of one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    /// Items in fetch/create order.
    pub data: Vec<Record>,
    pub phase: Phase,
    /// Present only while `phase` is [`Phase::Failed`].
    pub last_error: Option<FetchError>,
}

impl From<&ResourceCache<Record>> for ResourceSnapshot {
    fn from(cache: &ResourceCache<Record>) -> Self {
        Self {
            data: cache.data().to_vec(),
            phase: cache.phase(),
            last_error: cache.last_error().cloned(),
        }
    }
}

/// Everything the presentation layer may read.
///
/// Serializes as
/// `{ "revision": N, "active_view": "...", "resources": { "contacts": {...}, ... }, "stats": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// Incremented on every publish; `0` is the initial all-idle state.
    pub revision: u64,
    /// The most recently activated view.
    pub active_view: ViewKind,
    /// One entry per [`ResourceKind`].
    pub resources: BTreeMap<ResourceKind, ResourceSnapshot>,
    pub stats: AggregateStats,
}

impl DashboardSnapshot {
    /// Capture the current state.
    pub(crate) fn capture(
        revision: u64,
        active_view: ViewKind,
        caches: &ResourceCaches,
        stats: &AggregateStats,
    ) -> Self {
        Self {
            revision,
            active_view,
            resources: caches
                .iter()
                .map(|(kind, cache)| (kind, ResourceSnapshot::from(cache)))
                .collect(),
            stats: stats.clone(),
        }
    }

    /// Published state of `kind`.
    ///
    /// Every kind is captured, so the fallback is never used in practice.
    pub fn resource(&self, kind: ResourceKind) -> ResourceSnapshot {
        self.resources.get(&kind).cloned().unwrap_or_default()
    }

    /// Phase of `kind`.
    pub fn phase(&self, kind: ResourceKind) -> Phase {
        self.resources
            .get(&kind)
            .map_or(Phase::Idle, |resource| resource.phase)
    }

    /// Items of `kind`.
    pub fn data(&self, kind: ResourceKind) -> &[Record] {
        self.resources
            .get(&kind)
            .map(|resource| resource.data.as_slice())
            .unwrap_or_default()
    }

    /// `true` when no resource has a fetch outstanding.
    pub fn is_settled(&self) -> bool {
        self.resources
            .values()
            .all(|resource| resource.phase != Phase::Loading)
    }
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self::capture(
            0,
            ViewKind::default(),
            &ResourceCaches::new(),
            &AggregateStats::default(),
        )
    }
}
