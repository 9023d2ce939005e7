//! Fetch coordination: the single staleness policy and duplicate-fetch guard.

use std::collections::BTreeSet;

use crate::record::Record;
use crate::resource::{Phase, ResourceCache, ResourceKind};
use crate::view::ViewKind;

/// One [`ResourceCache`] per [`ResourceKind`].
///
/// Owned exclusively by the orchestrator; everything else reads snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceCaches {
    contacts: ResourceCache<Record>,
    deals: ResourceCache<Record>,
    tasks: ResourceCache<Record>,
}

impl ResourceCaches {
    /// All caches in [`Phase::Idle`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ResourceKind) -> &ResourceCache<Record> {
        match kind {
            ResourceKind::Contacts => &self.contacts,
            ResourceKind::Deals => &self.deals,
            ResourceKind::Tasks => &self.tasks,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut ResourceCache<Record> {
        match kind {
            ResourceKind::Contacts => &mut self.contacts,
            ResourceKind::Deals => &mut self.deals,
            ResourceKind::Tasks => &mut self.tasks,
        }
    }

    /// Iterate `(kind, cache)` pairs in [`ResourceKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, &ResourceCache<Record>)> {
        ResourceKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}

/// Whether a cache must be fetched before a view depending on it is shown.
///
/// Idle, Failed, and empty-Ready caches need a fetch. Ready caches with data
/// are served as-is, and a Loading cache already has its one outstanding
/// fetch.
pub fn needs_fetch<T>(cache: &ResourceCache<T>) -> bool {
    match cache.phase() {
        Phase::Idle | Phase::Failed => true,
        Phase::Ready => cache.data().is_empty(),
        Phase::Loading => false,
    }
}

/// Resources that must be fetched for `view`, given the current caches.
///
/// The result is computed from a single consistent read of the caches. An
/// empty set means no fetch is issued.
pub fn resources_needed(view: ViewKind, caches: &ResourceCaches) -> BTreeSet<ResourceKind> {
    view.required_resources()
        .iter()
        .copied()
        .filter(|kind| needs_fetch(caches.get(*kind)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use serde_json::json;

    fn contact(id: u64) -> Record {
        Record::from_value(json!({"id": id, "name": format!("c{id}")})).expect("object")
    }

    fn ready(caches: &mut ResourceCaches, kind: ResourceKind, data: Vec<Record>) {
        let cache = caches.get_mut(kind);
        cache.begin_load().expect("begin");
        cache.complete_load(data).expect("complete");
    }

    #[test]
    fn idle_caches_are_all_needed_for_dashboard() {
        let caches = ResourceCaches::new();
        let needed = resources_needed(ViewKind::Dashboard, &caches);
        assert_eq!(needed, ResourceKind::ALL.into_iter().collect());
    }

    #[test]
    fn other_view_needs_nothing() {
        let caches = ResourceCaches::new();
        assert!(resources_needed(ViewKind::Other, &caches).is_empty());
    }

    #[test]
    fn ready_with_data_is_skipped() {
        let mut caches = ResourceCaches::new();
        ready(
            &mut caches,
            ResourceKind::Contacts,
            vec![contact(1), contact(2), contact(3)],
        );
        assert!(resources_needed(ViewKind::Contacts, &caches).is_empty());
    }

    #[test]
    fn ready_but_empty_is_refetched() {
        let mut caches = ResourceCaches::new();
        ready(&mut caches, ResourceKind::Contacts, Vec::new());
        let needed = resources_needed(ViewKind::Contacts, &caches);
        assert_eq!(needed, BTreeSet::from([ResourceKind::Contacts]));
    }

    #[test]
    fn failed_is_refetched_even_with_stale_data() {
        let mut caches = ResourceCaches::new();
        ready(&mut caches, ResourceKind::Deals, vec![contact(1)]);
        let deals = caches.get_mut(ResourceKind::Deals);
        deals.begin_load().expect("begin");
        deals.fail_load(FetchError::new("down")).expect("fail");

        let needed = resources_needed(ViewKind::Deals, &caches);
        assert_eq!(needed, BTreeSet::from([ResourceKind::Deals]));
    }

    #[test]
    fn loading_is_never_needed() {
        let mut caches = ResourceCaches::new();
        caches
            .get_mut(ResourceKind::Tasks)
            .begin_load()
            .expect("begin");

        let needed = resources_needed(ViewKind::Dashboard, &caches);
        assert_eq!(
            needed,
            BTreeSet::from([ResourceKind::Contacts, ResourceKind::Deals])
        );
        assert!(resources_needed(ViewKind::Tasks, &caches).is_empty());
    }

    #[test]
    fn iter_yields_every_kind_once() {
        let caches = ResourceCaches::new();
        let kinds: Vec<_> = caches.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
    }
}
