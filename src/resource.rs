//! Resource kinds, cache phases, and the per-resource cache state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, FetchError};

/// A remotely fetchable collection shown by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Contacts,
    Deals,
    Tasks,
}

impl ResourceKind {
    /// Every kind, in display order.
    pub const ALL: [ResourceKind; 3] = [Self::Contacts, Self::Deals, Self::Tasks];

    /// Return the lowercase identifier used in logs and serialized snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Deals => "deals",
            Self::Tasks => "tasks",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of a [`ResourceCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Never fetched.
    #[default]
    Idle,
    /// Exactly one fetch is outstanding.
    Loading,
    /// The last fetch succeeded (data may still be empty).
    Ready,
    /// The last fetch failed; data from earlier fetches is kept.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        })
    }
}

/// State of one fetchable collection: its items, phase, and last error.
///
/// Transitions only happen through [`begin_load`](Self::begin_load),
/// [`complete_load`](Self::complete_load), [`fail_load`](Self::fail_load)
/// and [`apply_create`](Self::apply_create). `last_error` is `Some` exactly
/// when the phase is [`Phase::Failed`].
///
/// # Type Parameters
///
/// * `T` - Item type held by the collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceCache<T> {
    data: Vec<T>,
    phase: Phase,
    last_error: Option<FetchError>,
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            phase: Phase::Idle,
            last_error: None,
        }
    }
}

impl<T> ResourceCache<T> {
    /// Create an empty cache in [`Phase::Idle`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in fetch/create order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Error of the last failed fetch, present only while [`Phase::Failed`].
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Mark a fetch as outstanding.
    ///
    /// Valid from `Idle`, `Ready` and `Failed`. Clears `last_error`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if a fetch is already outstanding.
    pub fn begin_load(&mut self) -> Result<(), CacheError> {
        if self.phase == Phase::Loading {
            return Err(CacheError {
                operation: "begin_load",
                phase: self.phase,
            });
        }
        self.phase = Phase::Loading;
        self.last_error = None;
        Ok(())
    }

    /// Settle the outstanding fetch successfully.
    ///
    /// Replaces the items wholesale, keeping the order the server returned.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] unless the cache is `Loading`.
    pub fn complete_load(&mut self, data: Vec<T>) -> Result<(), CacheError> {
        self.expect_loading("complete_load")?;
        self.data = data;
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Settle the outstanding fetch with an error.
    ///
    /// Existing items are kept: stale data is shown rather than a blank view.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] unless the cache is `Loading`.
    pub fn fail_load(&mut self, error: FetchError) -> Result<(), CacheError> {
        self.expect_loading("fail_load")?;
        self.phase = Phase::Failed;
        self.last_error = Some(error);
        Ok(())
    }

    /// Append a newly created item without changing the phase.
    pub fn apply_create(&mut self, item: T) {
        self.data.push(item);
    }

    /// Replace the first item matching `target` in place, keeping its
    /// position and the phase.
    ///
    /// Returns `false` (and changes nothing) when no item matches.
    pub fn apply_update(&mut self, target: impl Fn(&T) -> bool, item: T) -> bool {
        match self.data.iter_mut().find(|existing| target(existing)) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Remove the first item matching `target` without changing the phase.
    pub fn apply_delete(&mut self, target: impl Fn(&T) -> bool) -> Option<T> {
        let index = self.data.iter().position(target)?;
        Some(self.data.remove(index))
    }

    fn expect_loading(&self, operation: &'static str) -> Result<(), CacheError> {
        if self.phase == Phase::Loading {
            Ok(())
        } else {
            Err(CacheError {
                operation,
                phase: self.phase,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loading_cache() -> ResourceCache<u32> {
        let mut cache = ResourceCache::new();
        cache.begin_load().expect("begin_load from idle");
        cache
    }

    #[test]
    fn new_cache_is_idle_and_empty() {
        let cache = ResourceCache::<u32>::new();
        assert_eq!(cache.phase(), Phase::Idle);
        assert!(cache.data().is_empty());
        assert!(cache.last_error().is_none());
    }

    #[test]
    fn begin_load_twice_is_rejected() {
        let mut cache = loading_cache();
        let err = cache.begin_load().unwrap_err();
        assert_eq!(err.operation, "begin_load");
        assert_eq!(err.phase, Phase::Loading);
        assert_eq!(cache.phase(), Phase::Loading);
    }

    #[test]
    fn complete_load_replaces_data_in_server_order() {
        let mut cache = loading_cache();
        cache.complete_load(vec![3, 1, 2]).expect("complete");
        assert_eq!(cache.phase(), Phase::Ready);
        assert_eq!(cache.data(), &[3, 1, 2]);

        cache.begin_load().expect("reload from ready");
        cache.complete_load(vec![9]).expect("complete again");
        assert_eq!(cache.data(), &[9]);
    }

    #[test]
    fn fail_load_keeps_stale_data() {
        let mut cache = loading_cache();
        cache.complete_load(vec![1, 2]).expect("complete");
        cache.begin_load().expect("reload");
        cache.fail_load(FetchError::new("offline")).expect("fail");

        assert_eq!(cache.phase(), Phase::Failed);
        assert_eq!(cache.data(), &[1, 2]);
        assert_eq!(
            cache.last_error().map(|e| e.message.as_str()),
            Some("offline")
        );
    }

    #[test]
    fn begin_load_clears_last_error() {
        let mut cache = loading_cache();
        cache.fail_load(FetchError::new("boom")).expect("fail");
        cache.begin_load().expect("retry from failed");
        assert_eq!(cache.phase(), Phase::Loading);
        assert!(cache.last_error().is_none());
    }

    #[test]
    fn settle_without_loading_is_rejected() {
        let mut cache = ResourceCache::<u32>::new();
        assert!(cache.complete_load(vec![1]).is_err());
        assert!(cache.fail_load(FetchError::new("x")).is_err());
        assert_eq!(cache.phase(), Phase::Idle);
        assert!(cache.data().is_empty());
    }

    #[test]
    fn apply_create_appends_in_any_phase() {
        let mut cache = ResourceCache::new();
        cache.apply_create(1);
        assert_eq!(cache.phase(), Phase::Idle);

        cache.begin_load().expect("begin");
        cache.apply_create(2);
        assert_eq!(cache.phase(), Phase::Loading);
        assert_eq!(cache.data(), &[1, 2]);
    }

    #[test]
    fn apply_update_replaces_in_place() {
        let mut cache = loading_cache();
        cache.complete_load(vec![1, 2, 3]).expect("complete");

        assert!(cache.apply_update(|item| *item == 2, 20));
        assert_eq!(cache.data(), &[1, 20, 3]);
        assert_eq!(cache.phase(), Phase::Ready);

        assert!(!cache.apply_update(|item| *item == 7, 70));
        assert_eq!(cache.data(), &[1, 20, 3]);
    }

    #[test]
    fn apply_delete_removes_first_match() {
        let mut cache = loading_cache();
        cache.apply_create(5);
        cache.apply_create(6);

        assert_eq!(cache.apply_delete(|item| *item == 5), Some(5));
        assert_eq!(cache.apply_delete(|item| *item == 5), None);
        assert_eq!(cache.data(), &[6]);
        assert_eq!(cache.phase(), Phase::Loading);
    }

    #[test]
    fn kind_display_matches_serde_name() {
        for kind in ResourceKind::ALL {
            let json = serde_json::to_value(kind).expect("serialize");
            assert_eq!(json, kind.as_str());
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }
}
