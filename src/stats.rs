//! Derived dashboard metrics.
//!
//! [`compute_stats`] is the only producer of [`AggregateStats`]. It reads the
//! last-known data of every cache regardless of phase, so a failed or loading
//! resource still contributes what it has and never blocks the others.

use serde::{Deserialize, Serialize};

use crate::coordinator::ResourceCaches;
use crate::record::Record;
use crate::resource::ResourceKind;

/// Task status counted as pending (exact, case-sensitive match).
pub const PENDING_STATUS: &str = "pending";

// ---------------------------------------------------------------------------
// ContactTypeStats
// ---------------------------------------------------------------------------

/// Contacts broken down by their `type` field.
///
/// Contacts with a missing or unrecognised type are counted in
/// `total_contacts` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactTypeStats {
    pub leads: usize,
    pub prospects: usize,
    pub customers: usize,
    pub partners: usize,
}

impl ContactTypeStats {
    fn count(&mut self, contact: &Record) {
        match contact.contact_type() {
            Some("lead") => self.leads += 1,
            Some("prospect") => self.prospects += 1,
            Some("customer") => self.customers += 1,
            Some("partner") => self.partners += 1,
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// AggregateStats
// ---------------------------------------------------------------------------

/// Cross-resource metrics shown on the dashboard.
///
/// Never mutated independently: always recomputed from the caches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Number of contacts held.
    pub total_contacts: usize,
    /// Number of deals held.
    pub active_deals: usize,
    /// Sum of deal amounts; unparsable amounts count as zero.
    pub total_revenue: f64,
    /// Number of tasks whose status is exactly `"pending"`.
    pub pending_tasks: usize,
    /// Contact counts per contact type.
    pub contact_types: ContactTypeStats,
}

/// Compute the dashboard metrics from the current cache contents.
///
/// Pure and deterministic; callable in any phase.
pub fn compute_stats(caches: &ResourceCaches) -> AggregateStats {
    let contacts = caches.get(ResourceKind::Contacts).data();
    let deals = caches.get(ResourceKind::Deals).data();
    let tasks = caches.get(ResourceKind::Tasks).data();

    let mut contact_types = ContactTypeStats::default();
    for contact in contacts {
        contact_types.count(contact);
    }

    AggregateStats {
        total_contacts: contacts.len(),
        active_deals: deals.len(),
        total_revenue: deals.iter().map(Record::amount).sum(),
        pending_tasks: tasks
            .iter()
            .filter(|task| task.status() == Some(PENDING_STATUS))
            .count(),
        contact_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use serde_json::{Value, json};

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| Record::from_value(v).expect("object"))
            .collect()
    }

    fn load(caches: &mut ResourceCaches, kind: ResourceKind, values: Vec<Value>) {
        let cache = caches.get_mut(kind);
        cache.begin_load().expect("begin");
        cache.complete_load(records(values)).expect("complete");
    }

    #[test]
    fn empty_caches_give_zero_stats() {
        assert_eq!(
            compute_stats(&ResourceCaches::new()),
            AggregateStats::default()
        );
    }

    #[test]
    fn counts_and_sums_across_resources() {
        let mut caches = ResourceCaches::new();
        load(
            &mut caches,
            ResourceKind::Contacts,
            vec![
                json!({"id": 1, "name": "Alice", "type": "customer"}),
                json!({"id": 2, "name": "Bob", "type": "lead"}),
                json!({"id": 3, "name": "Charlie", "type": "prospect"}),
                json!({"id": 4, "name": "Diana", "type": "partner"}),
            ],
        );
        load(
            &mut caches,
            ResourceKind::Deals,
            vec![
                json!({"id": 1, "amount": 25000}),
                json!({"id": 2, "amount": 12000}),
                json!({"id": 3, "amount": "35000"}),
            ],
        );
        load(
            &mut caches,
            ResourceKind::Tasks,
            vec![
                json!({"id": 1, "status": "pending"}),
                json!({"id": 2, "status": "Pending"}),
                json!({"id": 3, "status": "completed"}),
                json!({"id": 4}),
            ],
        );

        let stats = compute_stats(&caches);
        assert_eq!(stats.total_contacts, 4);
        assert_eq!(stats.active_deals, 3);
        assert_eq!(stats.total_revenue, 72000.0);
        assert_eq!(stats.pending_tasks, 1);
        assert_eq!(
            stats.contact_types,
            ContactTypeStats {
                leads: 1,
                prospects: 1,
                customers: 1,
                partners: 1,
            }
        );
    }

    #[test]
    fn non_numeric_amount_contributes_zero() {
        let mut caches = ResourceCaches::new();
        load(
            &mut caches,
            ResourceKind::Deals,
            vec![
                json!({"id": 1, "amount": 100}),
                json!({"id": 2, "amount": "call me"}),
                json!({"id": 3}),
            ],
        );

        let stats = compute_stats(&caches);
        assert_eq!(stats.active_deals, 3);
        assert_eq!(stats.total_revenue, 100.0);
    }

    #[test]
    fn failed_resource_still_contributes_stale_data() {
        let mut caches = ResourceCaches::new();
        load(
            &mut caches,
            ResourceKind::Contacts,
            vec![json!({"id": 1, "name": "A"}), json!({"id": 2, "name": "B"})],
        );
        let contacts = caches.get_mut(ResourceKind::Contacts);
        contacts.begin_load().expect("begin");
        assert_eq!(compute_stats(&caches).total_contacts, 2);

        caches
            .get_mut(ResourceKind::Contacts)
            .fail_load(FetchError::new("gone"))
            .expect("fail");
        assert_eq!(compute_stats(&caches).total_contacts, 2);
    }

    #[test]
    fn compute_is_deterministic() {
        let mut caches = ResourceCaches::new();
        load(
            &mut caches,
            ResourceKind::Deals,
            vec![json!({"amount": 0.1}), json!({"amount": 0.2})],
        );
        assert_eq!(compute_stats(&caches), compute_stats(&caches));
    }
}
