//! Local application of successful remote writes.
//!
//! After a remote create resolves, the canonical record is appended to the
//! matching cache; an update replaces the cached record with the same id and
//! a delete removes it. Stats are then recomputed from the caches. Nothing
//! is refetched.

use serde_json::Value;

use crate::coordinator::ResourceCaches;
use crate::error::ValidationError;
use crate::record::Record;
use crate::resource::ResourceKind;
use crate::stats::{AggregateStats, compute_stats};

/// Check a record returned by the server before it enters a cache.
///
/// Every record needs an identity; contacts also need a name.
///
/// # Errors
///
/// Returns [`ValidationError::MissingIdentity`] or
/// [`ValidationError::MissingName`].
pub fn validate_created(kind: ResourceKind, record: &Record) -> Result<(), ValidationError> {
    if record.id().is_none() {
        return Err(ValidationError::MissingIdentity);
    }
    if kind == ResourceKind::Contacts && record.name().is_none() {
        return Err(ValidationError::MissingName);
    }
    Ok(())
}

/// Append a created record to the cache for `kind` and return fresh stats.
///
/// The caches are left untouched when validation fails.
///
/// # Errors
///
/// Returns [`ValidationError`] if [`validate_created`] rejects the record.
pub fn apply_created(
    caches: &mut ResourceCaches,
    kind: ResourceKind,
    record: Record,
) -> Result<AggregateStats, ValidationError> {
    validate_created(kind, &record)?;
    caches.get_mut(kind).apply_create(record);
    Ok(compute_stats(caches))
}

/// Append a created contact and return fresh stats.
///
/// # Errors
///
/// Returns [`ValidationError`] if the contact has no identity or name.
pub fn apply_contact_created(
    caches: &mut ResourceCaches,
    contact: Record,
) -> Result<AggregateStats, ValidationError> {
    apply_created(caches, ResourceKind::Contacts, contact)
}

/// Whether the cache for `kind` holds a record with `id`.
pub fn contains_record(caches: &ResourceCaches, kind: ResourceKind, id: &Value) -> bool {
    caches
        .get(kind)
        .data()
        .iter()
        .any(|record| record.id() == Some(id))
}

/// Replace the cached record with `id` by the server's updated record and
/// return fresh stats.
///
/// The record keeps its position and the phase is left alone.
///
/// # Errors
///
/// Returns [`ValidationError`] if [`validate_created`] rejects the record,
/// or [`ValidationError::UnknownRecord`] if no cached record has `id`. The
/// caches are untouched in both cases.
pub fn apply_updated(
    caches: &mut ResourceCaches,
    kind: ResourceKind,
    id: &Value,
    record: Record,
) -> Result<AggregateStats, ValidationError> {
    validate_created(kind, &record)?;
    if !caches
        .get_mut(kind)
        .apply_update(|existing| existing.id() == Some(id), record)
    {
        return Err(unknown_record(id));
    }
    Ok(compute_stats(caches))
}

/// Remove the cached record with `id` and return fresh stats.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownRecord`] if no cached record has `id`.
pub fn apply_deleted(
    caches: &mut ResourceCaches,
    kind: ResourceKind,
    id: &Value,
) -> Result<AggregateStats, ValidationError> {
    caches
        .get_mut(kind)
        .apply_delete(|existing| existing.id() == Some(id))
        .ok_or_else(|| unknown_record(id))?;
    Ok(compute_stats(caches))
}

pub(crate) fn unknown_record(id: &Value) -> ValidationError {
    let label = match id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    };
    ValidationError::UnknownRecord(label)
}
