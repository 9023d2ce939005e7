//! Open record type for items returned by the remote resource API.
//!
//! The transport may return arbitrary extra fields, so a [`Record`] keeps the
//! full JSON object and only exposes typed accessors for the handful of
//! fields the dashboard reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity field set by the server on every record.
pub const ID_FIELD: &str = "id";

/// Name field candidates, in lookup order. The remote API capitalises it.
const NAME_FIELDS: [&str; 2] = ["name", "Name"];

/// A single remote item: contact, deal, or task.
///
/// Serializes transparently as the underlying JSON object.
///
/// # Examples
///
/// ```
/// use dashboard_sync::Record;
/// use serde_json::json;
///
/// let deal = Record::from_value(json!({"id": 7, "Name": "Renewal", "amount": "1200.50"}))
///     .expect("object");
/// assert_eq!(deal.name(), Some("Renewal"));
/// assert_eq!(deal.amount(), 1200.5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Set a field, returning the record for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw access to any field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Server-assigned identity, if present and non-null.
    pub fn id(&self) -> Option<&Value> {
        self.0.get(ID_FIELD).filter(|v| !v.is_null())
    }

    /// Display name, if present as a non-blank string.
    pub fn name(&self) -> Option<&str> {
        NAME_FIELDS
            .iter()
            .filter_map(|key| self.str_field(key))
            .find(|name| !name.trim().is_empty())
    }

    /// Numeric `amount`, or `0.0` when absent, non-numeric, or not finite.
    ///
    /// Accepts JSON numbers and numeric strings (surrounding whitespace is
    /// ignored).
    pub fn amount(&self) -> f64 {
        let parsed = match self.0.get("amount") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    /// The `status` field when it is a string.
    pub fn status(&self) -> Option<&str> {
        self.str_field("status")
    }

    /// The contact `type` field (lead, prospect, customer, partner).
    pub fn contact_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    /// Consume the record and return its JSON object.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
