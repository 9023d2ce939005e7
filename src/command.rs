//! Create and update inputs submitted by the presentation layer.
//!
//! Each input is validated locally before the remote write is attempted,
//! then converted to the [`Record`] of fields sent to the
//! [`ResourceClient`](crate::ResourceClient). Creates fill unset values from
//! the configured defaults; updates leave them out.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::record::Record;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern is valid")
});

/// Field values filled in when a new contact leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDefaults {
    /// Contact type (default `"lead"`).
    pub contact_type: String,
    /// Record status sent on create (default `"active"`).
    pub status: String,
}

impl Default for ContactDefaults {
    fn default() -> Self {
        Self {
            contact_type: "lead".to_string(),
            status: "active".to_string(),
        }
    }
}

/// Field values filled in when a new task leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefaults {
    /// Task status (default `"pending"`).
    pub status: String,
    /// Task priority (default `"medium"`).
    pub priority: String,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            status: "pending".to_string(),
            priority: "medium".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// NewContact
// ---------------------------------------------------------------------------

/// Input for creating or updating a contact.
///
/// # Examples
///
/// ```
/// use dashboard_sync::NewContact;
///
/// let input = NewContact::new("Ada Lovelace")
///     .with_email("ada@example.com")
///     .with_company("Analytical Engines");
///
/// assert!(input.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    /// One of `lead`, `prospect`, `customer`, `partner`.
    pub contact_type: Option<String>,
}

impl NewContact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_contact_type(mut self, contact_type: impl Into<String>) -> Self {
        self.contact_type = Some(contact_type.into());
        self
    }

    /// Check the input before any remote call.
    ///
    /// The name is required. An email is optional, but a non-blank one must
    /// look like `local@domain.tld`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingName`] or
    /// [`ValidationError::InvalidEmail`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if let Some(email) = self.email.as_deref().map(str::trim)
            && !email.is_empty()
            && !EMAIL_PATTERN.is_match(email)
        {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }

    /// Build the fields sent to the remote create call.
    pub fn to_fields(&self, defaults: &ContactDefaults) -> Record {
        let contact_type = self
            .contact_type
            .clone()
            .unwrap_or_else(|| defaults.contact_type.clone());
        let record = Record::new()
            .with("name", self.name.trim())
            .with("type", contact_type)
            .with("status", defaults.status.clone());
        with_optional(
            record,
            [
                ("email", &self.email),
                ("phone", &self.phone),
                ("company", &self.company),
                ("title", &self.title),
            ],
        )
    }

    /// Build the fields sent to a remote update; unset values are omitted.
    pub fn to_update_fields(&self) -> Record {
        with_optional(
            Record::new().with("name", self.name.trim()),
            [
                ("type", &self.contact_type),
                ("email", &self.email),
                ("phone", &self.phone),
                ("company", &self.company),
                ("title", &self.title),
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// NewDeal
// ---------------------------------------------------------------------------

/// Input for creating or updating a deal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDeal {
    pub name: String,
    pub amount: Option<f64>,
    pub stage: Option<String>,
    /// Win probability in percent.
    pub probability: Option<u8>,
    /// Identity of the linked contact.
    pub contact_id: Option<String>,
}

impl NewDeal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_probability(mut self, probability: u8) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn with_contact_id(mut self, contact_id: impl Into<String>) -> Self {
        self.contact_id = Some(contact_id.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::MissingName`] or
    /// [`ValidationError::InvalidAmount`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if let Some(amount) = self.amount
            && !(amount.is_finite() && amount >= 0.0)
        {
            return Err(ValidationError::InvalidAmount);
        }
        Ok(())
    }

    pub fn to_fields(&self) -> Record {
        let mut record = Record::new().with("name", self.name.trim());
        if let Some(amount) = self.amount {
            record = record.with("amount", amount);
        }
        if let Some(probability) = self.probability {
            record = record.with("probability", probability);
        }
        with_optional(
            record,
            [("stage", &self.stage), ("contact", &self.contact_id)],
        )
    }
}

// ---------------------------------------------------------------------------
// NewTask
// ---------------------------------------------------------------------------

/// Input for creating or updating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    /// Due date as `YYYY-MM-DD`.
    pub due_date: Option<String>,
    pub contact_id: Option<String>,
    pub deal_id: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn with_contact_id(mut self, contact_id: impl Into<String>) -> Self {
        self.contact_id = Some(contact_id.into());
        self
    }

    pub fn with_deal_id(mut self, deal_id: impl Into<String>) -> Self {
        self.deal_id = Some(deal_id.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::MissingTitle`] if the title is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        Ok(())
    }

    /// Build the fields sent to the remote create call.
    ///
    /// The title doubles as the record name.
    pub fn to_fields(&self, defaults: &TaskDefaults) -> Record {
        let title = self.title.trim();
        let record = Record::new()
            .with("name", title)
            .with("title", title)
            .with(
                "status",
                self.status.clone().unwrap_or_else(|| defaults.status.clone()),
            )
            .with(
                "priority",
                self.priority
                    .clone()
                    .unwrap_or_else(|| defaults.priority.clone()),
            );
        with_optional(
            record,
            [
                ("due_date", &self.due_date),
                ("contact", &self.contact_id),
                ("deal", &self.deal_id),
            ],
        )
    }

    /// Build the fields sent to a remote update; unset values are omitted.
    pub fn to_update_fields(&self) -> Record {
        let title = self.title.trim();
        with_optional(
            Record::new().with("name", title).with("title", title),
            [
                ("status", &self.status),
                ("priority", &self.priority),
                ("due_date", &self.due_date),
                ("contact", &self.contact_id),
                ("deal", &self.deal_id),
            ],
        )
    }
}

/// Add every present, non-blank optional string field.
fn with_optional<const N: usize>(
    mut record: Record,
    fields: [(&str, &Option<String>); N],
) -> Record {
    for (key, value) in fields {
        if let Some(value) = value.as_deref().map(str::trim)
            && !value.is_empty()
        {
            record = record.with(key, value);
        }
    }
    record
}
