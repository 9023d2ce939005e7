//! Views of the presentation layer and the resources each one depends on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceKind;

/// A named view the presentation layer can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Overview with aggregate statistics; needs every resource.
    Dashboard,
    Contacts,
    Deals,
    Tasks,
    /// Any view without remote data (reports, settings, not-found).
    #[default]
    Other,
}

impl ViewKind {
    /// The resources this view renders.
    pub fn required_resources(self) -> &'static [ResourceKind] {
        match self {
            Self::Dashboard => &ResourceKind::ALL,
            Self::Contacts => &[ResourceKind::Contacts],
            Self::Deals => &[ResourceKind::Deals],
            Self::Tasks => &[ResourceKind::Tasks],
            Self::Other => &[],
        }
    }

    /// Map a navigation tab id to a view. Unknown ids map to [`ViewKind::Other`].
    ///
    /// # Examples
    ///
    /// ```
    /// use dashboard_sync::ViewKind;
    ///
    /// assert_eq!(ViewKind::from_tab("deals"), ViewKind::Deals);
    /// assert_eq!(ViewKind::from_tab("reports"), ViewKind::Other);
    /// ```
    pub fn from_tab(tab: &str) -> Self {
        match tab {
            "dashboard" => Self::Dashboard,
            "contacts" => Self::Contacts,
            "deals" => Self::Deals,
            "tasks" => Self::Tasks,
            _ => Self::Other,
        }
    }

    /// Return the tab id of this view.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Contacts => "contacts",
            Self::Deals => "deals",
            Self::Tasks => "tasks",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
