//! Status definitions and discovery.
//!
//! Scope accounting always covers every configured status; only enabled
//! statuses in the done category count as progress. The enabled flag and the
//! order of definitions otherwise only affect presentation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::{Item, STATUS_FIELD};

/// Palette cycled through when new statuses are discovered.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#8884d8", "#82ca9d", "#ffc658", "#ff7300", "#d0ed57", "#a4de6c", "#8dd1e1", "#83a6ed",
    "#8e4585", "#cb4335",
];

/// Workflow category of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCategory {
    /// Not yet picked up.
    #[default]
    NotStarted,
    /// In flight.
    Started,
    /// Finished.
    Done,
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Started => write!(f, "started"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A configured status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDefinition {
    /// Status name as it appears on items.
    pub name: String,
    /// Workflow category.
    #[serde(default)]
    pub category: StatusCategory,
    /// Disabled statuses still count toward scope.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Presentation colour.
    #[serde(default)]
    pub color: String,
}

const fn enabled_default() -> bool {
    true
}

impl StatusDefinition {
    /// An enabled definition with no colour.
    #[must_use]
    pub fn new(name: impl Into<String>, category: StatusCategory) -> Self {
        Self {
            name: name.into(),
            category,
            enabled: true,
            color: String::new(),
        }
    }

    /// Marks the definition disabled.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Sets the presentation colour.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// True for enabled statuses of the done category.
    #[must_use]
    pub fn counts_as_progress(&self) -> bool {
        self.enabled && self.category == StatusCategory::Done
    }
}

/// Ordered list of status definitions.
///
/// Order is the caller's stacking order and carries no meaning for the
/// numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCatalog(Vec<StatusDefinition>);

impl StatusCatalog {
    /// A catalog in the given order.
    #[must_use]
    pub const fn new(definitions: Vec<StatusDefinition>) -> Self {
        Self(definitions)
    }

    /// Definitions in order.
    pub fn definitions(&self) -> &[StatusDefinition] {
        &self.0
    }

    /// Definition named `name`.
    pub fn get(&self, name: &str) -> Option<&StatusDefinition> {
        self.0.iter().find(|d| d.name == name)
    }

    /// Names of enabled done-category statuses.
    pub fn progress_statuses(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|d| d.counts_as_progress())
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Names of every configured status, enabled or not.
    pub fn scope_statuses(&self) -> Vec<&str> {
        self.0.iter().map(|d| d.name.as_str()).collect()
    }

    /// Names of enabled statuses, in order.
    pub fn enabled_statuses(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|d| d.enabled)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Adds every discovered status not yet configured.
    ///
    /// Existing definitions keep their position and settings. New ones are
    /// appended enabled, in the not-started category, with the next palette
    /// colour. Returns how many were added.
    pub fn merge_discovered<I, S>(&mut self, discovered: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for name in discovered {
            let name = name.as_ref();
            if self.get(name).is_some() {
                continue;
            }
            let color = DEFAULT_PALETTE[self.0.len() % DEFAULT_PALETTE.len()];
            self.0
                .push(StatusDefinition::new(name, StatusCategory::NotStarted).with_color(color));
            added += 1;
        }
        added
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no statuses are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<StatusDefinition>> for StatusCatalog {
    fn from(definitions: Vec<StatusDefinition>) -> Self {
        Self(definitions)
    }
}

/// Every non-blank status any item has now or ever had, sorted and de-duplicated.
#[must_use]
pub fn extract_all_statuses(items: &[Item]) -> Vec<String> {
    let mut statuses = BTreeSet::new();
    for item in items {
        if let Some(status) = item.status().filter(|s| !s.is_empty()) {
            statuses.insert(status.to_string());
        }
        for entry in item.change_log().iter().filter(|e| e.field() == STATUS_FIELD) {
            for side in [entry.from_value(), entry.to_value()] {
                if let Some(name) = side.as_text().filter(|s| !s.is_empty()) {
                    statuses.insert(name.to_string());
                }
            }
        }
    }
    statuses.into_iter().collect()
}
