//! Tracked work items and their append-only change logs.
//!
//! An [`Item`] is a fully materialized record handed over by whatever
//! retrieved it: creation instant, current field values, current status, and
//! the complete trail of field transitions. Once ingested, change-log entries
//! are never mutated; the only way to add history is to append.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// Field key under which status transitions are recorded.
pub const STATUS_FIELD: &str = "status";

/// Raw key of the story point estimate field.
pub const STORY_POINTS_FIELD: &str = "customfield_10006";

/// Stable identifier of a work item (e.g. `PROJ-42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Wraps a raw key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// One recorded field transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    at: DateTime<Utc>,
    field: String,
    #[serde(default)]
    from: FieldValue,
    #[serde(default)]
    to: FieldValue,
}

impl ChangeEntry {
    /// A transition of `field` from `from` to `to` at `at`.
    #[must_use]
    pub fn new(
        at: DateTime<Utc>,
        field: impl Into<String>,
        from: impl Into<FieldValue>,
        to: impl Into<FieldValue>,
    ) -> Self {
        Self {
            at,
            field: field.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// When the change happened.
    pub const fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Raw key or display name of the changed field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Value before the change.
    pub const fn from_value(&self) -> &FieldValue {
        &self.from
    }

    /// Value after the change.
    pub const fn to_value(&self) -> &FieldValue {
        &self.to
    }
}

/// Maps raw field keys to the display names change logs sometimes use.
///
/// Change logs from some trackers record custom fields by display name
/// (`"Story Points"`) while current values are keyed by raw id
/// (`customfield_10006`). An entry touches a field when its name equals
/// either form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldAliases(BTreeMap<String, String>);

impl FieldAliases {
    /// An alias table with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Registers `display_name` as an alias of `raw_key`.
    #[must_use]
    pub fn with(mut self, raw_key: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.0.insert(raw_key.into(), display_name.into());
        self
    }

    /// Display name registered for `raw_key`.
    pub fn alias_of(&self, raw_key: &str) -> Option<&str> {
        self.0.get(raw_key).map(String::as_str)
    }

    /// Returns true if a change-log entry named `entry_field` touches `field_key`.
    #[must_use]
    pub fn matches(&self, field_key: &str, entry_field: &str) -> bool {
        entry_field == field_key || self.alias_of(field_key) == Some(entry_field)
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no aliases are registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self::empty().with(STORY_POINTS_FIELD, "Story Points")
    }
}

/// A tracked work item.
///
/// # Examples
///
/// ```
/// use burnup::{Item, ChangeEntry, FieldValue};
/// use chrono::{TimeZone, Utc};
///
/// let created = Utc.with_ymd_and_hms(2024, 1, 1, 16, 0, 0).unwrap();
/// let item = Item::builder("PROJ-1", created)
///     .status("Done")
///     .field("customfield_10006", 5.0)
///     .change(ChangeEntry::new(
///         Utc.with_ymd_and_hms(2024, 1, 3, 16, 0, 0).unwrap(),
///         "status",
///         "In Progress",
///         "Done",
///     ))
///     .build();
///
/// assert_eq!(item.current_value("status"), FieldValue::from("Done"));
/// assert_eq!(item.change_log().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    key: ItemKey,
    created: DateTime<Utc>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
    #[serde(default)]
    change_log: Vec<ChangeEntry>,
}

impl Item {
    /// Starts building an item.
    pub fn builder(key: impl Into<String>, created: DateTime<Utc>) -> ItemBuilder {
        ItemBuilder {
            item: Self {
                key: ItemKey::new(key),
                created,
                status: None,
                fields: HashMap::new(),
                change_log: Vec::new(),
            },
        }
    }

    /// Item key.
    pub const fn key(&self) -> &ItemKey {
        &self.key
    }

    /// Creation instant.
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Current status, if set.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Entries in ingestion order.
    pub fn change_log(&self) -> &[ChangeEntry] {
        &self.change_log
    }

    /// Appends an entry to the change log.
    pub fn record(&mut self, entry: ChangeEntry) {
        self.change_log.push(entry);
    }

    /// Current value of a field. The status is exposed under [`STATUS_FIELD`].
    #[must_use]
    pub fn current_value(&self, field_key: &str) -> FieldValue {
        if field_key == STATUS_FIELD {
            return self.status.as_deref().into();
        }
        self.fields.get(field_key).cloned().unwrap_or_default()
    }
}

/// Builder for [`Item`].
#[derive(Debug, Clone)]
pub struct ItemBuilder {
    item: Item,
}

impl ItemBuilder {
    /// Sets the current status.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.item.status = Some(status.into());
        self
    }

    /// Sets the current value of a field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.item.fields.insert(key.into(), value.into());
        self
    }

    /// Appends a change log entry.
    #[must_use]
    pub fn change(mut self, entry: ChangeEntry) -> Self {
        self.item.change_log.push(entry);
        self
    }

    /// Finishes the item.
    #[must_use]
    pub fn build(self) -> Item {
        self.item
    }
}
