//! Point-in-time reconstruction of item fields.
//!
//! Reconstruction replays a field's change log in reverse: starting from the
//! current value, every transition recorded strictly after the target instant
//! is undone. Because the trail is complete and non-overlapping, undoing those
//! transitions collapses to a single step: the value is the `from` side of the
//! earliest transition after the target.
//!
//! Entries sharing an instant are ordered by ingestion order, earlier
//! ingested meaning earlier in time.

use chrono::{DateTime, Utc};

use crate::item::{ChangeEntry, FieldAliases, Item};
use crate::value::FieldValue;

/// The ordered audit trail of one field of one item.
///
/// Build once per (item, field) and query many instants; each query is a
/// binary search over the entry instants.
#[derive(Debug, Clone)]
pub struct FieldTimeline<'a> {
    created: DateTime<Utc>,
    current: FieldValue,
    entries: Vec<&'a ChangeEntry>,
}

impl<'a> FieldTimeline<'a> {
    /// Collects the entries of `item` touching `field_key` (raw key or alias).
    #[must_use]
    pub fn new(item: &'a Item, field_key: &str, aliases: &FieldAliases) -> Self {
        let mut entries: Vec<&'a ChangeEntry> = item
            .change_log()
            .iter()
            .filter(|entry| aliases.matches(field_key, entry.field()))
            .collect();
        // Stable: ties keep ingestion order.
        entries.sort_by_key(|entry| entry.at());

        Self {
            created: item.created(),
            current: item.current_value(field_key),
            entries,
        }
    }

    /// Value of the field at `target`, or absent before the item existed.
    #[must_use]
    pub fn value_at(&self, target: DateTime<Utc>) -> FieldValue {
        if target < self.created {
            return FieldValue::Absent;
        }
        let first_after = self.entries.partition_point(|entry| entry.at() <= target);
        match self.entries.get(first_after) {
            Some(entry) => entry.from_value().clone(),
            None => self.current.clone(),
        }
    }

    /// Number of entries touching this field.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no change entry touches this field.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reconstructs field values of items at arbitrary instants.
#[derive(Debug, Clone, Default)]
pub struct HistoryReconstructor {
    aliases: FieldAliases,
}

impl HistoryReconstructor {
    /// A reconstructor resolving field keys through `aliases`.
    #[must_use]
    pub const fn new(aliases: FieldAliases) -> Self {
        Self { aliases }
    }

    /// Display-name aliases in use.
    pub const fn aliases(&self) -> &FieldAliases {
        &self.aliases
    }

    /// Value of `field_key` on `item` at `target`.
    ///
    /// Pure: identical inputs always yield identical output. Returns
    /// [`FieldValue::Absent`] when `target` precedes the item's creation.
    #[must_use]
    pub fn value_at(&self, item: &Item, field_key: &str, target: DateTime<Utc>) -> FieldValue {
        self.timeline(item, field_key).value_at(target)
    }

    /// Prepares a reusable timeline for repeated queries of one field.
    #[must_use]
    pub fn timeline<'a>(&self, item: &'a Item, field_key: &str) -> FieldTimeline<'a> {
        FieldTimeline::new(item, field_key, &self.aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{STATUS_FIELD, STORY_POINTS_FIELD};
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn walked_item() -> Item {
        // Ingested newest first, the way trackers usually return history.
        Item::builder("W-1", at(1, 16))
            .status("Done")
            .change(ChangeEntry::new(at(3, 16), STATUS_FIELD, "In Progress", "Done"))
            .change(ChangeEntry::new(at(2, 16), STATUS_FIELD, "To Do", "In Progress"))
            .build()
    }

    #[test]
    fn test_before_creation_is_absent() {
        let item = walked_item();
        let r = HistoryReconstructor::default();
        assert!(r.value_at(&item, STATUS_FIELD, at(1, 15)).is_absent());
        assert!(r.value_at(&item, "anything", at(1, 0)).is_absent());
    }

    #[test]
    fn test_rewinds_each_transition() {
        let item = walked_item();
        let r = HistoryReconstructor::default();
        assert_eq!(r.value_at(&item, STATUS_FIELD, at(1, 17)), FieldValue::from("To Do"));
        assert_eq!(r.value_at(&item, STATUS_FIELD, at(2, 17)), FieldValue::from("In Progress"));
        assert_eq!(r.value_at(&item, STATUS_FIELD, at(3, 17)), FieldValue::from("Done"));
    }

    #[test]
    fn test_entry_at_target_is_already_applied() {
        let item = walked_item();
        let r = HistoryReconstructor::default();
        assert_eq!(r.value_at(&item, STATUS_FIELD, at(2, 16)), FieldValue::from("In Progress"));
        assert_eq!(
            r.value_at(&item, STATUS_FIELD, at(2, 16) - Duration::seconds(1)),
            FieldValue::from("To Do")
        );
    }

    #[test]
    fn test_no_history_returns_current_value() {
        let item = Item::builder("W-2", at(1, 0)).status("Open").field("points", 8.0).build();
        let r = HistoryReconstructor::default();
        for day in 1..=20 {
            assert_eq!(r.value_at(&item, STATUS_FIELD, at(day, 12)), FieldValue::from("Open"));
            assert_eq!(r.value_at(&item, "points", at(day, 12)), FieldValue::Number(8.0));
        }
    }

    #[test]
    fn test_alias_entries_rewind_raw_field() {
        let item = Item::builder("W-3", at(1, 0))
            .status("Done")
            .field(STORY_POINTS_FIELD, 5.0)
            .change(ChangeEntry::new(at(3, 18), "Story Points", "3", "5"))
            .build();
        let r = HistoryReconstructor::default();
        assert_eq!(r.value_at(&item, STORY_POINTS_FIELD, at(2, 12)), FieldValue::from("3"));
        assert_eq!(r.value_at(&item, STORY_POINTS_FIELD, at(4, 12)), FieldValue::Number(5.0));

        let strict = HistoryReconstructor::new(FieldAliases::empty());
        assert_eq!(strict.value_at(&item, STORY_POINTS_FIELD, at(2, 12)), FieldValue::Number(5.0));
    }

    #[test]
    fn test_other_fields_do_not_interfere() {
        let item = Item::builder("W-4", at(1, 0))
            .status("Done")
            .field("points", 2.0)
            .change(ChangeEntry::new(at(5, 0), "points", 1.0, 2.0))
            .change(ChangeEntry::new(at(3, 0), STATUS_FIELD, "Open", "Done"))
            .build();
        let r = HistoryReconstructor::default();
        assert_eq!(r.value_at(&item, STATUS_FIELD, at(4, 0)), FieldValue::from("Done"));
        assert_eq!(r.value_at(&item, "points", at(4, 0)), FieldValue::Number(1.0));
    }

    #[test]
    fn test_duplicate_instants_follow_ingestion_order() {
        // A then B at the same instant: Open -> Review -> Done.
        let item = Item::builder("W-5", at(1, 0))
            .status("Done")
            .change(ChangeEntry::new(at(3, 0), STATUS_FIELD, "Open", "Review"))
            .change(ChangeEntry::new(at(3, 0), STATUS_FIELD, "Review", "Done"))
            .build();
        let r = HistoryReconstructor::default();
        assert_eq!(r.value_at(&item, STATUS_FIELD, at(2, 0)), FieldValue::from("Open"));
        assert_eq!(r.value_at(&item, STATUS_FIELD, at(3, 0)), FieldValue::from("Done"));
    }

    #[test]
    fn test_timeline_matches_single_queries() {
        let item = walked_item();
        let r = HistoryReconstructor::default();
        let timeline = r.timeline(&item, STATUS_FIELD);
        assert_eq!(timeline.len(), 2);
        for day in 1..=5 {
            let t = at(day, 12);
            assert_eq!(timeline.value_at(t), r.value_at(&item, STATUS_FIELD, t));
        }
    }
}
