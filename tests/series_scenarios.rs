//! End-to-end snapshot series scenarios.

use burnup::{
    extract_all_statuses, BurnupConfig, ChangeEntry, DateSpan, HistoryReconstructor, Item,
    Metric, SeriesRequest, SnapshotSeriesBuilder, StatusCatalog, STATUS_FIELD,
    STORY_POINTS_FIELD,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn far_future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

fn status_walk() -> Item {
    // Entries arrive newest first, as trackers usually list them.
    Item::builder("TEST-1", at("2023-01-01T08:00:00-08:00"))
        .status("Done")
        .change(ChangeEntry::new(
            at("2023-01-03T08:00:00-08:00"),
            STATUS_FIELD,
            "In Progress",
            "Done",
        ))
        .change(ChangeEntry::new(
            at("2023-01-02T08:00:00-08:00"),
            STATUS_FIELD,
            "To Do",
            "In Progress",
        ))
        .build()
}

#[test]
fn test_status_history_is_replayed_per_day() {
    let request = SeriesRequest::new(
        DateSpan::new(date(2023, 1, 1), date(2023, 1, 4)).unwrap(),
        Metric::Count,
        vec!["To Do".into(), "In Progress".into(), "Done".into()],
    )
    .as_of(far_future());
    let series = SnapshotSeriesBuilder::default()
        .build(&[status_walk()], &request)
        .unwrap();

    // Jan 1st 2023 is a Sunday.
    let dates: Vec<NaiveDate> = series.iter().map(|p| p.date()).collect();
    assert_eq!(dates, vec![date(2023, 1, 2), date(2023, 1, 3), date(2023, 1, 4)]);

    assert_eq!(series[0].value("In Progress"), Some(1.0));
    assert_eq!(series[0].value("Done"), Some(0.0));
    assert_eq!(series[1].value("Done"), Some(1.0));
    assert_eq!(series[2].value("Done"), Some(1.0));
    assert_eq!(series[2].value("To Do"), Some(0.0));
}

#[test]
fn test_empty_items_cover_requested_range() {
    let request = SeriesRequest::new(
        DateSpan::new(date(2023, 1, 2), date(2023, 1, 4)).unwrap(),
        Metric::Count,
        vec!["To Do".into()],
    )
    .as_of(far_future());
    let series = SnapshotSeriesBuilder::default().build(&[], &request).unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series[0].date(), date(2023, 1, 2));
    assert_eq!(series[2].date(), date(2023, 1, 4));
}

#[test]
fn test_story_points_follow_display_name_history() {
    let change_at = at("2023-01-03T10:00:00-08:00");
    let item = Item::builder("TEST-2", at("2023-01-01T08:00:00-08:00"))
        .status("Done")
        .field(STORY_POINTS_FIELD, 5)
        .change(ChangeEntry::new(change_at, "Story Points", "3", "5"))
        .change(ChangeEntry::new(change_at, STATUS_FIELD, "In Progress", "Done"))
        .build();

    let request = SeriesRequest::new(
        DateSpan::new(date(2023, 1, 2), date(2023, 1, 4)).unwrap(),
        Metric::parse(STORY_POINTS_FIELD),
        vec!["In Progress".into(), "Done".into()],
    )
    .as_of(far_future());
    let series = SnapshotSeriesBuilder::default().build(&[item], &request).unwrap();

    // 09:00 on the 3rd is still before the 10:00 change.
    assert_eq!(series[0].value("In Progress"), Some(3.0));
    assert_eq!(series[1].value("In Progress"), Some(3.0));
    assert_eq!(series[2].value("Done"), Some(5.0));
    assert_eq!(series[2].value("In Progress"), Some(0.0));
}

#[test]
fn test_count_totals_match_existing_items() {
    let items: Vec<Item> = (0..6)
        .map(|i| {
            Item::builder(format!("C-{i}"), Utc.with_ymd_and_hms(2024, 1, 1 + i, 0, 0, 0).unwrap())
                .status(if i % 2 == 0 { "Done" } else { "To Do" })
                .build()
        })
        .collect();
    let request = SeriesRequest::new(
        DateSpan::new(date(2024, 1, 1), date(2024, 1, 12)).unwrap(),
        Metric::Count,
        vec!["To Do".into(), "Done".into()],
    )
    .as_of(far_future());
    let series = SnapshotSeriesBuilder::default().build(&items, &request).unwrap();

    for point in &series {
        // Sampled at 17:00 UTC: every item created at or before midnight of that date exists.
        let existing = items
            .iter()
            .filter(|i| i.created().date_naive() <= point.date())
            .count();
        #[allow(clippy::cast_precision_loss)]
        let expected = existing as f64;
        assert!((point.total() - expected).abs() < 1e-9, "{}", point.date());
    }
}

#[test]
fn test_aliases_come_from_configuration() {
    let config = BurnupConfig {
        fields: burnup::FieldAliases::empty(),
        ..BurnupConfig::default()
    };
    let change_at = at("2023-01-03T10:00:00-08:00");
    let item = Item::builder("TEST-3", at("2023-01-01T08:00:00-08:00"))
        .status("Done")
        .field(STORY_POINTS_FIELD, 5)
        .change(ChangeEntry::new(change_at, "Story Points", "3", "5"))
        .build();

    // Without the alias the display-name entry is not recognised.
    let without = HistoryReconstructor::new(config.fields.clone());
    let before = at("2023-01-02T09:00:00-08:00");
    assert_eq!(
        without.value_at(&item, STORY_POINTS_FIELD, before).as_number(),
        Some(5.0)
    );
    let with = HistoryReconstructor::default();
    assert_eq!(with.value_at(&item, STORY_POINTS_FIELD, before).as_number(), Some(3.0));
}

#[test]
fn test_discovered_statuses_merge_into_catalog() {
    let mut catalog = StatusCatalog::default();
    let discovered = extract_all_statuses(&[status_walk()]);
    assert_eq!(discovered, vec!["Done", "In Progress", "To Do"]);
    assert_eq!(catalog.merge_discovered(&discovered), 3);
    assert_eq!(catalog.merge_discovered(&discovered), 0);
    assert_eq!(catalog.enabled_statuses(), vec!["Done", "In Progress", "To Do"]);
}
