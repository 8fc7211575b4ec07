//! Background forecast runtime, driven through the public API.

use std::time::Duration;

use burnup::{
    ForecastConfig, ForecastProjector, ForecastRequest, ForecastRuntime, ForecastRuntimeConfig,
    SeedStrategy, SnapshotPoint, StatusCatalog, StatusCategory, StatusDefinition,
};
use chrono::NaiveDate;

fn request(trials: usize) -> ForecastRequest {
    let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
    let series = vec![
        SnapshotPoint::from_pairs(d(1), [("Done", 0.0), ("Todo", 500.0)]),
        SnapshotPoint::from_pairs(d(2), [("Done", 1.0), ("Todo", 499.0)]),
        SnapshotPoint::from_pairs(d(3), [("Done", 1.0), ("Todo", 499.0)]),
        SnapshotPoint::from_pairs(d(4), [("Done", 3.0), ("Todo", 497.0)]),
    ];
    let statuses = StatusCatalog::new(vec![
        StatusDefinition::new("Todo", StatusCategory::NotStarted),
        StatusDefinition::new("Done", StatusCategory::Done),
    ]);
    let config = ForecastConfig {
        show_confidence: true,
        trials,
        seed: SeedStrategy::Stable,
        ..ForecastConfig::default()
    };
    ForecastRequest::new(series, config, statuses)
}

#[test]
fn test_background_result_matches_inline() {
    let runtime = ForecastRuntime::new(ForecastProjector::default(), ForecastRuntimeConfig::default()).unwrap();
    let background = runtime
        .submit(request(500))
        .unwrap()
        .join_timeout(Duration::from_secs(30))
        .unwrap();
    let inline = ForecastProjector::default().project(&request(500)).unwrap();
    assert_eq!(background, inline);
    assert!(background.unwrap().simulation_results.is_some());
}

#[test]
fn test_concurrent_submissions_complete() {
    let runtime = ForecastRuntime::new(
        ForecastProjector::default(),
        ForecastRuntimeConfig {
            workers: 3,
            queue_capacity: 16,
        },
    )
    .unwrap();
    let handles: Vec<_> = (0..8).map(|_| runtime.submit(request(200)).unwrap()).collect();
    for handle in handles {
        let result = handle.join_timeout(Duration::from_secs(30)).unwrap();
        assert!(result.is_some());
    }
}

#[test]
fn test_latest_superseding_submission_wins() {
    let runtime = ForecastRuntime::new(
        ForecastProjector::default(),
        ForecastRuntimeConfig {
            workers: 1,
            queue_capacity: 16,
        },
    )
    .unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| runtime.submit_superseding(request(100_000)).unwrap())
        .collect();
    let (last, stale) = handles.split_last().unwrap();
    assert!(stale.iter().all(burnup::ForecastHandle::is_cancelled));
    assert!(!last.is_cancelled());
    last.cancel();

    for handle in handles {
        let err = handle.join_timeout(Duration::from_secs(60)).unwrap_err();
        assert!(err.is_cancelled());
    }
}

#[test]
fn test_invalid_request_reports_validation_error() {
    let runtime = ForecastRuntime::new(ForecastProjector::default(), ForecastRuntimeConfig::default()).unwrap();
    let err = runtime.project(request(1)).unwrap_err();
    assert!(err.is_validation());
}
