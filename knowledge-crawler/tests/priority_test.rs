mod common;

use chrono::Duration;
use common::{candidate, hours_ago, now};
use knowledge_crawler::priority::tier_for_age;
use knowledge_crawler::{Priority, PriorityClassifier};

#[test]
fn test_age_boundaries() {
    let classifier = PriorityClassifier::default();
    let at = |age: Duration| classifier.classify(Some(now() - age), now());

    assert_eq!(at(Duration::hours(24)), Priority::High);
    assert_eq!(at(Duration::hours(24) - Duration::seconds(1)), Priority::Medium);
    assert_eq!(at(Duration::hours(48) - Duration::seconds(1)), Priority::High);
    assert_eq!(at(Duration::hours(48)), Priority::Medium);
    assert_eq!(at(Duration::hours(72) - Duration::seconds(1)), Priority::Medium);
    assert_eq!(at(Duration::hours(72)), Priority::Low);
    assert_eq!(at(Duration::days(10)), Priority::Low);
    assert_eq!(at(Duration::zero()), Priority::Medium);
}

#[test]
fn test_unknown_and_future_dates_are_low() {
    assert_eq!(tier_for_age(None), Priority::Low);
    assert_eq!(tier_for_age(Some(Duration::hours(-2))), Priority::Low);
}

#[test]
fn test_funding_tag_overrides_age() {
    let classifier = PriorityClassifier::default();
    let record = candidate("Series B", "https://example.com/b", "News", Some(now() - Duration::days(10)))
        .with_tags(["funding"]);

    assert_eq!(classifier.classify_record(&record, now()), Priority::High);
}

#[test]
fn test_breakthrough_tag_overrides_unknown_date() {
    let classifier = PriorityClassifier::default();
    let record = candidate("Result", "https://example.com/r", "News", None).with_tags(["Breakthrough"]);

    assert_eq!(classifier.classify_record(&record, now()), Priority::High);
}

#[test]
fn test_untagged_record_uses_age() {
    let classifier = PriorityClassifier::default();
    let record = candidate("Paper", "https://example.com/p", "arXiv", Some(hours_ago(30))).with_tags(["research"]);

    assert_eq!(classifier.classify_record(&record, now()), Priority::High);
}

#[test]
fn test_custom_markers() {
    let classifier = PriorityClassifier::new(["launch"]);
    let funding = candidate("Raise", "https://example.com/f", "News", None).with_tags(["funding"]);
    let launch = candidate("Launch", "https://example.com/l", "News", None).with_tags(["launch"]);

    assert_eq!(classifier.override_markers(), &["launch".to_string()]);
    assert_eq!(classifier.classify_record(&funding, now()), Priority::Low);
    assert_eq!(classifier.classify_record(&launch, now()), Priority::High);
}
