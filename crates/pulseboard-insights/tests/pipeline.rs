use serde_json::json;

use pulseboard_core::{config::DashboardConfig, event::Event};
use pulseboard_insights::{
    aggregate,
    aggregate::{identity_label, required_key, ChartSeries},
    filter_events,
    summary::CountryCount,
    summarize, FilterCriteria, Summary,
};

fn worked_example() -> Vec<Event> {
    serde_json::from_value(json!([
        { "type": "pageview", "receivedAt": "2024-01-01T10:00:00Z", "location": { "country": "US" } },
        { "type": "pageview", "receivedAt": "2024-01-01T11:00:00Z", "location": { "country": "US" } },
        { "type": "pageview", "receivedAt": "2024-01-02T09:00:00Z", "location": { "country": "FR" } },
        { "type": "link_click", "receivedAt": "2024-01-02T09:05:00Z", "details": { "linkType": "external" } }
    ]))
    .expect("fixture")
}

fn mixed_events() -> Vec<Event> {
    serde_json::from_value(json!([
        { "type": "pageview", "receivedAt": "2024-03-01T08:00:00Z", "page": "https://me.dev/x", "projectId": "alpha" },
        { "type": "link_click", "receivedAt": "2024-03-02T08:00:00Z", "details": { "linkType": "github", "projectId": "beta" } },
        { "type": "pageview", "receivedAt": "2024-03-03T08:00:00Z", "page": "https://me.dev/y" },
        { "type": "modal_open", "details": { "modalId": "alpha-demo", "context": "alpha" } },
        { "type": "pageview", "timestamp": "2024-02-28T08:00:00Z", "page": "https://me.dev/x" },
        { "type": "anchor_click", "receivedAt": 1709280000000_i64, "details": { "linkType": "anchor", "trackId": "gamma" } },
        { "page": "https://me.dev/z" },
        { "type": "link_click", "details": { "linkType": "github" } },
        { "type": "pageview", "receivedAt": "bogus", "page": "https://me.dev/x" }
    ]))
    .expect("fixture")
}

fn by_kind(events: &[Event], limit: usize) -> ChartSeries {
    aggregate(events, |_| true, |e| Ok(e.kind().to_string()), identity_label, limit)
}

#[test]
fn worked_example_summary() {
    let summary = summarize(&worked_example(), &DashboardConfig::default());
    assert_eq!(summary.total_pageviews, 3);
    assert_eq!(summary.unique_day_count, 2);
    assert_eq!(
        summary.top_country,
        Some(CountryCount {
            name: "US".to_string(),
            count: 2
        })
    );
    assert_eq!(summary.top_referrer_domain, None);
}

#[test]
fn worked_example_link_chart() {
    let series = aggregate(
        &worked_example(),
        |e| e.kind() == "link_click",
        |e| required_key(e.link_type()),
        |l| Ok(l.to_uppercase()),
        5,
    );
    assert_eq!(series.labels, vec!["EXTERNAL"]);
    assert_eq!(series.counts, vec![1]);
}

#[test]
fn aggregate_is_deterministic() {
    let events = mixed_events();
    assert_eq!(by_kind(&events, 3), by_kind(&events, 3));
}

#[test]
fn aggregate_respects_limit_and_ordering() {
    let events = mixed_events();
    let distinct = 5; // pageview, link_click, modal_open, anchor_click, Unknown
    for limit in 0..8 {
        let series = by_kind(&events, limit);
        assert_eq!(series.len(), limit.min(distinct), "limit {limit}");
        assert_eq!(series.labels.len(), series.counts.len());
        assert!(series.counts.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn filter_and_is_a_subset() {
    let events = mixed_events();
    let broad = filter_events(
        &events,
        &FilterCriteria {
            event_type: Some("pageview".into()),
            ..Default::default()
        },
    );
    let narrow = filter_events(
        &events,
        &FilterCriteria {
            event_type: Some("pageview".into()),
            keyword: Some("me.dev/x".into()),
            ..Default::default()
        },
    );
    assert_eq!(broad.len(), 4);
    assert_eq!(narrow.len(), 3);
    assert!(narrow.iter().all(|e| broad.contains(e)));
}

#[test]
fn filter_leaves_input_untouched() {
    let events = mixed_events();
    let before = events.clone();
    let _ = filter_events(
        &events,
        &FilterCriteria {
            keyword: Some("alpha".into()),
            ..Default::default()
        },
    );
    assert_eq!(events, before);
}

#[test]
fn filter_orders_newest_first() {
    let out = filter_events(&mixed_events(), &FilterCriteria::default());
    let times: Vec<_> = out.iter().map(Event::sort_time).collect();
    assert!(times.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(out[0].kind(), "pageview");
    assert_eq!(out[0].page.as_deref(), Some("https://me.dev/y"));
}

#[test]
fn summary_is_idempotent() {
    let events = mixed_events();
    let cfg = DashboardConfig::default();
    assert_eq!(summarize(&events, &cfg), summarize(&events, &cfg));
}

#[test]
fn empty_input_everywhere() {
    assert_eq!(by_kind(&[], 5), ChartSeries::empty());
    assert!(filter_events(&[], &FilterCriteria::default()).is_empty());
    assert_eq!(
        summarize(&[], &DashboardConfig::default()),
        Summary {
            total_pageviews: 0,
            unique_day_count: 0,
            top_country: None,
            top_referrer_domain: None,
        }
    );
}
