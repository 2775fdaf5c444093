//! Event table filtering.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulseboard_core::event::{Event, ANCHOR_CLICK, LINK_CLICK, MODAL_OPEN};

/// Table filters selected in the dashboard. Every present field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// Exact event type.
    pub event_type: Option<String>,
    /// Case-insensitive substring of [`search_text`].
    pub keyword: Option<String>,
    /// `details.linkType` of link and anchor clicks.
    pub link_dest_type: Option<String>,
    /// Modal identifier of `modal_open` events.
    pub modal_id: Option<String>,
    /// Case-insensitive substring of the resolved project identifier.
    pub project_id_substring: Option<String>,
}

impl FilterCriteria {
    /// Drops blank fields; the UI sends `""` for "all".
    pub fn normalized(&self) -> Self {
        fn present(value: &Option<String>, trim: bool) -> Option<String> {
            let value = value.as_deref()?;
            if value.trim().is_empty() {
                return None;
            }
            Some(if trim { value.trim() } else { value }.to_string())
        }

        Self {
            event_type: present(&self.event_type, false),
            keyword: present(&self.keyword, true),
            link_dest_type: present(&self.link_dest_type, false),
            modal_id: present(&self.modal_id, false),
            project_id_substring: present(&self.project_id_substring, true),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized() == Self::default()
    }

    /// Whether `event` satisfies every criterion that is set. Expects
    /// normalized criteria.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref event_type) = self.event_type {
            if event.kind() != event_type {
                return false;
            }
        }
        if let Some(ref keyword) = self.keyword {
            if !contains_ignore_case(&search_text(event), keyword) {
                return false;
            }
        }
        if let Some(ref link_type) = self.link_dest_type {
            let is_link = matches!(event.kind(), LINK_CLICK | ANCHOR_CLICK);
            if !is_link || event.link_type().as_deref() != Some(link_type.as_str()) {
                return false;
            }
        }
        if let Some(ref modal_id) = self.modal_id {
            if event.kind() != MODAL_OPEN || event.modal_id().as_deref() != Some(modal_id.as_str())
            {
                return false;
            }
        }
        if let Some(ref needle) = self.project_id_substring {
            match event.project_id() {
                Some(project_id) if contains_ignore_case(&project_id, needle) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Returns the events matching `criteria`, most recent first.
///
/// Undated events sort last. The input is left untouched and the output
/// order is fully determined by the input order and timestamps.
pub fn filter_events(events: &[Event], criteria: &FilterCriteria) -> Vec<Event> {
    let criteria = criteria.normalized();
    let mut matched: Vec<(DateTime<Utc>, &Event)> = events
        .iter()
        .filter(|e| criteria.matches(e))
        .map(|e| (e.sort_time(), e))
        .collect();
    matched.sort_by(|a, b| b.0.cmp(&a.0));
    matched.into_iter().map(|(_, e)| e.clone()).collect()
}

/// Text the keyword filter searches: time, type, page, details and location.
pub fn search_text(event: &Event) -> String {
    let details = if event.details.is_empty() {
        String::new()
    } else {
        serde_json::to_string(&event.details).unwrap_or_default()
    };
    let location = event
        .location
        .as_ref()
        .and_then(|l| serde_json::to_string(l).ok())
        .unwrap_or_default();

    [
        event.raw_time_text(),
        event.kind().to_string(),
        event.page.clone().unwrap_or_default(),
        details,
        location,
    ]
    .join(" ")
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Distinct values offered by the dashboard's filter selects, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub event_types: Vec<String>,
    pub link_types: Vec<String>,
    pub modal_ids: Vec<String>,
    pub project_ids: Vec<String>,
}

pub fn filter_options(events: &[Event]) -> FilterOptions {
    let mut event_types = BTreeSet::new();
    let mut link_types = BTreeSet::new();
    let mut modal_ids = BTreeSet::new();
    let mut project_ids = BTreeSet::new();

    for event in events {
        event_types.insert(event.kind().to_string());
        match event.kind() {
            LINK_CLICK | ANCHOR_CLICK => {
                if let Some(link_type) = event.link_type() {
                    link_types.insert(link_type.into_owned());
                }
            }
            MODAL_OPEN => {
                if let Some(modal_id) = event.modal_id() {
                    modal_ids.insert(modal_id.into_owned());
                }
            }
            _ => {}
        }
        if let Some(project_id) = event.project_id() {
            project_ids.insert(project_id.into_owned());
        }
    }

    FilterOptions {
        event_types: event_types.into_iter().collect(),
        link_types: link_types.into_iter().collect(),
        modal_ids: modal_ids.into_iter().collect(),
        project_ids: project_ids.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fixture() -> Vec<Event> {
        serde_json::from_value(json!([
            { "type": "pageview", "receivedAt": "2024-01-01T10:00:00Z", "page": "https://site.dev/about" },
            { "type": "link_click", "receivedAt": "2024-01-03T10:00:00Z",
              "details": { "linkType": "external", "href": "https://GitHub.com/acme" } },
            { "type": "anchor_click", "receivedAt": "2024-01-02T10:00:00Z",
              "details": { "linkType": "anchor", "projectId": "Portfolio-Site" } },
            { "type": "modal_open", "timestamp": "2024-01-04T10:00:00Z",
              "details": { "modalId": "contact" } },
            { "type": "modal_open", "modalType": "legacy" },
            { "type": "pageview", "receivedAt": "garbage", "projectId": "weather-app" }
        ]))
        .unwrap()
    }

    fn times(events: &[Event]) -> Vec<String> {
        events.iter().map(|e| e.raw_time_text()).collect()
    }

    #[test]
    fn no_criteria_sorts_newest_first_with_undated_last() {
        let out = filter_events(&fixture(), &FilterCriteria::default());
        assert_eq!(
            times(&out),
            vec![
                "2024-01-04T10:00:00Z",
                "2024-01-03T10:00:00Z",
                "2024-01-02T10:00:00Z",
                "2024-01-01T10:00:00Z",
                "",
                "garbage",
            ]
        );
    }

    #[test]
    fn event_type_is_exact() {
        let criteria = FilterCriteria {
            event_type: Some("pageview".into()),
            ..Default::default()
        };
        assert_eq!(filter_events(&fixture(), &criteria).len(), 2);
        let criteria = FilterCriteria {
            event_type: Some("page".into()),
            ..Default::default()
        };
        assert!(filter_events(&fixture(), &criteria).is_empty());
    }

    #[test]
    fn keyword_searches_details_case_insensitively() {
        let criteria = FilterCriteria {
            keyword: Some("github.COM".into()),
            ..Default::default()
        };
        let out = filter_events(&fixture(), &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), "link_click");
    }

    #[test]
    fn link_dest_type_requires_click_type() {
        let criteria = FilterCriteria {
            link_dest_type: Some("anchor".into()),
            ..Default::default()
        };
        let out = filter_events(&fixture(), &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), "anchor_click");
    }

    #[test]
    fn modal_id_falls_back_to_legacy_fields() {
        let criteria = FilterCriteria {
            modal_id: Some("legacy".into()),
            ..Default::default()
        };
        assert_eq!(filter_events(&fixture(), &criteria).len(), 1);
    }

    #[test]
    fn type_gates_exclude_other_events_with_matching_details() {
        let evs: Vec<Event> = serde_json::from_value(json!([
            { "type": "pageview", "details": { "linkType": "anchor" } },
            { "type": "anchor_click", "details": { "linkType": "anchor" } },
            { "type": "button_click", "details": { "modalId": "legacy" } },
            { "type": "button_click", "modalId": "legacy" },
            { "type": "modal_open", "modalId": "legacy" }
        ]))
        .unwrap();

        let by_link = filter_events(
            &evs,
            &FilterCriteria {
                link_dest_type: Some("anchor".into()),
                ..Default::default()
            },
        );
        assert_eq!(by_link.len(), 1);
        assert_eq!(by_link[0].kind(), "anchor_click");

        let by_modal = filter_events(
            &evs,
            &FilterCriteria {
                modal_id: Some("legacy".into()),
                ..Default::default()
            },
        );
        assert_eq!(by_modal.len(), 1);
        assert_eq!(by_modal[0].kind(), "modal_open");
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let evs: Vec<Event> = serde_json::from_value(json!([
            { "type": "pageview", "receivedAt": "2024-01-01T10:00:00Z", "page": "/first" },
            { "type": "pageview", "receivedAt": "2024-01-02T10:00:00Z", "page": "/newest" },
            { "type": "pageview", "receivedAt": "2024-01-01T10:00:00Z", "page": "/second" },
            { "type": "pageview", "receivedAt": "2024-01-01T10:00:00Z", "page": "/third" }
        ]))
        .unwrap();
        let pages: Vec<_> = filter_events(&evs, &FilterCriteria::default())
            .into_iter()
            .filter_map(|e| e.page)
            .collect();
        assert_eq!(pages, vec!["/newest", "/first", "/second", "/third"]);
    }

    #[test]
    fn project_substring_uses_resolution_chain() {
        let criteria = FilterCriteria {
            project_id_substring: Some("portfolio".into()),
            ..Default::default()
        };
        let out = filter_events(&fixture(), &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), "anchor_click");
    }

    #[test]
    fn criteria_combine_with_and() {
        let criteria = FilterCriteria {
            event_type: Some("pageview".into()),
            keyword: Some("about".into()),
            ..Default::default()
        };
        let out = filter_events(&fixture(), &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].page.as_deref(), Some("https://site.dev/about"));
    }

    #[test]
    fn blank_criteria_are_ignored() {
        let criteria = FilterCriteria {
            event_type: Some(String::new()),
            keyword: Some("   ".into()),
            ..Default::default()
        };
        assert!(criteria.is_empty());
        assert_eq!(filter_events(&fixture(), &criteria).len(), fixture().len());
    }

    #[test]
    fn criteria_deserialize_from_camel_case() {
        let criteria: FilterCriteria =
            serde_json::from_value(json!({ "eventType": "modal_open", "projectIdSubstring": "x" }))
                .unwrap();
        assert_eq!(criteria.event_type.as_deref(), Some("modal_open"));
        assert_eq!(criteria.project_id_substring.as_deref(), Some("x"));
        assert_eq!(criteria.keyword, None);
    }

    #[test]
    fn options_list_distinct_sorted_values() {
        let options = filter_options(&fixture());
        assert_eq!(
            options.event_types,
            vec!["anchor_click", "link_click", "modal_open", "pageview"]
        );
        assert_eq!(options.link_types, vec!["anchor", "external"]);
        assert_eq!(options.modal_ids, vec!["contact", "legacy"]);
        assert_eq!(options.project_ids, vec!["Portfolio-Site", "weather-app"]);
    }
}
