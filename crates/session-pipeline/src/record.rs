// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Data model for the ingestion pipeline.
//!
//! An [`AccessRecord`] is one decoded line of the followed access log. A
//! [`SessionEvent`] is the session-scoped event extracted from a qualifying
//! record, carrying a fixed-shape [`SessionProperties`] set that is only
//! flattened into the store's key/value map at the boundary call.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Store-side property names. The schema bootstrap declares exactly this set.
pub mod property {
    pub const EVENT_ID: &str = "event_id";
    pub const KIND: &str = "kind";
    pub const ENGINE: &str = "engine";
    pub const QUERY: &str = "query";
    pub const REFERRER: &str = "referrer";
    pub const VISIT: &str = "visit";
    pub const UNIQ: &str = "uniq";
    pub const UNIQ_TOKEN: &str = "uniqToken";
    pub const VISIT_TOKEN: &str = "visitToken";

    pub const ALL: [&str; 9] = [
        EVENT_ID,
        KIND,
        ENGINE,
        QUERY,
        REFERRER,
        VISIT,
        UNIQ,
        UNIQ_TOKEN,
        VISIT_TOKEN,
    ];
}

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// One decoded line of the followed access log. Missing string fields decode
/// to empty strings and a missing timestamp decodes to the epoch, so a sparse
/// line still yields a record.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessRecord {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub referer: String,
    #[serde(default = "epoch")]
    pub event_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub uri: String,
}

/// Fixed-shape property set for a session event. `event_id` is always
/// carried; every other slot is present only when the source query parameter
/// or referrer field was non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProperties {
    pub event_id: String,
    pub referrer: Option<String>,
    pub kind: Option<String>,
    pub engine: Option<String>,
    pub query: Option<String>,
    pub visit: Option<String>,
    pub uniq: Option<String>,
    pub uniq_token: Option<String>,
    pub visit_token: Option<String>,
}

impl SessionProperties {
    /// Flatten into the store's key/value shape, omitting unset slots.
    pub fn to_data_map(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(
            property::EVENT_ID.to_string(),
            Value::String(self.event_id.clone()),
        );

        let optional = [
            (property::REFERRER, &self.referrer),
            (property::KIND, &self.kind),
            (property::ENGINE, &self.engine),
            (property::QUERY, &self.query),
            (property::VISIT, &self.visit),
            (property::UNIQ, &self.uniq),
            (property::UNIQ_TOKEN, &self.uniq_token),
            (property::VISIT_TOKEN, &self.visit_token),
        ];
        for (name, slot) in optional {
            if let Some(value) = slot {
                data.insert(name.to_string(), Value::String(value.clone()));
            }
        }
        data
    }
}

/// A session-scoped event bound for the store, keyed by the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub object_id: String,
    pub timestamp: DateTime<Utc>,
    pub properties: SessionProperties,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_map_always_carries_event_id() {
        let props = SessionProperties {
            event_id: "e1".to_string(),
            ..Default::default()
        };
        let data = props.to_data_map();
        assert_eq!(data.len(), 1);
        assert_eq!(data["event_id"], "e1");
    }

    #[test]
    fn test_data_map_omits_unset_slots() {
        let props = SessionProperties {
            event_id: "e1".to_string(),
            kind: Some("page".to_string()),
            uniq_token: Some("tok1".to_string()),
            ..Default::default()
        };
        let data = props.to_data_map();
        assert_eq!(data.len(), 3);
        assert_eq!(data["kind"], "page");
        assert_eq!(data["uniqToken"], "tok1");
        assert!(!data.contains_key("engine"));
        assert!(!data.contains_key("referrer"));
    }

    #[test]
    fn test_data_map_uses_store_side_names() {
        let props = SessionProperties {
            event_id: "e1".to_string(),
            referrer: Some("http://ref".to_string()),
            kind: Some("k".to_string()),
            engine: Some("g".to_string()),
            query: Some("q".to_string()),
            visit: Some("vi".to_string()),
            uniq: Some("uq".to_string()),
            uniq_token: Some("su".to_string()),
            visit_token: Some("sv".to_string()),
        };
        let data = props.to_data_map();
        for name in property::ALL {
            assert!(data.contains_key(name), "missing property {name}");
        }
        assert_eq!(data.len(), property::ALL.len());
    }

    #[test]
    fn test_access_record_defaults() {
        let record: AccessRecord = serde_json::from_str(r#"{"event_id":"e1"}"#)
            .expect("record should decode");
        assert_eq!(record.event_id, "e1");
        assert_eq!(record.referer, "");
        assert_eq!(record.uri, "");
        assert_eq!(record.event_timestamp, DateTime::UNIX_EPOCH);
    }
}
