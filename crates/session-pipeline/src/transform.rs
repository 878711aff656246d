// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Line-to-event transformation.
//!
//! Maps one raw log line to zero or one [`SessionEvent`]. Every failure here
//! is line-scoped: malformed JSON, an unparsable URI, or a missing session
//! token drops that single line and the ingestion loop keeps going.

use std::collections::HashMap;

use tracing::{debug, error};
use url::Url;

use crate::record::{AccessRecord, SessionEvent, SessionProperties};

/// Query parameter carrying the session token.
const SESSION_TOKEN_KEY: &str = "su";

/// Placeholder value some clients send when no session token exists.
const UNDEFINED_TOKEN: &str = "undefined";

/// Extract a session event from one raw line, or `None` when the line does
/// not qualify. Never fails past the current line.
pub fn session_event_from_line(line: &str) -> Option<SessionEvent> {
    let record: AccessRecord = match serde_json::from_str(line.trim_end_matches('\n')) {
        Ok(record) => record,
        Err(e) => {
            error!("Error parsing JSON: {e}");
            return None;
        }
    };

    // Access-log uri fields are often request paths without a scheme; those
    // fail absolute parsing, so fall back to the raw query component.
    let query = match Url::parse(&record.uri) {
        Ok(uri) => uri.query().map(str::to_string),
        Err(url::ParseError::RelativeUrlWithoutBase) => relative_query(&record.uri),
        Err(e) => {
            debug!("Dropping line with unparsable uri {:?}: {e}", record.uri);
            return None;
        }
    };
    let Some(query) = query else {
        return None;
    };

    // First occurrence wins for repeated query keys.
    let mut params: HashMap<String, String> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }

    let session_token = match params.get(SESSION_TOKEN_KEY) {
        Some(token) if !token.is_empty() && token != UNDEFINED_TOKEN => token.clone(),
        _ => return None,
    };

    let properties = SessionProperties {
        event_id: record.event_id,
        referrer: non_empty(record.referer),
        kind: query_param(&params, "v"),
        engine: query_param(&params, "e"),
        query: query_param(&params, "q"),
        visit: query_param(&params, "vi"),
        uniq: query_param(&params, "uq"),
        uniq_token: query_param(&params, "su"),
        visit_token: query_param(&params, "sv"),
    };

    Some(SessionEvent {
        object_id: session_token,
        timestamp: record.event_timestamp,
        properties,
    })
}

/// Query component of a scheme-less URI, without any fragment.
fn relative_query(uri: &str) -> Option<String> {
    let (_, after) = uri.split_once('?')?;
    let query = after.split('#').next().unwrap_or(after);
    Some(query.to_string())
}

fn query_param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).cloned().and_then(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
