// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Thin HTTP client for the event store: table lifecycle, property
//! declarations, and the streaming write handle the forwarder pushes to.
//! Store-side failures are surfaced, never retried here.

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::SinkError;
use crate::forwarder::EventSink;
use crate::record::SessionEvent;

/// Data types accepted for a table property declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
}

impl PropertyType {
    fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Table {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SkyClient {
    http: reqwest::Client,
    base_url: String,
}

impl SkyClient {
    pub fn new(base_url: &str) -> Result<Self, SinkError> {
        Ok(SkyClient {
            http: reqwest::Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch a table by name; `None` when the store does not know it.
    pub async fn get_table(&self, name: &str) -> Result<Option<Table>, SinkError> {
        let url = format!("{}/tables/{name}", self.base_url);
        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, format!("get table {name}"))?;
        Ok(Some(response.json::<Table>().await?))
    }

    /// Delete a table if it exists; an absent table is not an error.
    pub async fn delete_table(&self, name: &str) -> Result<(), SinkError> {
        let url = format!("{}/tables/{name}", self.base_url);
        let response = self.http.delete(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response, format!("delete table {name}"))?;
        debug!("Deleted table {name}");
        Ok(())
    }

    pub async fn create_table(&self, name: &str) -> Result<(), SinkError> {
        let url = format!("{}/tables", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        check_status(response, format!("create table {name}"))?;
        debug!("Created table {name}");
        Ok(())
    }

    /// Declare a named property on a table.
    pub async fn create_property(
        &self,
        table: &str,
        name: &str,
        transient: bool,
        data_type: PropertyType,
    ) -> Result<(), SinkError> {
        let url = format!("{}/tables/{table}/properties", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "name": name,
                "transient": transient,
                "dataType": data_type.as_str(),
            }))
            .send()
            .await?;
        check_status(response, format!("create property {name} on {table}"))?;
        Ok(())
    }

    /// Open a streaming write handle on a table.
    pub fn stream(&self, table: &str) -> SkyStream {
        SkyStream {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            table: table.to_string(),
        }
    }
}

/// Streaming write handle: one call per (object-id, event) pair.
#[derive(Debug, Clone)]
pub struct SkyStream {
    http: reqwest::Client,
    base_url: String,
    table: String,
}

#[async_trait]
impl EventSink for SkyStream {
    async fn append(&self, event: &SessionEvent) -> Result<(), SinkError> {
        let url = format!(
            "{}/tables/{}/objects/{}/events",
            self.base_url, self.table, event.object_id
        );
        let body = json!({
            "timestamp": event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            "data": event.properties.to_data_map(),
        });
        let response = self.http.patch(&url).json(&body).send().await?;
        check_status(
            response,
            format!("append event for object {}", event.object_id),
        )?;
        Ok(())
    }
}

fn check_status(
    response: reqwest::Response,
    operation: String,
) -> Result<reqwest::Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SinkError::UnexpectedStatus { status, operation })
    }
}
