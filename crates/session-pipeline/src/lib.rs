// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Session ingestion pipeline.
//!
//! Continuously follows an append-only access log through an external
//! "tail from start, keep following" helper, extracts session-scoped events
//! from each new line, and forwards them to an external event store in
//! strict line order. Line-scoped problems (malformed JSON, missing session
//! token) are logged and dropped; follower or forwarder failures stop the
//! whole pipeline through an ordered shutdown.

pub mod config;
pub mod errors;
pub mod follower;
pub mod forwarder;
pub mod pipeline;
pub mod record;
pub mod sky;
pub mod transform;
