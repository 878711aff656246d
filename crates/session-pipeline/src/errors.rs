// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while spawning or reading from the external follow helper.
/// All of these are fatal to the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("failed to spawn follow helper: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("follow helper did not expose a stdout pipe")]
    StdoutCapture,

    #[error("error reading line from file: {0}")]
    Read(#[source] std::io::Error),
}

/// Errors raised by the event store client.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("event store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("event store returned {status} for {operation}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        operation: String,
    },
}

/// Errors raised while building the startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingEnv(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Umbrella error for pipeline startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("follow error: {0}")]
    Follow(#[from] FollowError),

    #[error("event store error: {0}")]
    Sink(#[from] SinkError),

    #[error("forwarder task failed: {0}")]
    ForwarderJoin(#[from] tokio::task::JoinError),
}
