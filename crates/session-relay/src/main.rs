// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use session_pipeline::config::RelayConfig;
use session_pipeline::pipeline::Pipeline;
use session_pipeline::record::property;
use session_pipeline::sky::{PropertyType, SkyClient};

#[tokio::main]
pub async fn main() {
    let log_level = env::var("RELAY_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("hyper=off,reqwest=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error creating config on session relay startup: {e}");
            return;
        }
    };

    let num_cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    info!("Detected {num_cpus} CPU(s)");

    if !config.source_file.exists() {
        error!(
            "Error getting follow file: no such file or directory: {:?}",
            config.source_file
        );
        return;
    }

    let client = match SkyClient::new(&config.sky_url) {
        Ok(client) => client,
        Err(e) => {
            error!("Error creating event store client: {e}");
            return;
        }
    };

    setup_schema(&client, &config.table_name).await;
    let sink = Arc::new(client.stream(&config.table_name));

    let mut pipeline = match Pipeline::start(&config, sink) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Error starting pipeline: {e}");
            return;
        }
    };

    watch_for_termination(pipeline.cancel_token());

    if let Err(e) = pipeline.ingest().await {
        error!("Pipeline ingestion failed: {e}");
    }

    if let Err(e) = pipeline.shutdown().await {
        error!("Pipeline shutdown reported an error: {e}");
    }
}

/// Recreate the table and declare its property schema. The store is a thin
/// collaborator here: failures are logged and the relay starts anyway.
async fn setup_schema(client: &SkyClient, table: &str) {
    if let Err(e) = client.delete_table(table).await {
        error!("Error deleting table {table}: {e}");
    }
    if let Err(e) = client.create_table(table).await {
        error!("Error creating table {table}: {e}");
    }
    match client.get_table(table).await {
        Ok(Some(_)) => debug!("Table {table} is ready"),
        Ok(None) => error!("Table {table} missing after creation"),
        Err(e) => error!("Error fetching table {table}: {e}"),
    }
    for name in property::ALL {
        if let Err(e) = client
            .create_property(table, name, true, PropertyType::String)
            .await
        {
            error!("Error creating property {name} on {table}: {e}");
        }
    }
}

/// Enter the Stopping state on SIGINT, SIGQUIT or SIGTERM by cancelling the
/// pipeline token.
fn watch_for_termination(cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut interrupt = match signal(SignalKind::interrupt()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to install SIGINT handler: {e}");
                return;
            }
        };
        let mut quit = match signal(SignalKind::quit()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to install SIGQUIT handler: {e}");
                return;
            }
        };
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                return;
            }
        };

        tokio::select! {
            _ = interrupt.recv() => info!("Received SIGINT, stopping"),
            _ = quit.recv() => info!("Received SIGQUIT, stopping"),
            _ = terminate.recv() => info!("Received SIGTERM, stopping"),
        }
        cancel.cancel();
    });
}
