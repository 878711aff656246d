// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! File follower backed by an external "tail from start, keep following"
//! helper process. The helper is invoked with two positional arguments, the
//! literal `true` (follow from the beginning) and the target path, and its
//! stdout is consumed line-by-line.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::errors::FollowError;

pub struct Follower {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    cancel: CancellationToken,
}

impl Follower {
    /// Spawn the follow helper against `source`. The returned follower owns
    /// the child process; [`Follower::shutdown`] terminates it.
    pub fn spawn(
        helper: &Path,
        source: &Path,
        cancel: CancellationToken,
    ) -> Result<Self, FollowError> {
        let mut child = Command::new(helper)
            .arg("true")
            .arg(source)
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(FollowError::Spawn)?;

        let stdout = child.stdout.take().ok_or(FollowError::StdoutCapture)?;
        debug!("Spawned follow helper {:?} for {:?}", helper, source);

        Ok(Follower {
            child,
            lines: BufReader::new(stdout).lines(),
            cancel,
        })
    }

    /// Next line from the helper's stdout. Returns `Ok(None)` when shutdown
    /// has begun or the helper closed its output; a read error is fatal to
    /// the pipeline.
    pub async fn next_line(&mut self) -> Result<Option<String>, FollowError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Ok(None),
            line = self.lines.next_line() => line.map_err(FollowError::Read),
        }
    }

    /// Terminate the helper process. Called only after the forwarder has
    /// finished draining.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            error!("Failed to kill follow helper: {e}");
        } else {
            debug!("Follow helper terminated");
        }
    }
}
