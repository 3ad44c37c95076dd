// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::executor::{run_parallel, run_serial, RunError, RunSummary, SessionFactory};
use crate::host::Host;

/// Run the configured command on `hosts`.
///
/// SIGINT and SIGTERM cancel the run: a parallel run removes its scratch
/// files first, a serial run stops its host in flight. Either way the
/// result is [`RunError::Interrupted`].
pub async fn execute_command(
    config: &RunConfig,
    hosts: Vec<Host>,
    parallel: bool,
    factory: &dyn SessionFactory,
) -> Result<RunSummary, RunError> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_signal(cancel.clone()));

    tracing::info!(
        "Running on {} host(s) {}",
        hosts.len(),
        if parallel { "in parallel" } else { "serially" }
    );

    let result = if parallel {
        run_parallel(config, hosts, factory, cancel).await
    } else {
        run_serial(config, hosts, factory, cancel).await
    };

    watcher.abort();
    result
}

/// Cancel `token` on the first interrupt or termination signal.
async fn cancel_on_signal(token: CancellationToken) {
    wait_for_signal().await;
    tracing::warn!("Received interrupt, cancelling run");
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
