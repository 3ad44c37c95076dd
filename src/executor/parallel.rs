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

//! Parallel strategy: every host at once, output merged in host-list order.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::output::{write_banner, OutputSink};
use super::progress::HostProgress;
use super::result_types::RunSummary;
use super::scratch::ScratchDir;
use super::session::{supervise, SessionFactory};
use super::RunError;
use crate::host::Host;
use crate::manager::{Event, EventKind, HostOutcome, Manager};

/// A host's capture file inside the scratch directory.
struct HostCapture {
    id: String,
    path: PathBuf,
    sink: OutputSink,
}

/// Runs all hosts concurrently, each into its own scratch file.
pub struct ParallelExecutor {
    hosts: Vec<Host>,
    command: String,
    output: OutputSink,
    tmp_root: PathBuf,
    host_timeout: Option<Duration>,
}

impl ParallelExecutor {
    pub fn new(
        hosts: Vec<Host>,
        command: impl Into<String>,
        output: OutputSink,
        tmp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hosts,
            command: command.into(),
            output,
            tmp_root: tmp_root.into(),
            host_timeout: None,
        }
    }

    /// Give up on a host whose session runs longer than `timeout`.
    ///
    /// Without it, a session that never reports `End` keeps the run waiting
    /// forever.
    pub fn with_host_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.host_timeout = timeout;
        self
    }

    /// Run every host concurrently and merge their output.
    ///
    /// Each session writes to `<tmp_root>/.run.<nanos>/<host>`. Sessions
    /// announce themselves with `Begin`; the banner goes into their file and
    /// they are answered `Continue`. Once every host reported `End`, the
    /// files are appended to the output in host-list order and deleted.
    ///
    /// Cancelling `cancel` aborts all sessions, removes the scratch directory
    /// and returns [`RunError::Interrupted`].
    pub async fn run(
        &self,
        factory: &dyn SessionFactory,
        cancel: CancellationToken,
    ) -> Result<RunSummary, RunError> {
        check_unique(&self.hosts)?;

        let scratch = ScratchDir::create(&self.tmp_root).await?;
        let manager = Arc::new(Manager::new());
        let mut tasks = JoinSet::new();

        let captures = match self
            .launch(factory, scratch.path(), &manager, &mut tasks)
            .await
        {
            Ok(captures) => captures,
            Err(e) => {
                tasks.abort_all();
                scratch.remove().await;
                return Err(e);
            }
        };

        let run = async {
            let outcomes = self.collect(&manager, &captures).await;

            // Sessions are done writing once they reported End; wait for the
            // tasks themselves so no handle outlives the merge.
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!("Session task failed: {}", e);
                }
            }

            self.merge(&captures).await?;

            let mut summary = RunSummary::default();
            for (capture, outcome) in captures.iter().zip(outcomes) {
                summary.record(
                    capture.id.clone(),
                    outcome.unwrap_or_else(|| HostOutcome::failed("no End reported")),
                );
            }
            Ok::<_, RunError>(summary)
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!("Run interrupted, discarding captured output");
                Err(RunError::Interrupted)
            }
            result = run => result,
        };

        tasks.abort_all();
        scratch.remove().await;
        result
    }

    async fn launch(
        &self,
        factory: &dyn SessionFactory,
        dir: &Path,
        manager: &Arc<Manager>,
        tasks: &mut JoinSet<()>,
    ) -> Result<Vec<HostCapture>, RunError> {
        let mut captures = Vec::with_capacity(self.hosts.len());
        for host in &self.hosts {
            let path = dir.join(host.file_name());
            let sink = OutputSink::create_file(&path)
                .await
                .map_err(|source| RunError::TempFile {
                    host: host.id.clone(),
                    path: path.clone(),
                    source,
                })?;

            let link = manager.register(&host.id);
            let notifier = link.end_notifier();
            let session = factory.create(host, &self.command, sink.clone(), link);
            tasks.spawn(supervise(session, notifier, sink.clone(), self.host_timeout));
            tracing::debug!("Launched session for {}", host);

            captures.push(HostCapture {
                id: host.id.clone(),
                path,
                sink,
            });
        }
        Ok(captures)
    }

    /// Answer `Begin`s and count `End`s until every host has ended.
    async fn collect(
        &self,
        manager: &Manager,
        captures: &[HostCapture],
    ) -> Vec<Option<HostOutcome>> {
        let index: HashMap<&str, usize> = captures
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();
        let progress = HostProgress::for_output(&self.output, captures.len());
        let color = self.output.is_console();
        let mut outcomes: Vec<Option<HostOutcome>> = vec![None; captures.len()];
        let mut remaining = captures.len();

        while remaining > 0 {
            let event = match manager.receive(None).await {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Event bus failed with {} hosts outstanding: {}", remaining, e);
                    break;
                }
            };
            let Some(&i) = event.from.host_id().and_then(|id| index.get(id)) else {
                tracing::trace!("Ignoring event from unknown peer {}", event.from);
                continue;
            };

            match event.kind {
                EventKind::Begin => {
                    if outcomes[i].is_some() {
                        continue;
                    }
                    write_banner(&captures[i].sink, &captures[i].id, color).await;
                    let reply = Event::from_controller(EventKind::Continue);
                    if let Err(e) = manager.send(&event.from, reply) {
                        tracing::warn!("Failed to admit {}: {}", event.from, e);
                    }
                }
                EventKind::End(outcome) => {
                    if outcomes[i].is_some() {
                        tracing::warn!("Duplicate End from {}", event.from);
                        continue;
                    }
                    tracing::debug!("{} ended: {:?}", event.from, outcome);
                    progress.advance(&captures[i].id);
                    outcomes[i] = Some(outcome);
                    remaining -= 1;
                }
                other => tracing::trace!("Ignoring {:?} from {}", other, event.from),
            }
        }

        progress.finish();
        outcomes
    }

    /// Close every capture file, then append them to the output in
    /// host-list order, deleting each once copied.
    async fn merge(&self, captures: &[HostCapture]) -> Result<(), RunError> {
        for capture in captures {
            if let Err(e) = capture.sink.shutdown().await {
                tracing::warn!("Failed to close capture for {}: {}", capture.id, e);
            }
        }

        for capture in captures {
            let mut file = tokio::fs::File::open(&capture.path)
                .await
                .map_err(RunError::Output)?;
            self.output
                .copy_from(&mut file)
                .await
                .map_err(RunError::Output)?;
            drop(file);
            if let Err(e) = tokio::fs::remove_file(&capture.path).await {
                tracing::warn!("Failed to remove capture {:?}: {}", capture.path, e);
            }
        }

        self.output.flush().await.map_err(RunError::Output)
    }
}

/// Host ids and scratch file names must both be unique.
fn check_unique(hosts: &[Host]) -> Result<(), RunError> {
    let mut seen = HashSet::new();
    for host in hosts {
        if !seen.insert(host.file_name()) {
            return Err(RunError::DuplicateHost(host.id.clone(), host.file_name()));
        }
    }
    Ok(())
}

/// Build a [`ParallelExecutor`] from run configuration and run it.
pub async fn run_parallel(
    config: &crate::config::RunConfig,
    hosts: Vec<Host>,
    factory: &dyn SessionFactory,
    cancel: CancellationToken,
) -> Result<RunSummary, RunError> {
    ParallelExecutor::new(
        hosts,
        config.formatted_command(),
        config.output.clone(),
        config.tmp_root.clone(),
    )
    .with_host_timeout(config.host_timeout)
    .run(factory, cancel)
    .await
}
