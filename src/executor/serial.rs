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

//! Serial strategy: one host at a time, in host-list order.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use super::output::{write_banner, OutputSink};
use super::progress::HostProgress;
use super::result_types::RunSummary;
use super::session::{supervise, SessionFactory};
use super::RunError;
use crate::host::Host;
use crate::manager::{Event, EventKind, HostOutcome, Manager, Peer};

/// How long a host's ready listener may keep running after its session
/// finished. The session's `End` is already queued by then, so the listener
/// normally exits immediately.
const LISTENER_GRACE: Duration = Duration::from_secs(1);

/// Runs hosts strictly one after another, all writing to one shared sink.
pub struct SerialExecutor {
    hosts: Vec<Host>,
    command: String,
    output: OutputSink,
    ready_timeout: Option<Duration>,
    host_timeout: Option<Duration>,
}

impl SerialExecutor {
    pub fn new(hosts: Vec<Host>, command: impl Into<String>, output: OutputSink) -> Self {
        Self {
            hosts,
            command: command.into(),
            output,
            ready_timeout: None,
            host_timeout: None,
        }
    }

    /// Answer `Stop` when a host has not announced itself within `timeout`.
    pub fn with_ready_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Give up on a host whose session runs longer than `timeout`.
    pub fn with_host_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.host_timeout = timeout;
        self
    }

    /// Run every host in order.
    ///
    /// For each host a listener task waits for the session's handshake,
    /// prints the banner and answers `Continue` (or `Stop` when the bus
    /// fails or the ready timeout elapses), while this task drives the
    /// session itself. The listener is joined before the next host starts.
    /// Host failures never fail the run.
    ///
    /// Cancelling `cancel` drops the session in flight, aborts its listener
    /// and returns [`RunError::Interrupted`]. The listener is also aborted if
    /// this future is dropped.
    pub async fn run(
        &self,
        factory: &dyn SessionFactory,
        cancel: CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let manager = Arc::new(Manager::new());
        let progress = HostProgress::for_output(&self.output, self.hosts.len());
        let color = self.output.is_console();
        let mut summary = RunSummary::default();

        for host in &self.hosts {
            tracing::debug!("Dispatching to {}", host);
            let link = manager.register(&host.id);
            let notifier = link.end_notifier();
            let session = factory.create(host, &self.command, self.output.clone(), link);

            let mut listener = AbortOnDropHandle::new(tokio::spawn(listen_for_ready(
                Arc::clone(&manager),
                host.id.clone(),
                self.output.clone(),
                color,
                self.ready_timeout,
            )));

            progress.advance(&host.id);
            let supervised = supervise(session, notifier, self.output.clone(), self.host_timeout);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!("Run interrupted while {} was running", host);
                    listener.abort();
                    let _ = (&mut listener).await;
                    progress.finish();
                    return Err(RunError::Interrupted);
                }
                _ = supervised => {}
            }

            let mut outcome = join_listener(listener, &host.id).await;
            for event in manager.drain().await {
                match event {
                    Event {
                        from: Peer::Host(ref id),
                        kind: EventKind::End(end),
                    } if *id == host.id => {
                        outcome.get_or_insert(end);
                    }
                    other => tracing::trace!("Discarding stale event {:?}", other),
                }
            }

            summary.record(
                host.id.clone(),
                outcome.unwrap_or_else(|| HostOutcome::failed("no End reported")),
            );
        }

        progress.finish();
        Ok(summary)
    }
}

/// Wait for `host`'s handshake and answer it.
///
/// Returns the host's outcome if it ended before ever announcing itself.
async fn listen_for_ready(
    manager: Arc<Manager>,
    host: String,
    output: OutputSink,
    color: bool,
    ready_timeout: Option<Duration>,
) -> Option<HostOutcome> {
    let target = Peer::host(&host);
    loop {
        let event = match manager.receive(ready_timeout).await {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("{} not ready: {}", host, e);
                reply(&manager, &target, EventKind::Stop);
                return None;
            }
        };

        if event.from != target {
            tracing::trace!("Listener for {} skipping event from {}", host, event.from);
            continue;
        }

        match event.kind {
            EventKind::End(outcome) => return Some(outcome),
            kind if kind.is_handshake() => {
                write_banner(&output, &host, color).await;
                reply(&manager, &target, EventKind::Continue);
                return None;
            }
            other => tracing::trace!("Listener for {} ignoring {:?}", host, other),
        }
    }
}

fn reply(manager: &Manager, target: &Peer, kind: EventKind) {
    if let Err(e) = manager.send(target, Event::from_controller(kind)) {
        tracing::warn!("Failed to answer {}: {}", target, e);
    }
}

async fn join_listener(
    mut listener: AbortOnDropHandle<Option<HostOutcome>>,
    host: &str,
) -> Option<HostOutcome> {
    match tokio::time::timeout(LISTENER_GRACE, &mut listener).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::warn!("Ready listener for {} failed: {}", host, e);
            None
        }
        Err(_) => {
            tracing::debug!("Cancelling ready listener for {}", host);
            listener.abort();
            let _ = listener.await;
            None
        }
    }
}

/// Build a [`SerialExecutor`] from run configuration and run it.
pub async fn run_serial(
    config: &crate::config::RunConfig,
    hosts: Vec<Host>,
    factory: &dyn SessionFactory,
    cancel: CancellationToken,
) -> Result<RunSummary, RunError> {
    SerialExecutor::new(hosts, config.formatted_command(), config.output.clone())
        .with_ready_timeout(config.ready_timeout)
        .with_host_timeout(config.host_timeout)
        .run(factory, cancel)
        .await
}
