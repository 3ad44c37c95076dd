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

//! The contract between controllers and per-host sessions.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use super::output::OutputSink;
use crate::host::Host;
use crate::manager::{EndNotifier, HostLink, HostOutcome};

/// One host's unit of work.
///
/// `work` drives the whole lifecycle: connect, announce itself with
/// `Begin` (or `Ready`) through its [`HostLink`], wait for `Continue` or
/// `Stop`, run the command while streaming to its sink, and report exactly
/// one `End`. Nothing may be written to the sink after `End`.
#[async_trait]
pub trait SessionExecutor: Send {
    async fn work(self: Box<Self>) -> anyhow::Result<()>;
}

/// Builds the session for each host of a run.
pub trait SessionFactory: Send + Sync {
    fn create(
        &self,
        host: &Host,
        command: &str,
        output: OutputSink,
        link: HostLink,
    ) -> Box<dyn SessionExecutor>;
}

/// Run `session` and make sure its host reports `End` exactly once.
///
/// If the session returns, fails or panics without reporting `End`, or
/// outlives `timeout`, an `End(Failed)` is reported on its behalf. A
/// session dropped on timeout can no longer write, so a note is appended to
/// its sink first, unless it had already ended.
pub(crate) async fn supervise(
    session: Box<dyn SessionExecutor>,
    notifier: EndNotifier,
    output: OutputSink,
    timeout: Option<Duration>,
) {
    let work = AssertUnwindSafe(session.work()).catch_unwind();
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", notifier.host(), limit);
                if !notifier.has_ended() {
                    let note = format!("sesh: {} timed out after {:?}\n", notifier.host(), limit);
                    let _ = output.write_all(note.as_bytes()).await;
                    notifier.end(HostOutcome::failed(format!("timed out after {limit:?}")));
                }
                return;
            }
        },
        None => work.await,
    };

    match result {
        Ok(Ok(())) => {
            if !notifier.has_ended() {
                tracing::warn!("{} finished without reporting End", notifier.host());
                notifier.end(HostOutcome::failed("session finished without reporting End"));
            }
        }
        Ok(Err(e)) => {
            tracing::warn!("{} failed: {:#}", notifier.host(), e);
            if !notifier.has_ended() {
                let note = format!("sesh: {}: {:#}\n", notifier.host(), e);
                let _ = output.write_all(note.as_bytes()).await;
                notifier.end(HostOutcome::failed(format!("{e:#}")));
            }
        }
        Err(_) => {
            tracing::warn!("{} session panicked", notifier.host());
            notifier.end(HostOutcome::failed("session panicked"));
        }
    }
}
