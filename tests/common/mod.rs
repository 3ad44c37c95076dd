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

//! Scripted session doubles for controller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sesh::executor::{OutputSink, SessionExecutor, SessionFactory};
use sesh::host::Host;
use sesh::manager::{Admission, EventKind, HostLink, HostOutcome};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted host does once created.
#[derive(Debug, Clone)]
pub enum Script {
    /// Announce with `Begin`, wait `delay`, write `text`, end with status 0.
    Run { delay: Duration, text: String },
    /// Announce with `Ready` instead of `Begin`, then behave like `Run`.
    RunAfterReady { text: String },
    /// Never announce; wait for whatever the controller sends.
    Withhold,
    /// Announce, get admitted, then hang forever without `End`.
    Hang,
    /// Announce, get admitted, then return without reporting `End`.
    ForgetEnd,
}

/// Shared record of what sessions did, in order.
#[derive(Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> usize {
        let entries = self.entries();
        entries
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{entry} not in timeline {entries:?}"))
    }
}

pub struct ScriptedFactory {
    scripts: HashMap<String, Script>,
    pub timeline: Timeline,
}

impl ScriptedFactory {
    pub fn new<'a>(scripts: impl IntoIterator<Item = (&'a str, Script)>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(host, script)| (host.to_string(), script))
                .collect(),
            timeline: Timeline::default(),
        }
    }
}

impl SessionFactory for ScriptedFactory {
    fn create(
        &self,
        host: &Host,
        _command: &str,
        output: OutputSink,
        link: HostLink,
    ) -> Box<dyn SessionExecutor> {
        Box::new(ScriptedSession {
            host: host.id.clone(),
            script: self.scripts[&host.id].clone(),
            output,
            link,
            timeline: self.timeline.clone(),
        })
    }
}

struct ScriptedSession {
    host: String,
    script: Script,
    output: OutputSink,
    link: HostLink,
    timeline: Timeline,
}

impl ScriptedSession {
    fn record(&self, what: &str) {
        self.timeline.push(format!("{}:{}", self.host, what));
    }

    async fn admitted(&mut self, kind: EventKind) -> bool {
        self.record("announce");
        let admission = match kind {
            EventKind::Ready => self.link.ready().await,
            _ => self.link.begin().await,
        };
        if let Ok(Admission::Continue) = admission {
            self.record("continue");
            true
        } else {
            self.record("stop");
            self.link.end(HostOutcome::Skipped);
            false
        }
    }

    async fn run(&mut self, delay: Duration, text: &str) -> anyhow::Result<()> {
        tokio::time::sleep(delay).await;
        self.record("run");
        self.output.write_all(text.as_bytes()).await?;
        self.record("end");
        self.link.end(HostOutcome::Completed { exit_status: 0 });
        Ok(())
    }
}

#[async_trait]
impl SessionExecutor for ScriptedSession {
    async fn work(mut self: Box<Self>) -> anyhow::Result<()> {
        match self.script.clone() {
            Script::Run { delay, text } => {
                if self.admitted(EventKind::Begin).await {
                    self.run(delay, &text).await?;
                }
            }
            Script::RunAfterReady { text } => {
                if self.admitted(EventKind::Ready).await {
                    self.run(Duration::ZERO, &text).await?;
                }
            }
            Script::Withhold => {
                let reply = self.link.receive(None).await?;
                self.record(&format!("got {:?}", reply.kind));
                if reply.kind == EventKind::Stop {
                    self.link.end(HostOutcome::Skipped);
                }
            }
            Script::Hang => {
                if self.admitted(EventKind::Begin).await {
                    std::future::pending::<()>().await;
                }
            }
            Script::ForgetEnd => {
                self.admitted(EventKind::Begin).await;
            }
        }
        Ok(())
    }
}

pub fn hosts(ids: &[&str]) -> Vec<Host> {
    ids.iter().map(|id| Host::new(*id, 22, "tester")).collect()
}

pub fn run(text: &str) -> Script {
    run_after(0, text)
}

pub fn run_after(delay_ms: u64, text: &str) -> Script {
    Script::Run {
        delay: Duration::from_millis(delay_ms),
        text: text.to_string(),
    }
}

/// File-backed sink plus the path to read it back from.
pub async fn file_output(dir: &Path) -> (OutputSink, std::path::PathBuf) {
    let path = dir.join("output.txt");
    let sink = OutputSink::create_file(&path).await.unwrap();
    (sink, path)
}

pub async fn read_output(sink: &OutputSink, path: &Path) -> String {
    sink.flush().await.unwrap();
    tokio::fs::read_to_string(path).await.unwrap()
}

pub fn banner(host: &str) -> String {
    format!("========== {host} ==========\n")
}
