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

use async_trait::async_trait;

use super::auth::auth_methods;
use super::client::Client;
use super::known_hosts::{get_check_method, ServerCheckMethod, StrictHostKeyChecking};
use crate::executor::{OutputSink, SessionExecutor, SessionFactory};
use crate::host::Host;
use crate::manager::{Admission, HostLink, HostOutcome};

/// Runs one command on one host over SSH.
pub struct SshSession {
    host: Host,
    command: String,
    output: OutputSink,
    link: HostLink,
    server_check: ServerCheckMethod,
}

impl SshSession {
    pub fn new(
        host: Host,
        command: String,
        output: OutputSink,
        link: HostLink,
        server_check: ServerCheckMethod,
    ) -> Self {
        Self {
            host,
            command,
            output,
            link,
            server_check,
        }
    }

    /// Record a host-local failure in its output and end the host.
    async fn fail(&self, reason: String) {
        tracing::warn!("{}: {}", self.host, reason);
        let note = format!("sesh: {}: {}\n", self.host.id, reason);
        if let Err(e) = self.output.write_all(note.as_bytes()).await {
            tracing::debug!("Could not write failure note for {}: {}", self.host, e);
        }
        self.link.end(HostOutcome::failed(reason));
    }
}

#[async_trait]
impl SessionExecutor for SshSession {
    async fn work(mut self: Box<Self>) -> anyhow::Result<()> {
        let client = match Client::connect(
            (self.host.hostname.as_str(), self.host.port),
            &self.host.username,
            auth_methods(&self.host),
            self.server_check,
        )
        .await
        {
            Ok(client) => client,
            Err(e) => {
                self.fail(e.to_string()).await;
                return Ok(());
            }
        };

        match self.link.begin().await {
            Ok(Admission::Continue) => {
                tracing::debug!("Running command on {}", self.host);
                match client.execute_streaming(&self.command, &self.output).await {
                    Ok(exit_status) => {
                        self.link.end(HostOutcome::Completed { exit_status });
                    }
                    Err(e) => self.fail(e.to_string()).await,
                }
            }
            Ok(Admission::Stop) => {
                tracing::debug!("{} told to stop", self.host);
                self.link.end(HostOutcome::Skipped);
            }
            Err(e) => {
                tracing::warn!("{} lost the controller: {}", self.host, e);
                self.link.end(HostOutcome::Skipped);
            }
        }

        if let Err(e) = client.disconnect().await {
            tracing::debug!("Disconnect from {} failed: {}", self.host, e);
        }
        Ok(())
    }
}

/// Builds [`SshSession`]s sharing one host key policy.
#[derive(Debug, Clone, Copy)]
pub struct SshSessionFactory {
    server_check: ServerCheckMethod,
}

impl SshSessionFactory {
    pub fn new(strict_mode: StrictHostKeyChecking) -> Self {
        Self {
            server_check: get_check_method(strict_mode),
        }
    }
}

impl SessionFactory for SshSessionFactory {
    fn create(
        &self,
        host: &Host,
        command: &str,
        output: OutputSink,
        link: HostLink,
    ) -> Box<dyn SessionExecutor> {
        Box::new(SshSession::new(
            host.clone(),
            command.to_string(),
            output,
            link,
            self.server_check,
        ))
    }
}

/// Open an interactive login shell on `host`, bypassing the event bus.
pub async fn sys_login(
    host: &Host,
    strict_mode: StrictHostKeyChecking,
) -> anyhow::Result<Option<u32>> {
    use anyhow::Context;

    let client = Client::connect(
        (host.hostname.as_str(), host.port),
        &host.username,
        auth_methods(host),
        get_check_method(strict_mode),
    )
    .await
    .with_context(|| format!("Failed to connect to {host}"))?;

    let status = client.sys_login().await;
    if let Err(e) = client.disconnect().await {
        tracing::debug!("Disconnect from {} failed: {}", host, e);
    }
    status
}
