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

//! SSH connection establishment and channel operations.

use russh::client::{Config, Handle, Handler};
use russh::{ChannelMsg, Disconnect};
use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::auth::{authenticate_any, AuthMethod};
use super::error::SshError;
use super::known_hosts::{verify_server_key, ServerCheckMethod};
use crate::executor::OutputSink;

/// Terminal type requested for interactive logins when `$TERM` is unset.
const DEFAULT_TERM: &str = "xterm-256color";

/// Buffer size for local terminal input.
const STDIN_BUFFER_SIZE: usize = 1024;

/// An authenticated SSH connection to one host.
pub struct Client {
    handle: Handle<ClientHandler>,
    username: String,
    address: SocketAddr,
}

impl Client {
    /// Open a ssh connection to a remote host.
    ///
    /// `hostname` is resolved and each address is tried in turn until a
    /// connection succeeds. `methods` are tried in order on that
    /// connection; the whole process is aborted when none is accepted.
    pub async fn connect(
        (hostname, port): (&str, u16),
        username: &str,
        methods: Vec<AuthMethod>,
        server_check: ServerCheckMethod,
    ) -> Result<Self, SshError> {
        let config = Arc::new(Config {
            keepalive_interval: Some(Duration::from_secs(60)),
            ..Default::default()
        });

        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host((hostname, port))
            .await
            .map_err(|source| SshError::AddressInvalid {
                host: hostname.to_string(),
                source,
            })?
            .collect();

        let mut connect_res = Err(SshError::AddressInvalid {
            host: hostname.to_string(),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "could not resolve to any addresses",
            ),
        });
        for socket_addr in socket_addrs {
            let handler = ClientHandler {
                hostname: hostname.to_string(),
                port,
                server_check,
            };
            match russh::client::connect(config.clone(), socket_addr, handler).await {
                Ok(h) => {
                    connect_res = Ok((socket_addr, h));
                    break;
                }
                Err(e) => {
                    tracing::debug!("Connection to {} failed: {}", socket_addr, e);
                    connect_res = Err(e);
                }
            }
        }
        let (address, mut handle) = connect_res?;

        authenticate_any(&mut handle, username, methods).await?;
        tracing::debug!("Authenticated as {} on {}", username, address);

        Ok(Self {
            handle,
            username: username.to_string(),
            address,
        })
    }

    /// Run `command` and stream its stdout and stderr into `output`.
    ///
    /// Returns the remote exit status.
    pub async fn execute_streaming(
        &self,
        command: &str,
        output: &OutputSink,
    ) -> Result<u32, SshError> {
        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut exit_status: Option<u32> = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    output.write_all(data).await.map_err(SshError::Output)?;
                }
                ChannelMsg::ExtendedData { ref data, ext } => {
                    if ext == 1 {
                        output.write_all(data).await.map_err(SshError::Output)?;
                    }
                }
                // The exit status can precede trailing data, so keep reading
                // until the channel closes.
                ChannelMsg::ExitStatus { exit_status: status } => exit_status = Some(status),
                _ => {}
            }
        }
        output.flush().await.map_err(SshError::Output)?;

        exit_status.ok_or(SshError::CommandDidntExit)
    }

    /// Hand the local terminal to a remote login shell until it exits.
    ///
    /// The terminal is put in raw mode for the duration of the session.
    /// Returns the shell's exit status when the server reports one.
    pub async fn sys_login(&self) -> anyhow::Result<Option<u32>> {
        use anyhow::Context;

        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let term = std::env::var("TERM").unwrap_or_else(|_| DEFAULT_TERM.to_string());

        let mut channel = self.handle.channel_open_session().await?;
        channel
            .request_pty(false, &term, u32::from(cols), u32::from(rows), 0, 0, &[])
            .await
            .context("Failed to request PTY on SSH channel")?;
        channel
            .request_shell(false)
            .await
            .context("Failed to request shell on SSH channel")?;

        let _raw = RawModeGuard::enter()?;
        let mut stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut buf = [0u8; STDIN_BUFFER_SIZE];
        let mut stdin_open = true;
        let mut exit_status = None;

        loop {
            tokio::select! {
                msg = channel.wait() => match msg {
                    Some(ChannelMsg::Data { ref data }) => {
                        stdout.write_all(data).await?;
                        stdout.flush().await?;
                    }
                    Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                        stdout.write_all(data).await?;
                        stdout.flush().await?;
                    }
                    Some(ChannelMsg::ExitStatus { exit_status: status }) => {
                        exit_status = Some(status);
                    }
                    Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => break,
                    Some(_) => {}
                },
                read = stdin.read(&mut buf), if stdin_open => match read {
                    Ok(0) => {
                        stdin_open = false;
                        channel.eof().await?;
                    }
                    Ok(n) => channel.data(&buf[..n]).await?,
                    Err(e) => {
                        tracing::warn!("Failed to read terminal input: {}", e);
                        stdin_open = false;
                    }
                },
            }
        }

        Ok(exit_status)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn address(&self) -> &SocketAddr {
        &self.address
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), SshError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "")
            .await
            .map_err(SshError::Ssh)
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("address", &self.address)
            .finish()
    }
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    port: u16,
    server_check: ServerCheckMethod,
}

impl Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        verify_server_key(
            self.server_check,
            &self.hostname,
            self.port,
            server_public_key,
        )
    }
}

/// Keeps the local terminal in raw mode while alive.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> anyhow::Result<Self> {
        use anyhow::Context;
        crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }
}
