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

use std::io;
use thiserror::Error;

/// Transport and authentication failures for a single host.
#[derive(Debug, Error)]
pub enum SshError {
    #[error("Unable to resolve {host}: {source}")]
    AddressInvalid {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("The server host key was rejected")]
    ServerCheckFailed,

    #[error("The host key for {0} changed; refusing to connect")]
    HostKeyChanged(String),

    #[error("Unable to load private key: {0}")]
    KeyInvalid(#[source] russh::keys::Error),

    #[error("Password authentication failed")]
    PasswordWrong,

    #[error("Public key authentication failed")]
    KeyAuthFailed,

    #[error("Failed to connect to the SSH agent")]
    AgentConnectionFailed,

    #[error("The SSH agent has no identities")]
    AgentNoIdentities,

    #[error("No identity from the SSH agent was accepted")]
    AgentAuthenticationFailed,

    #[error("The remote command closed without an exit status")]
    CommandDidntExit,

    #[error("Failed to write command output: {0}")]
    Output(#[source] io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),
}
