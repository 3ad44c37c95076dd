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

//! Host key verification against the user's `known_hosts`.

use directories::BaseDirs;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::SshError;

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// How the client treats the server's host key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCheckMethod {
    /// Accept any host key.
    NoCheck,
    /// Host must already be in `known_hosts` with a matching key.
    KnownHosts,
    /// Unknown hosts are accepted and recorded; changed keys are rejected.
    AcceptNew,
}

/// Create a ServerCheckMethod based on strict host key checking mode
pub fn get_check_method(strict_mode: StrictHostKeyChecking) -> ServerCheckMethod {
    match strict_mode {
        StrictHostKeyChecking::Yes => {
            if let Some(path) = get_default_known_hosts_path() {
                if !path.exists() {
                    tracing::warn!(
                        "Known hosts file not found at {:?}; every host will be rejected",
                        path
                    );
                }
            }
            ServerCheckMethod::KnownHosts
        }
        StrictHostKeyChecking::No => {
            tracing::debug!("Host key checking disabled (strict mode = no)");
            ServerCheckMethod::NoCheck
        }
        StrictHostKeyChecking::AcceptNew => ServerCheckMethod::AcceptNew,
    }
}

/// Decide whether to trust `key` presented by `hostname:port`.
pub(super) fn verify_server_key(
    method: ServerCheckMethod,
    hostname: &str,
    port: u16,
    key: &russh::keys::PublicKey,
) -> Result<bool, SshError> {
    if method == ServerCheckMethod::NoCheck {
        return Ok(true);
    }
    let Some(known_hosts) = get_default_known_hosts_path() else {
        tracing::warn!("Could not determine known_hosts path, rejecting {}", hostname);
        return Ok(false);
    };
    verify_against(method, &known_hosts, hostname, port, key)
}

/// Check `key` against the `known_hosts` file at `path`.
fn verify_against(
    method: ServerCheckMethod,
    path: &Path,
    hostname: &str,
    port: u16,
    key: &russh::keys::PublicKey,
) -> Result<bool, SshError> {
    let known = match russh::keys::check_known_hosts_path(hostname, port, key, path) {
        Ok(known) => known,
        Err(russh::keys::Error::KeyChanged { .. }) => {
            return Err(SshError::HostKeyChanged(hostname.to_string()))
        }
        Err(_) => return Err(SshError::ServerCheckFailed),
    };

    match method {
        ServerCheckMethod::NoCheck => Ok(true),
        ServerCheckMethod::KnownHosts => Ok(known),
        ServerCheckMethod::AcceptNew if known => Ok(true),
        ServerCheckMethod::AcceptNew => {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            match russh::keys::known_hosts::learn_known_hosts_path(hostname, port, key, path) {
                Ok(()) => tracing::info!("Added {} to {:?}", hostname, path),
                Err(e) => tracing::warn!("Could not record host key for {}: {}", hostname, e),
            }
            Ok(true)
        }
    }
}

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictHostKeyChecking {
    /// Always verify host keys (fail on unknown/changed)
    Yes,
    /// Never verify host keys (accept all)
    No,
    /// Verify known hosts, add new ones automatically (TOFU)
    #[default]
    AcceptNew,
}

impl FromStr for StrictHostKeyChecking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            "accept-new" | "tofu" => Ok(Self::AcceptNew),
            other => Err(format!(
                "invalid host key checking mode '{other}' (expected yes, no or accept-new)"
            )),
        }
    }
}

impl fmt::Display for StrictHostKeyChecking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::AcceptNew => "accept-new",
        })
    }
}
