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

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::get_current_username;

const DEFAULT_SSH_PORT: u16 = 22;

/// Errors from parsing host specifications.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("empty host specification")]
    Empty,

    #[error("invalid port '{port}' in '{spec}'")]
    InvalidPort { spec: String, port: String },

    #[error("unclosed '[' in '{spec}'")]
    UnclosedBracket { spec: String },

    #[error("failed to read host file '{path}': {reason}")]
    HostFile { path: String, reason: String },
}

/// One remote target of a run.
///
/// `id` is the specification exactly as the user wrote it; it names the host
/// on the event bus and in banners.
#[derive(Clone)]
pub struct Host {
    pub id: String,
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: Option<Zeroizing<String>>,
    pub key_file: Option<PathBuf>,
}

impl Host {
    pub fn new(hostname: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            id: hostname.clone(),
            hostname,
            port,
            username: username.into(),
            password: None,
            key_file: None,
        }
    }

    /// Parse `host`, `host:port`, `user@host`, `user@host:port` or a
    /// bracketed IPv6 literal such as `[::1]:2222`.
    pub fn parse(spec: &str, default_user: Option<&str>) -> Result<Self, HostError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(HostError::Empty);
        }

        let (user_part, host_part) = match spec.rsplit_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, spec),
        };

        let (hostname, port_str) = if let Some(bracketed) = host_part.strip_prefix('[') {
            let (addr, rest) = bracketed
                .split_once(']')
                .ok_or_else(|| HostError::UnclosedBracket {
                    spec: spec.to_string(),
                })?;
            (addr, rest.strip_prefix(':'))
        } else if host_part.matches(':').count() > 1 {
            // Bare IPv6 literal without a port.
            (host_part, None)
        } else {
            match host_part.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (host_part, None),
            }
        };

        if hostname.is_empty() {
            return Err(HostError::Empty);
        }

        let port = match port_str {
            Some(port) => port.parse::<u16>().map_err(|_| HostError::InvalidPort {
                spec: spec.to_string(),
                port: port.to_string(),
            })?,
            None => DEFAULT_SSH_PORT,
        };

        let username = user_part
            .filter(|u| !u.is_empty())
            .or(default_user)
            .map(str::to_string)
            .unwrap_or_else(get_current_username);

        Ok(Self {
            id: spec.to_string(),
            hostname: hostname.to_string(),
            port,
            username,
            password: None,
            key_file: None,
        })
    }

    pub fn with_password(mut self, password: Option<Zeroizing<String>>) -> Self {
        self.password = password;
        self
    }

    pub fn with_key_file(mut self, key_file: Option<PathBuf>) -> Self {
        self.key_file = key_file;
        self
    }

    /// `host:port` suitable for socket address resolution.
    pub fn address(&self) -> (String, u16) {
        (self.hostname.clone(), self.port)
    }

    /// File name for this host's scratch output.
    ///
    /// Leading dots become `_` so an id can never name `.`, `..` or a
    /// hidden file inside the scratch directory.
    pub fn file_name(&self) -> String {
        let mut leading = true;
        self.id
            .chars()
            .map(|c| {
                let mapped = match c {
                    '.' if leading => '_',
                    'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' | '@' => c,
                    _ => '_',
                };
                leading &= c == '.';
                mapped
            })
            .collect()
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.hostname, self.port)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("id", &self.id)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .finish()
    }
}

/// Read host specifications from a file: one per line, `#` starts a comment.
pub async fn read_host_file(path: &Path) -> Result<Vec<String>, HostError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| HostError::HostFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(parse_host_lines(&content))
}

fn parse_host_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
