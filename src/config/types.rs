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

use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

use super::credentials::Credentials;
use crate::command::format_command;
use crate::executor::OutputSink;
use crate::host::{Host, HostError};
use crate::ssh::StrictHostKeyChecking;

/// Everything a run needs besides the host list.
#[derive(Clone)]
pub struct RunConfig {
    pub user: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub key_file: Option<PathBuf>,
    /// Command or script body.
    pub cmd: String,
    /// Script invocation; empty means `cmd` runs as-is.
    pub args: String,
    pub output: OutputSink,
    /// Serial mode answers `Stop` when a host has not shaken hands in time.
    pub ready_timeout: Option<Duration>,
    /// A host's session is abandoned after this long.
    pub host_timeout: Option<Duration>,
    /// Parent of the parallel scratch directory.
    pub tmp_root: PathBuf,
    pub strict_mode: StrictHostKeyChecking,
}

impl RunConfig {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            user: None,
            password: None,
            key_file: None,
            cmd: cmd.into(),
            args: String::new(),
            output: OutputSink::stdout(),
            ready_timeout: None,
            host_timeout: None,
            tmp_root: std::env::temp_dir(),
            strict_mode: StrictHostKeyChecking::default(),
        }
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_key_file(mut self, key_file: Option<PathBuf>) -> Self {
        self.key_file = key_file;
        self
    }

    pub fn with_password(mut self, password: Option<Zeroizing<String>>) -> Self {
        self.password = password;
        self
    }

    pub fn with_timeouts(
        mut self,
        ready_timeout: Option<Duration>,
        host_timeout: Option<Duration>,
    ) -> Self {
        self.ready_timeout = ready_timeout;
        self.host_timeout = host_timeout;
        self
    }

    pub fn with_tmp_root(mut self, tmp_root: impl Into<PathBuf>) -> Self {
        self.tmp_root = tmp_root.into();
        self
    }

    pub fn with_strict_mode(mut self, strict_mode: StrictHostKeyChecking) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    /// Fill fields left unset on the command line from the credential file.
    pub fn merge_credentials(&mut self, credentials: &Credentials) {
        if self.user.is_none() {
            self.user = credentials.user.clone();
        }
        if self.key_file.is_none() {
            self.key_file = credentials.key_file.clone();
        }
        if self.password.is_none() {
            self.password = credentials.password.clone();
        }
    }

    /// The command as it will be sent to every host.
    pub fn formatted_command(&self) -> String {
        format_command(&self.cmd, &self.args)
    }

    /// Parse host specs, attaching this configuration's credentials.
    pub fn resolve_hosts(&self, specs: &[String]) -> Result<Vec<Host>, HostError> {
        specs
            .iter()
            .map(|spec| {
                Host::parse(spec, self.user.as_deref()).map(|host| {
                    host.with_password(self.password.clone())
                        .with_key_file(self.key_file.clone())
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .field("cmd", &self.cmd)
            .field("args", &self.args)
            .field("ready_timeout", &self.ready_timeout)
            .field("host_timeout", &self.host_timeout)
            .field("tmp_root", &self.tmp_root)
            .field("strict_mode", &self.strict_mode)
            .finish()
    }
}
