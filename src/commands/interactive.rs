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

use anyhow::Result;

use crate::config::RunConfig;
use crate::host::Host;
use crate::ssh::sys_login;

/// Log in to `host` and hand it the local terminal until the shell exits.
pub async fn interact(config: &RunConfig, host: &Host) -> Result<()> {
    tracing::info!("Opening interactive session on {}", host);
    match sys_login(host, config.strict_mode).await? {
        Some(status) => tracing::info!("Session on {} exited with status {}", host, status),
        None => tracing::debug!("Session on {} closed", host),
    }
    Ok(())
}

/// An empty command against a single host opens a login shell. With more
/// hosts the empty command is dispatched like any other and runs as a no-op.
pub fn wants_login(config: &RunConfig, host_count: usize) -> bool {
    host_count == 1 && config.cmd.trim().is_empty()
}
