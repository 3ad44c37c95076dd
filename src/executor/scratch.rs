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

//! Per-run scratch directory for parallel output capture.

use chrono::Utc;
use std::path::{Path, PathBuf};

use super::error::RunError;

const SCRATCH_PREFIX: &str = ".run.";

/// `<root>/.run.<nanos>`, removed by [`ScratchDir::remove`] or, failing
/// that, when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    pub async fn create(root: &Path) -> Result<Self, RunError> {
        let now = Utc::now();
        let stamp = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| i64::from(now.timestamp_subsec_nanos()));
        let path = root.join(format!("{SCRATCH_PREFIX}{stamp}"));

        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| RunError::Scratch {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Created scratch directory {:?}", path);

        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove scratch directory {:?}: {}", self.path, e);
            }
        }
        self.removed = true;
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
