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
use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures. Per-host failures never show up here; they are
/// reported through the host's own output and its `End` outcome.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to create scratch directory {path:?}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open output file for {host} at {path:?}: {source}")]
    TempFile {
        host: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("host '{0}' is listed more than once (scratch file '{1}' would be shared)")]
    DuplicateHost(String, String),

    #[error("failed to merge host output: {0}")]
    Output(#[source] io::Error),

    #[error("run interrupted")]
    Interrupted,
}
