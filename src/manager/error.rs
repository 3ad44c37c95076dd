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

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the event bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// The bus was closed and no buffered events remain.
    #[error("event bus is closed")]
    Closed,

    /// Nothing arrived before the receive deadline.
    #[error("no event received within {0:?}")]
    Timeout(Duration),

    /// The target host has no registered session (never created, or gone).
    #[error("no session registered for host '{0}'")]
    UnknownPeer(String),
}
