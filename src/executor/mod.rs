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

//! Run strategies that dispatch one command to many hosts.
//!
//! Both strategies drive sessions through the [`crate::manager::Manager`]
//! event bus. [`SerialExecutor`] visits hosts one at a time and streams their
//! output directly; [`ParallelExecutor`] runs all of them at once and merges
//! their captured output in host-list order.

mod error;
mod output;
mod parallel;
mod progress;
mod result_types;
mod scratch;
mod serial;
mod session;

pub use error::RunError;
pub use output::{banner, OutputSink};
pub use parallel::{run_parallel, ParallelExecutor};
pub use result_types::{HostResult, RunSummary};
pub use scratch::ScratchDir;
pub use serial::{run_serial, SerialExecutor};
pub use session::{SessionExecutor, SessionFactory};
