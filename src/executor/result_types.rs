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

//! Result types for a dispatch run.

use crate::manager::HostOutcome;

/// How one host finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResult {
    pub host: String,
    pub outcome: HostOutcome,
}

impl HostResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Per-host outcomes in host-list order.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub results: Vec<HostResult>,
}

impl RunSummary {
    pub(crate) fn record(&mut self, host: impl Into<String>, outcome: HostOutcome) {
        self.results.push(HostResult {
            host: host.into(),
            outcome,
        });
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    pub fn outcome(&self, host: &str) -> Option<&HostOutcome> {
        self.results
            .iter()
            .find(|r| r.host == host)
            .map(|r| &r.outcome)
    }

    /// Log a one-line summary plus every host that did not succeed.
    pub fn log(&self) {
        tracing::info!(
            "{} hosts: {} succeeded, {} failed",
            self.results.len(),
            self.success_count(),
            self.failed_count()
        );
        for result in self.results.iter().filter(|r| !r.is_success()) {
            tracing::info!("{}: {:?}", result.host, result.outcome);
        }
    }
}
