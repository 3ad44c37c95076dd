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

//! Progress indicator for runs whose output does not go to the console.

use indicatif::{ProgressBar, ProgressStyle};

use super::output::OutputSink;

/// Progress bar tick rate configuration.
const PROGRESS_BAR_TICK_RATE_MS: u64 = 100;

fn create_progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|e| {
            tracing::debug!("Falling back to default progress style: {}", e);
            ProgressStyle::default_bar()
        })
}

/// Counts hosts through a run. Inactive when output is the console, since
/// the bar would interleave with host output.
pub(crate) struct HostProgress {
    bar: Option<ProgressBar>,
}

impl HostProgress {
    pub(crate) fn for_output(output: &OutputSink, total: usize) -> Self {
        if output.is_console() {
            return Self { bar: None };
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(create_progress_style());
        bar.enable_steady_tick(std::time::Duration::from_millis(
            PROGRESS_BAR_TICK_RATE_MS,
        ));
        Self { bar: Some(bar) }
    }

    pub(crate) fn advance(&self, host: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(host.to_string());
            bar.inc(1);
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message("done");
        }
    }
}
