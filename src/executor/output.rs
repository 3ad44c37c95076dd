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

//! Shared output sinks and per-host banners.

use owo_colors::OwoColorize;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A cloneable, internally synchronized byte sink.
///
/// Clones share the same writer, so the serial controller and every serial
/// session can write to one console while parallel sessions each get their
/// own file-backed sink. Each `write_all` call is atomic with respect to
/// other writers.
#[derive(Clone)]
pub struct OutputSink {
    writer: Arc<Mutex<BoxedWriter>>,
    console: bool,
}

impl OutputSink {
    /// Sink writing to the process's standard output.
    pub fn stdout() -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(tokio::io::stdout()))),
            console: true,
        }
    }

    /// Sink over an arbitrary writer.
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            console: false,
        }
    }

    /// Create (or truncate) `path` and write to it.
    pub async fn create_file(path: &Path) -> io::Result<Self> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Self::new(file))
    }

    /// Whether this sink is the interactive console.
    pub fn is_console(&self) -> bool {
        self.console
    }

    pub async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(buf).await
    }

    pub async fn flush(&self) -> io::Result<()> {
        self.writer.lock().await.flush().await
    }

    /// Flush and close the underlying writer.
    pub async fn shutdown(&self) -> io::Result<()> {
        self.writer.lock().await.shutdown().await
    }

    /// Append everything `reader` yields, holding the lock for the whole copy.
    pub async fn copy_from<R>(&self, reader: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut writer = self.writer.lock().await;
        tokio::io::copy(reader, &mut *writer).await
    }
}

/// Separator line printed before a host's output.
pub fn banner(host: &str, color: bool) -> String {
    let line = format!("========== {host} ==========");
    if color {
        format!("{}\n", line.yellow())
    } else {
        format!("{line}\n")
    }
}

pub(crate) async fn write_banner(sink: &OutputSink, host: &str, color: bool) {
    if let Err(e) = sink.write_all(banner(host, color).as_bytes()).await {
        tracing::warn!("Failed to write banner for {}: {}", host, e);
    }
}
