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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::bus::Manager;
use super::error::ManagerError;
use super::event::{Admission, Event, EventKind, HostOutcome, Peer};

/// Reports a host's terminal `End` event at most once.
///
/// Cloned out of a [`HostLink`] so a supervisor can still finish the host
/// after the session itself is gone.
#[derive(Clone)]
pub struct EndNotifier {
    host: String,
    manager: Arc<Manager>,
    ended: Arc<AtomicBool>,
}

impl EndNotifier {
    /// Send `End(outcome)` unless this host already ended. Returns whether
    /// the event was sent.
    pub fn end(&self, outcome: HostOutcome) -> bool {
        if self.ended.swap(true, Ordering::SeqCst) {
            tracing::warn!("{} already reported End, dropping {:?}", self.host, outcome);
            return false;
        }
        let event = Event::new(Peer::host(&self.host), EventKind::End(outcome));
        if let Err(e) = self.manager.send(&Peer::Controller, event) {
            tracing::warn!("Failed to report End for {}: {}", self.host, e);
        }
        true
    }

    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

/// A session's side of the bus: send to the controller, read replies.
pub struct HostLink {
    notifier: EndNotifier,
    mailbox: mpsc::UnboundedReceiver<Event>,
    registration: u64,
}

impl HostLink {
    pub(super) fn new(
        host: String,
        manager: Arc<Manager>,
        mailbox: mpsc::UnboundedReceiver<Event>,
        registration: u64,
    ) -> Self {
        Self {
            notifier: EndNotifier {
                host,
                manager,
                ended: Arc::new(AtomicBool::new(false)),
            },
            mailbox,
            registration,
        }
    }

    pub fn host(&self) -> &str {
        &self.notifier.host
    }

    /// Post a lifecycle event to the controller.
    ///
    /// `End` goes through [`HostLink::end`] so it is reported once.
    pub fn notify(&self, kind: EventKind) -> Result<(), ManagerError> {
        if let EventKind::End(outcome) = kind {
            self.notifier.end(outcome);
            return Ok(());
        }
        let event = Event::new(Peer::host(self.host()), kind);
        self.notifier.manager.send(&Peer::Controller, event)
    }

    /// Report the terminal event for this host.
    pub fn end(&self, outcome: HostOutcome) -> bool {
        self.notifier.end(outcome)
    }

    pub fn end_notifier(&self) -> EndNotifier {
        self.notifier.clone()
    }

    /// Next event addressed to this host. `None` waits indefinitely.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> Result<Event, ManagerError> {
        let next = match timeout {
            None => self.mailbox.recv().await,
            Some(limit) => tokio::time::timeout(limit, self.mailbox.recv())
                .await
                .map_err(|_| ManagerError::Timeout(limit))?,
        };
        next.ok_or(ManagerError::Closed)
    }

    /// Announce `Begin` and wait for the controller's answer.
    pub async fn begin(&mut self) -> Result<Admission, ManagerError> {
        self.handshake(EventKind::Begin).await
    }

    /// Announce `Ready` and wait for the controller's answer.
    pub async fn ready(&mut self) -> Result<Admission, ManagerError> {
        self.handshake(EventKind::Ready).await
    }

    async fn handshake(&mut self, kind: EventKind) -> Result<Admission, ManagerError> {
        self.notify(kind)?;
        loop {
            let reply = self.receive(None).await?;
            match reply.kind {
                EventKind::Continue => return Ok(Admission::Continue),
                EventKind::Stop => return Ok(Admission::Stop),
                other => {
                    tracing::trace!("{} ignoring {:?} while awaiting admission", self.host(), other)
                }
            }
        }
    }
}

impl Drop for HostLink {
    fn drop(&mut self) {
        self.notifier
            .manager
            .unregister(&self.notifier.host, self.registration);
    }
}
