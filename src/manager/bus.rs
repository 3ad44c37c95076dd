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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use super::error::ManagerError;
use super::event::{Event, Peer};
use super::link::HostLink;

type Mailbox = (u64, mpsc::UnboundedSender<Event>);

/// Rendezvous point for one run.
///
/// Everything sent to [`Peer::Controller`] lands in a single FIFO queue read
/// by [`Manager::receive`]; everything sent to a [`Peer::Host`] lands in that
/// host's mailbox, read through its [`HostLink`]. The bus never inspects
/// event contents; callers pick the target of every send.
pub struct Manager {
    inbox_tx: mpsc::UnboundedSender<Event>,
    inbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Event>>,
    mailboxes: Mutex<HashMap<String, Mailbox>>,
    next_registration: AtomicU64,
}

impl Manager {
    pub fn new() -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            inbox_tx,
            inbox_rx: tokio::sync::Mutex::new(inbox_rx),
            mailboxes: Mutex::new(HashMap::new()),
            next_registration: AtomicU64::new(0),
        }
    }

    /// Register a host and hand back its side of the bus.
    ///
    /// Registering the same id again replaces the previous mailbox.
    pub fn register(self: &Arc<Self>, host: &str) -> HostLink {
        let (tx, rx) = mpsc::unbounded_channel();
        let registration = self.next_registration.fetch_add(1, Ordering::Relaxed);
        self.mailboxes()
            .insert(host.to_string(), (registration, tx));
        tracing::trace!("Registered mailbox for {}", host);
        HostLink::new(host.to_string(), Arc::clone(self), rx, registration)
    }

    pub(super) fn unregister(&self, host: &str, registration: u64) {
        let mut mailboxes = self.mailboxes();
        if matches!(mailboxes.get(host), Some((id, _)) if *id == registration) {
            mailboxes.remove(host);
        }
    }

    /// Deliver `event` to `target`.
    pub fn send(&self, target: &Peer, event: Event) -> Result<(), ManagerError> {
        tracing::debug!("{} -> {}: {:?}", event.from, target, event.kind);
        match target {
            Peer::Controller => self
                .inbox_tx
                .send(event)
                .map_err(|_| ManagerError::Closed),
            Peer::Host(id) => {
                let mailboxes = self.mailboxes();
                let (_, tx) = mailboxes
                    .get(id)
                    .ok_or_else(|| ManagerError::UnknownPeer(id.clone()))?;
                tx.send(event).map_err(|_| ManagerError::Closed)
            }
        }
    }

    /// Take the next event addressed to the controller.
    ///
    /// `None` waits indefinitely. The wait suspends the calling task until an
    /// event arrives, the deadline passes, or the bus is closed and drained.
    pub async fn receive(&self, timeout: Option<Duration>) -> Result<Event, ManagerError> {
        let mut inbox = self.inbox_rx.lock().await;
        let next = match timeout {
            None => inbox.recv().await,
            Some(limit) => tokio::time::timeout(limit, inbox.recv())
                .await
                .map_err(|_| ManagerError::Timeout(limit))?,
        };
        next.ok_or(ManagerError::Closed)
    }

    /// Take every event currently queued for the controller without waiting.
    pub async fn drain(&self) -> Vec<Event> {
        let mut inbox = self.inbox_rx.lock().await;
        let mut pending = Vec::new();
        while let Ok(event) = inbox.try_recv() {
            pending.push(event);
        }
        pending
    }

    /// Close the bus in both directions.
    ///
    /// Buffered controller events can still be received; after that
    /// [`Manager::receive`] fails with [`ManagerError::Closed`]. Host
    /// mailboxes are dropped, so sessions waiting for a reply see
    /// `Closed` immediately.
    pub async fn close(&self) {
        self.inbox_rx.lock().await.close();
        self.mailboxes().clear();
    }

    fn mailboxes(&self) -> MutexGuard<'_, HashMap<String, Mailbox>> {
        self.mailboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{EventKind, HostOutcome};

    #[tokio::test]
    async fn test_send_and_receive_controller() {
        let manager = Arc::new(Manager::new());
        let link = manager.register("web1");
        link.notify(EventKind::Ready).unwrap();

        let event = manager.receive(None).await.unwrap();
        assert_eq!(event.from, Peer::host("web1"));
        assert_eq!(event.kind, EventKind::Ready);
    }

    #[tokio::test]
    async fn test_receive_timeout() {
        let manager = Manager::new();
        let result = manager.receive(Some(Duration::from_millis(20))).await;
        assert_eq!(
            result,
            Err(ManagerError::Timeout(Duration::from_millis(20)))
        );
    }

    #[tokio::test]
    async fn test_send_to_unknown_host() {
        let manager = Manager::new();
        let result = manager.send(
            &Peer::host("ghost"),
            Event::from_controller(EventKind::Continue),
        );
        assert_eq!(result, Err(ManagerError::UnknownPeer("ghost".to_string())));
    }

    #[tokio::test]
    async fn test_reply_routed_to_named_host() {
        let manager = Arc::new(Manager::new());
        let mut a = manager.register("a");
        let mut b = manager.register("b");

        manager
            .send(&Peer::host("b"), Event::from_controller(EventKind::Stop))
            .unwrap();
        manager
            .send(&Peer::host("a"), Event::from_controller(EventKind::Continue))
            .unwrap();

        let to_a = a.receive(None).await.unwrap();
        let to_b = b.receive(None).await.unwrap();
        assert_eq!(to_a.kind, EventKind::Continue);
        assert_eq!(to_b.kind, EventKind::Stop);
    }

    #[tokio::test]
    async fn test_same_sender_order_preserved() {
        let manager = Arc::new(Manager::new());
        let link = manager.register("web1");
        link.notify(EventKind::Ready).unwrap();
        link.notify(EventKind::Begin).unwrap();
        link.end(HostOutcome::Completed { exit_status: 0 });

        let kinds: Vec<_> = [
            manager.receive(None).await.unwrap().kind,
            manager.receive(None).await.unwrap().kind,
            manager.receive(None).await.unwrap().kind,
        ]
        .into();
        assert_eq!(
            kinds,
            vec![
                EventKind::Ready,
                EventKind::Begin,
                EventKind::End(HostOutcome::Completed { exit_status: 0 })
            ]
        );
    }

    #[tokio::test]
    async fn test_close_drains_then_fails() {
        let manager = Arc::new(Manager::new());
        let mut link = manager.register("web1");
        link.notify(EventKind::Begin).unwrap();
        manager.close().await;

        assert_eq!(manager.receive(None).await.unwrap().kind, EventKind::Begin);
        assert_eq!(manager.receive(None).await, Err(ManagerError::Closed));
        assert_eq!(link.receive(None).await, Err(ManagerError::Closed));
    }

    #[tokio::test]
    async fn test_drain_discards_pending() {
        let manager = Arc::new(Manager::new());
        let link = manager.register("web1");
        link.notify(EventKind::Ready).unwrap();
        link.notify(EventKind::Begin).unwrap();

        assert_eq!(manager.drain().await.len(), 2);
        assert!(manager
            .receive(Some(Duration::from_millis(10)))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_dropped_link_unregisters() {
        let manager = Arc::new(Manager::new());
        let link = manager.register("web1");
        drop(link);

        let result = manager.send(
            &Peer::host("web1"),
            Event::from_controller(EventKind::Continue),
        );
        assert!(matches!(result, Err(ManagerError::UnknownPeer(_))));
    }

    #[tokio::test]
    async fn test_stale_link_drop_keeps_new_registration() {
        let manager = Arc::new(Manager::new());
        let old = manager.register("web1");
        let mut new = manager.register("web1");
        drop(old);

        manager
            .send(&Peer::host("web1"), Event::from_controller(EventKind::Continue))
            .unwrap();
        assert_eq!(new.receive(None).await.unwrap().kind, EventKind::Continue);
    }
}
