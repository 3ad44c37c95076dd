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

use sesh::manager::{Event, EventKind, Manager, Peer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const SENDERS: usize = 16;
const EVENTS_PER_SENDER: usize = 50;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_senders_lose_nothing() {
    let manager = Arc::new(Manager::new());
    let mut tasks = Vec::new();

    for i in 0..SENDERS {
        let link = manager.register(&format!("host{i}"));
        tasks.push(tokio::spawn(async move {
            for _ in 0..EVENTS_PER_SENDER {
                link.notify(EventKind::Ready).unwrap();
                tokio::task::yield_now().await;
            }
            link.notify(EventKind::Begin).unwrap();
            link
        }));
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut finished: HashMap<String, usize> = HashMap::new();
    for _ in 0..SENDERS * (EVENTS_PER_SENDER + 1) {
        let event = manager
            .receive(Some(Duration::from_secs(5)))
            .await
            .unwrap();
        let host = event.from.host_id().unwrap().to_string();
        match event.kind {
            EventKind::Ready => {
                // Per-sender order: nothing after a host's final Begin.
                assert!(!finished.contains_key(&host), "{host} sent Ready after Begin");
                *counts.entry(host).or_default() += 1;
            }
            EventKind::Begin => {
                *finished.entry(host).or_default() += 1;
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(counts.len(), SENDERS);
    assert!(counts.values().all(|&n| n == EVENTS_PER_SENDER));
    assert!(finished.values().all(|&n| n == 1));
    assert!(manager.drain().await.is_empty());

    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn test_replies_reach_only_their_host() {
    let manager = Arc::new(Manager::new());
    let mut links: Vec<_> = (0..SENDERS)
        .map(|i| manager.register(&format!("host{i}")))
        .collect();

    for i in (0..SENDERS).rev() {
        let kind = if i % 2 == 0 {
            EventKind::Continue
        } else {
            EventKind::Stop
        };
        manager
            .send(&Peer::host(format!("host{i}")), Event::from_controller(kind))
            .unwrap();
    }

    for (i, link) in links.iter_mut().enumerate() {
        let event = link.receive(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(event.from, Peer::Controller);
        let expected = if i % 2 == 0 {
            EventKind::Continue
        } else {
            EventKind::Stop
        };
        assert_eq!(event.kind, expected);
        assert!(link.receive(Some(Duration::from_millis(20))).await.is_err());
    }
}
