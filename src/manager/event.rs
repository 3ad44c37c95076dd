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

use std::fmt;

/// Either side of a conversation on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Peer {
    Controller,
    Host(String),
}

impl Peer {
    pub fn host(id: impl Into<String>) -> Self {
        Self::Host(id.into())
    }

    /// Host identifier, or `None` for the controller.
    pub fn host_id(&self) -> Option<&str> {
        match self {
            Self::Controller => None,
            Self::Host(id) => Some(id),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller => write!(f, "controller"),
            Self::Host(id) => write!(f, "{id}"),
        }
    }
}

/// How a host's run finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    /// The remote command ran to completion.
    Completed { exit_status: u32 },
    /// The controller answered `Stop`; the command was never started.
    Skipped,
    /// Connecting, authenticating or running failed.
    Failed { reason: String },
}

impl HostOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { exit_status: 0 })
    }
}

/// What an event means. Only `End` carries data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Session is set up and waits for admission.
    Ready,
    /// Controller admits the session to run its command.
    Continue,
    /// Controller refuses; the session must terminate without running.
    Stop,
    /// Session is connected and asks to start its command.
    Begin,
    /// Session is finished and writes nothing more to its sink.
    End(HostOutcome),
}

impl EventKind {
    /// Whether this is a session's request for admission.
    pub fn is_handshake(&self) -> bool {
        matches!(self, Self::Ready | Self::Begin)
    }
}

/// A single message on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub from: Peer,
    pub kind: EventKind,
}

impl Event {
    pub fn new(from: Peer, kind: EventKind) -> Self {
        Self { from, kind }
    }

    pub fn from_controller(kind: EventKind) -> Self {
        Self::new(Peer::Controller, kind)
    }
}

/// The controller's answer to a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Continue,
    Stop,
}
