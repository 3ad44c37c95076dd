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

//! Event bus shared by the controller and every host session of one run.
//!
//! Sessions talk to the controller through a [`HostLink`]; the controller
//! talks to sessions by naming them as a [`Peer::Host`] target. Each run
//! constructs its own [`Manager`], so concurrent runs in one process never
//! see each other's events.

mod bus;
mod error;
mod event;
mod link;

pub use bus::Manager;
pub use error::ManagerError;
pub use event::{Admission, Event, EventKind, HostOutcome, Peer};
pub use link::{EndNotifier, HostLink};
