//! Actor-based polling engine
//!
//! Every (appliance, metric group) pair is polled by its own actor running as
//! an independent tokio task. Actors never talk to each other; their only
//! shared state is the [`ObservableStore`](crate::store::ObservableStore), in
//! which each of them owns a disjoint set of keys.
//!
//! ```text
//!                     MonitorSupervisor
//!                            │ spawns 3 per appliance
//!        ┌───────────────────┼───────────────────┐
//!        │                   │                   │
//!  Poller(instance)   Poller(appliance)   Poller(storage)   ...
//!        │                   │                   │
//!        └── fetch → parse → publish ────────────┘
//!                            │
//!                    ObservableStore ──→ PV server
//! ```
//!
//! Each actor also has an mpsc command channel (poll now, shutdown) reached
//! through its [`PollerHandle`](poller::PollerHandle).

pub mod messages;
pub mod poller;
pub mod supervisor;
