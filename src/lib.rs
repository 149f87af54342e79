pub mod actors;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod parse;
pub mod schema;
pub mod store;
pub mod util;

pub use actors::poller::{MetricGroupPoller, PollerHandle};
pub use actors::supervisor::MonitorSupervisor;
pub use error::{FetchError, PollError, ValidationError};
pub use schema::MetricGroup;
pub use store::{MetricKey, MetricValue, ObservableStore, Quality, Value};
