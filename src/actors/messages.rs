//! Message types for poller control

use tokio::sync::oneshot;

use crate::error::PollResult;

/// Commands that can be sent to a MetricGroupPoller
#[derive(Debug)]
pub enum PollerCommand {
    /// Run a poll cycle immediately
    ///
    /// The cycle result is sent back once the store has been updated, and the
    /// next scheduled cycle is pushed back by one full interval.
    PollNow {
        respond_to: oneshot::Sender<PollResult<()>>,
    },

    /// Stop the poller after the current cycle
    Shutdown,
}
