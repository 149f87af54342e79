//! MetricGroupPoller - Polls one metric group of one appliance
//!
//! ## Poll Cycle
//!
//! ```text
//! fetch endpoint → validate shape → validate fields → coerce → publish (Good)
//!        │               │                 │             │
//!        └───────────────┴────── any error ┴─────────────┴──→ publish sentinels (Alarm)
//!                                                              + one warning line
//! then sleep for the poll interval and start over
//! ```
//!
//! A cycle always ends with every field of the group being written, either
//! all Good or all Alarm; a partially valid document is never committed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::config::{PollSettings, Target};
use crate::error::PollResult;
use crate::fetch::StatusFetcher;
use crate::parse::parse_group;
use crate::schema::{FieldSpec, MetricGroup};
use crate::store::{MetricKey, MetricValue, ObservableStore, Value};

use super::messages::PollerCommand;

/// Deadline used when the poll interval does not fit the clock
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Actor polling a single metric group of a single appliance
pub struct MetricGroupPoller {
    target: Target,

    group: MetricGroup,

    /// Management endpoint of the group, resolved once
    endpoint: Url,

    settings: PollSettings,

    fetcher: Arc<dyn StatusFetcher>,

    store: Arc<ObservableStore>,

    command_rx: mpsc::Receiver<PollerCommand>,
}

impl MetricGroupPoller {
    pub fn new(
        target: Target,
        group: MetricGroup,
        settings: PollSettings,
        fetcher: Arc<dyn StatusFetcher>,
        store: Arc<ObservableStore>,
        command_rx: mpsc::Receiver<PollerCommand>,
    ) -> Self {
        let endpoint = group.endpoint(target.base_url(), target.identity());

        Self {
            target,
            group,
            endpoint,
            settings,
            fetcher,
            store,
            command_rx,
        }
    }

    /// Run the poller's main loop
    ///
    /// The first cycle starts immediately, each following one a full interval
    /// after the previous cycle finished. The loop only ends on a Shutdown
    /// command. Once every handle has been dropped the poller keeps polling
    /// on its timer alone.
    #[instrument(skip(self), fields(appliance = %self.target.identity(), group = %self.group))]
    pub async fn run(mut self) {
        debug!("starting poller for {}", self.endpoint);

        let mut next_poll = Instant::now();
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = time::sleep_until(next_poll) => {
                    if let Err(e) = self.poll_cycle().await {
                        trace!("scheduled cycle failed: {e}");
                    }
                    next_poll = self.next_deadline();
                }

                command = self.command_rx.recv(), if commands_open => {
                    match command {
                        Some(PollerCommand::PollNow { respond_to }) => {
                            debug!("received PollNow command");
                            let result = self.poll_cycle().await;
                            next_poll = self.next_deadline();
                            let _ = respond_to.send(result);
                        }

                        Some(PollerCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            debug!("all handles dropped, polling on timer only");
                            commands_open = false;
                        }
                    }
                }
            }
        }

        debug!("poller stopped");
    }

    /// Start of the next scheduled cycle
    ///
    /// Saturates far in the future instead of overflowing the clock.
    fn next_deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.settings.poll_interval)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now)
    }

    /// Run one fetch-validate-commit cycle
    ///
    /// The store is updated on every path before this returns.
    pub async fn poll_cycle(&self) -> PollResult<()> {
        match self.fetch_and_parse().await {
            Ok(values) => {
                let count = values.len();
                self.store.publish(
                    values
                        .into_iter()
                        .map(|(field, value)| (self.key(field), MetricValue::good(value))),
                );
                trace!("published {count} {} metrics", self.group);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "appliance {}: {} metrics invalidated: {err}",
                    self.target.identity(),
                    self.group
                );
                self.invalidate();
                Err(err)
            }
        }
    }

    async fn fetch_and_parse(&self) -> PollResult<Vec<(&'static FieldSpec, Value)>> {
        let document = self
            .fetcher
            .fetch(&self.endpoint, self.settings.request_timeout)
            .await?;

        Ok(parse_group(self.group, self.target.identity(), &document)?)
    }

    /// Put every field of the group in alarm with its sentinel value
    fn invalidate(&self) {
        self.store.publish(
            self.group
                .fields()
                .iter()
                .map(|field| (self.key(field), MetricValue::alarm(field.kind))),
        );
    }

    fn key(&self, field: &FieldSpec) -> MetricKey {
        MetricKey::new(self.target.identity_arc(), self.group, field.name)
    }
}

/// Handle for controlling a MetricGroupPoller
///
/// Cheap to clone; the poller keeps running as long as one handle exists.
#[derive(Clone)]
pub struct PollerHandle {
    sender: mpsc::Sender<PollerCommand>,

    identity: Arc<str>,

    group: MetricGroup,
}

impl PollerHandle {
    /// Spawn a new poller as a detached tokio task
    pub fn spawn(
        target: Target,
        group: MetricGroup,
        settings: PollSettings,
        fetcher: Arc<dyn StatusFetcher>,
        store: Arc<ObservableStore>,
    ) -> Self {
        let (handle, poller) = Self::build(target, group, settings, fetcher, store);
        tokio::spawn(poller.run());
        handle
    }

    /// Spawn a new poller into a task set owned by the caller
    pub fn spawn_in(
        tasks: &mut JoinSet<()>,
        target: Target,
        group: MetricGroup,
        settings: PollSettings,
        fetcher: Arc<dyn StatusFetcher>,
        store: Arc<ObservableStore>,
    ) -> Self {
        let (handle, poller) = Self::build(target, group, settings, fetcher, store);
        tasks.spawn(poller.run());
        handle
    }

    fn build(
        target: Target,
        group: MetricGroup,
        settings: PollSettings,
        fetcher: Arc<dyn StatusFetcher>,
        store: Arc<ObservableStore>,
    ) -> (Self, MetricGroupPoller) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let handle = Self {
            sender: cmd_tx,
            identity: target.identity_arc(),
            group,
        };
        let poller = MetricGroupPoller::new(target, group, settings, fetcher, store, cmd_rx);

        (handle, poller)
    }

    /// Trigger an immediate poll cycle and wait for its result
    ///
    /// A failed cycle is returned as a [`PollError`](crate::error::PollError)
    /// inside the `anyhow::Error`.
    pub async fn poll_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive poll result")??;
        Ok(())
    }

    /// Stop the poller
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(PollerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn group(&self) -> MetricGroup {
        self.group
    }
}
