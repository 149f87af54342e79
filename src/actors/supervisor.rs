//! MonitorSupervisor - Starts and owns every poller
//!
//! One poller is started per (appliance, metric group) pair when the
//! supervisor is created. Pollers never exit on their own, so the supervisor
//! does not restart anything; it only keeps the tasks and their handles alive
//! for the lifetime of the process. Dropping the supervisor aborts every
//! poller task.

use std::sync::Arc;

use anyhow::{Result, ensure};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use crate::config::MonitorConfig;
use crate::fetch::{HttpFetcher, StatusFetcher};
use crate::schema::MetricGroup;
use crate::store::ObservableStore;

use super::poller::PollerHandle;

pub struct MonitorSupervisor {
    store: Arc<ObservableStore>,

    pollers: Vec<PollerHandle>,

    tasks: JoinSet<()>,
}

impl MonitorSupervisor {
    /// Create the store and start one poller per appliance and metric group
    ///
    /// Fails without starting anything if no appliance is configured.
    #[instrument(skip_all)]
    pub fn start(config: &MonitorConfig, fetcher: Arc<dyn StatusFetcher>) -> Result<Self> {
        ensure!(
            !config.targets.is_empty(),
            "the list of appliances must not be empty"
        );

        let store = Arc::new(ObservableStore::new(&config.targets));
        let settings = config.poll_settings();

        let mut tasks = JoinSet::new();
        let mut pollers = Vec::with_capacity(config.targets.len() * MetricGroup::ALL.len());

        for target in &config.targets {
            for group in MetricGroup::ALL {
                debug!("starting {group} poller for {}", target.identity());
                pollers.push(PollerHandle::spawn_in(
                    &mut tasks,
                    target.clone(),
                    group,
                    settings,
                    fetcher.clone(),
                    store.clone(),
                ));
            }
        }

        info!(
            "started {} pollers for {} appliance(s)",
            pollers.len(),
            config.targets.len()
        );

        Ok(Self {
            store,
            pollers,
            tasks,
        })
    }

    /// Start polling over HTTP
    pub fn start_http(config: &MonitorConfig) -> Result<Self> {
        Self::start(config, Arc::new(HttpFetcher::new()?))
    }

    pub fn store(&self) -> &Arc<ObservableStore> {
        &self.store
    }

    pub fn pollers(&self) -> &[PollerHandle] {
        &self.pollers
    }

    pub fn poller(&self, identity: &str, group: MetricGroup) -> Option<&PollerHandle> {
        self.pollers
            .iter()
            .find(|poller| poller.identity() == identity && poller.group() == group)
    }

    /// Wait until every poller task has ended
    ///
    /// Under normal operation this never resolves.
    pub async fn wait(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!("poller task failed: {e}");
            }
        }
    }

    /// Stop every poller and wait for their tasks to end
    pub async fn shutdown(mut self) {
        for poller in &self.pollers {
            if let Err(e) = poller.shutdown().await {
                debug!(
                    "{} poller for {} already stopped: {e:#}",
                    poller.group(),
                    poller.identity()
                );
            }
        }

        self.wait().await;
        debug!("all pollers stopped");
    }
}
