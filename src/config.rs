use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail, ensure};
use tracing::trace;
use url::Url;

/// Upper bound for request_timeout and request_interval, in seconds
pub const MAX_DURATION_SECS: u64 = 86_400;

/// Raw configuration as read from the configuration file
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Appliances to monitor
    #[serde(alias = "targets", default)]
    pub appliances: Vec<ApplianceConfig>,

    /// Timeout of a single status request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Delay between two polls of the same metric group, in seconds
    #[serde(default = "default_request_interval")]
    pub request_interval: u64,

    /// Prefix of every exported PV name
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApplianceConfig {
    pub identity: String,
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            appliances: vec![ApplianceConfig {
                identity: String::from("appliance0"),
                url: String::from("http://localhost:17665"),
            }],
            request_timeout: default_request_timeout(),
            request_interval: default_request_interval(),
            prefix: default_prefix(),
        }
    }
}

fn default_request_timeout() -> u64 {
    5
}

fn default_request_interval() -> u64 {
    5
}

fn default_prefix() -> String {
    String::from("MTEST:")
}

impl Config {
    /// Validate the configuration and turn it into its immutable runtime form
    pub fn resolve(self) -> anyhow::Result<MonitorConfig> {
        ensure!(
            !self.appliances.is_empty(),
            "the list of appliances must not be empty"
        );
        ensure!(
            (1..=MAX_DURATION_SECS).contains(&self.request_timeout),
            "request_timeout must be between 1 and {MAX_DURATION_SECS} seconds"
        );
        ensure!(
            (1..=MAX_DURATION_SECS).contains(&self.request_interval),
            "request_interval must be between 1 and {MAX_DURATION_SECS} seconds"
        );

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(self.appliances.len());
        for appliance in self.appliances {
            if !seen.insert(appliance.identity.clone()) {
                bail!("appliance identity {} is configured twice", appliance.identity);
            }
            targets.push(Target::new(appliance.identity, &appliance.url)?);
        }

        Ok(MonitorConfig {
            targets,
            request_timeout: Duration::from_secs(self.request_timeout),
            poll_interval: Duration::from_secs(self.request_interval),
            prefix: self.prefix,
        })
    }
}

/// One monitored appliance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    identity: Arc<str>,
    base_url: Url,
}

impl Target {
    pub fn new(identity: impl Into<String>, base_url: &str) -> anyhow::Result<Self> {
        let identity = identity.into();
        ensure!(
            !identity.trim().is_empty(),
            "appliance identity must not be empty"
        );

        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid url {base_url:?} for appliance {identity}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "url {base_url} for appliance {identity} must use http or https, not {}",
                base_url.scheme()
            );
        }

        Ok(Target {
            identity: identity.into(),
            base_url,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn identity_arc(&self) -> Arc<str> {
        self.identity.clone()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Per-poller timing, shared by every poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

/// Validated runtime configuration, built once at startup
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub targets: Vec<Target>,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub prefix: String,
}

impl MonitorConfig {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            request_timeout: self.request_timeout,
            poll_interval: self.poll_interval,
        }
    }

    pub fn is_cluster(&self) -> bool {
        self.targets.len() > 1
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read configuration file {path}"))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file {path}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
