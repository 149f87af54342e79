//! Process variable view of the store
//!
//! The PV server itself lives outside this crate. This module gives it what
//! it needs: the flat PV name of every store key, the PV descriptors (type,
//! unit, precision) and the current values under those names.
//!
//! Names are `<prefix><identity>:<field>`. With a single appliance the
//! identity and the separator are left out, so a standalone deployment serves
//! `<prefix><field>`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace, warn};

use crate::config::MonitorConfig;
use crate::schema::FieldKind;
use crate::store::{MetricKey, MetricValue, ObservableStore};

/// Maps store keys to PV names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvNaming {
    prefix: String,
    qualify: bool,
}

impl PvNaming {
    pub fn new(prefix: impl Into<String>, target_count: usize) -> Self {
        Self {
            prefix: prefix.into(),
            qualify: target_count > 1,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.prefix.clone(), config.targets.len())
    }

    /// Full PV name, prefix included
    pub fn name(&self, key: &MetricKey) -> String {
        format!("{}{}", self.prefix, self.relative_name(key))
    }

    /// PV name without the prefix
    pub fn relative_name(&self, key: &MetricKey) -> String {
        if self.qualify {
            format!("{}:{}", key.target, key.field)
        } else {
            key.field.to_string()
        }
    }
}

/// Static description of one PV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PvDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub unit: Option<&'static str>,
    pub precision: Option<u8>,
}

/// Describe every PV backed by the store, ordered by name
pub fn pv_database(store: &ObservableStore, naming: &PvNaming) -> Vec<PvDescriptor> {
    let mut descriptors: Vec<_> = store
        .keys()
        .into_iter()
        .filter_map(|key| {
            let field = key.group.field(key.field)?;
            Some(PvDescriptor {
                name: naming.name(&key),
                kind: field.kind,
                unit: field.unit,
                precision: field.precision,
            })
        })
        .collect();
    descriptors.sort_by(|a, b| a.name.cmp(&b.name));
    descriptors
}

/// Current value of every PV, by full PV name
pub fn export_snapshot(store: &ObservableStore, naming: &PvNaming) -> BTreeMap<String, MetricValue> {
    store
        .snapshot()
        .into_iter()
        .map(|(key, value)| (naming.name(&key), value))
        .collect()
}

/// Follow store notifications and log every changed PV at debug level
pub async fn log_changes(store: Arc<ObservableStore>, naming: PvNaming) {
    let mut updates = store.subscribe();

    loop {
        match updates.recv().await {
            Ok(update) => {
                trace!("{} PVs changed at {}", update.keys.len(), update.timestamp);
                for key in update.keys {
                    if let Some(current) = store.get(&key) {
                        debug!(
                            "{} = {} ({:?})",
                            naming.name(&key),
                            current.value,
                            current.quality
                        );
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("skipped {skipped} store notifications");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
