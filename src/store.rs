//! Shared store of current metric values
//!
//! The store holds exactly one [`MetricValue`] per (target, group, field) key.
//! Keys are registered up front from the schema with an alarmed sentinel, so a
//! reader never sees a missing value, even before the first poll completes.
//!
//! Pollers write through [`ObservableStore::publish`], which replaces a batch
//! of keys under a single write lock; a reader taking a
//! [`snapshot`](ObservableStore::snapshot) sees either all or none of a batch.
//! Each publish also marks its keys as changed and broadcasts a
//! [`StoreUpdate`] for whichever layer serves the values to clients.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::config::Target;
use crate::schema::{FieldKind, MetricGroup};

/// Capacity of the change notification channel
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Typed value of a metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
}

impl Value {
    /// Value shown while a metric is alarmed
    pub fn sentinel(kind: FieldKind) -> Self {
        match kind {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Integer => Value::Integer(0),
            FieldKind::Float => Value::Float(0.0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(value) => write!(f, "{value:?}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Quality of a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Fresh and validated
    Good,

    /// Communication alarm: the last poll of the group failed
    Alarm,
}

/// A metric value together with its quality flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub value: Value,
    pub quality: Quality,
}

impl MetricValue {
    pub fn good(value: Value) -> Self {
        Self {
            value,
            quality: Quality::Good,
        }
    }

    pub fn alarm(kind: FieldKind) -> Self {
        Self {
            value: Value::sentinel(kind),
            quality: Quality::Alarm,
        }
    }

    pub fn is_good(&self) -> bool {
        self.quality == Quality::Good
    }
}

/// Identifies one metric of one target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub target: Arc<str>,
    pub group: MetricGroup,
    pub field: &'static str,
}

impl MetricKey {
    pub fn new(target: impl Into<Arc<str>>, group: MetricGroup, field: &'static str) -> Self {
        Self {
            target: target.into(),
            group,
            field,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.target, self.group, self.field)
    }
}

/// Notification sent after every publish
#[derive(Debug, Clone)]
pub struct StoreUpdate {
    /// Keys replaced by the publish
    pub keys: Vec<MetricKey>,

    /// When the publish was committed
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    current: MetricValue,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<MetricKey, Entry>,
    changed: BTreeSet<MetricKey>,
}

/// Thread-safe store of the current value of every metric
#[derive(Debug)]
pub struct ObservableStore {
    inner: RwLock<Inner>,
    update_tx: broadcast::Sender<StoreUpdate>,
}

impl ObservableStore {
    /// Create a store holding every metric of every target, all alarmed
    pub fn new(targets: &[Target]) -> Self {
        let mut entries = BTreeMap::new();
        for target in targets {
            for group in MetricGroup::ALL {
                for field in group.fields() {
                    entries.insert(
                        MetricKey::new(target.identity_arc(), group, field.name),
                        Entry {
                            current: MetricValue::alarm(field.kind),
                            updated_at: None,
                        },
                    );
                }
            }
        }

        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            inner: RwLock::new(Inner {
                entries,
                changed: BTreeSet::new(),
            }),
            update_tx,
        }
    }

    /// Atomically replace the listed keys
    ///
    /// Keys not listed keep their current value. Readers observe either the
    /// state before or after the whole batch. Keys the store was not created
    /// with are dropped, so the set of keys never changes.
    pub fn publish<I>(&self, updates: I)
    where
        I: IntoIterator<Item = (MetricKey, MetricValue)>,
    {
        let timestamp = Utc::now();
        let mut keys = Vec::new();

        {
            let mut inner = self.inner.write();
            for (key, value) in updates {
                let Some(entry) = inner.entries.get_mut(&key) else {
                    warn!("ignoring update of unknown metric {key}");
                    continue;
                };
                entry.current = value;
                entry.updated_at = Some(timestamp);
                inner.changed.insert(key.clone());
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return;
        }

        // No subscriber is fine, the values are still in the store.
        match self.update_tx.send(StoreUpdate { keys, timestamp }) {
            Ok(receivers) => trace!("notified {receivers} store subscribers"),
            Err(_) => trace!("no store subscribers"),
        }
    }

    /// Point-in-time copy of every metric
    pub fn snapshot(&self) -> BTreeMap<MetricKey, MetricValue> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.current.clone()))
            .collect()
    }

    pub fn get(&self, key: &MetricKey) -> Option<MetricValue> {
        self.inner
            .read()
            .entries
            .get(key)
            .map(|entry| entry.current.clone())
    }

    /// When the key was last published, `None` if it never was
    pub fn last_updated(&self, key: &MetricKey) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .entries
            .get(key)
            .and_then(|entry| entry.updated_at)
    }

    pub fn keys(&self) -> Vec<MetricKey> {
        self.inner.read().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Drain the keys published since the previous call
    pub fn take_changed(&self) -> Vec<MetricKey> {
        let mut inner = self.inner.write();
        std::mem::take(&mut inner.changed).into_iter().collect()
    }

    /// Subscribe to publish notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.update_tx.subscribe()
    }
}
