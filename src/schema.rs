//! Static catalog of the metrics exposed for every monitored appliance
//!
//! Metrics are split into three groups, each fetched from its own management
//! endpoint and polled independently:
//!
//! - **Instance**: overall status of the node, taken from the cluster-wide
//!   instance list by matching the `instance` member against the identity
//! - **Appliance**: per-appliance counters, delivered as `{name, value}` records
//! - **Storage**: capacity of the short, medium and long term stores, delivered
//!   as one record per tier
//!
//! The catalog drives both the store layout (one key per field) and response
//! validation (which record, which member, which type).

use std::fmt;

use serde::Serialize;
use url::Url;

/// One of the independently polled metric groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricGroup {
    Instance,
    Appliance,
    Storage,
}

/// Semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Float,
}

/// Which record of a response carries a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSelector {
    /// The instance-list entry whose `instance` member equals the target identity
    Instance,

    /// The record whose `name` member equals the label
    Named(&'static str),
}

/// Description of one metric field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name, also the last component of the exported PV name
    pub name: &'static str,

    /// Record holding the field
    pub selector: RecordSelector,

    /// JSON member read from the selected record
    pub key: &'static str,

    pub kind: FieldKind,

    /// Engineering unit shown to clients
    pub unit: Option<&'static str>,

    /// Display precision for floating point fields
    pub precision: Option<u8>,
}

impl FieldSpec {
    const fn string(name: &'static str) -> Self {
        Self {
            name,
            selector: RecordSelector::Instance,
            key: name,
            kind: FieldKind::String,
            unit: None,
            precision: None,
        }
    }

    const fn integer(name: &'static str) -> Self {
        Self {
            kind: FieldKind::Integer,
            ..Self::string(name)
        }
    }

    const fn tier(
        name: &'static str,
        label: &'static str,
        key: &'static str,
        unit: &'static str,
    ) -> Self {
        Self {
            name,
            selector: RecordSelector::Named(label),
            key,
            kind: FieldKind::Float,
            unit: Some(unit),
            precision: Some(2),
        }
    }
}

/// Label of the appliance metrics record holding the paused PV count
pub const PAUSED_PV_COUNT_LABEL: &str = "Paused PV count";

const INSTANCE_FIELDS: [FieldSpec; 6] = [
    FieldSpec::string("status"),
    FieldSpec::string("MGMT_uptime"),
    FieldSpec::integer("pvCount"),
    FieldSpec::integer("connectedPVCount"),
    FieldSpec::integer("disconnectedPVCount"),
    FieldSpec {
        kind: FieldKind::Float,
        unit: Some("GB/day"),
        precision: Some(2),
        ..FieldSpec::string("dataRateGBPerDay")
    },
];

const APPLIANCE_FIELDS: [FieldSpec; 1] = [FieldSpec {
    name: "pausedPVCount",
    selector: RecordSelector::Named(PAUSED_PV_COUNT_LABEL),
    key: "value",
    kind: FieldKind::Integer,
    unit: None,
    precision: None,
}];

const STORAGE_FIELDS: [FieldSpec; 9] = [
    FieldSpec::tier("sts_total_space", "STS", "total_space", "GB"),
    FieldSpec::tier("sts_available_space", "STS", "available_space", "GB"),
    FieldSpec::tier(
        "sts_available_space_percent",
        "STS",
        "available_space_percent",
        "%",
    ),
    FieldSpec::tier("mts_total_space", "MTS", "total_space", "GB"),
    FieldSpec::tier("mts_available_space", "MTS", "available_space", "GB"),
    FieldSpec::tier(
        "mts_available_space_percent",
        "MTS",
        "available_space_percent",
        "%",
    ),
    FieldSpec::tier("lts_total_space", "LTS", "total_space", "GB"),
    FieldSpec::tier("lts_available_space", "LTS", "available_space", "GB"),
    FieldSpec::tier(
        "lts_available_space_percent",
        "LTS",
        "available_space_percent",
        "%",
    ),
];

impl MetricGroup {
    pub const ALL: [MetricGroup; 3] = [
        MetricGroup::Instance,
        MetricGroup::Appliance,
        MetricGroup::Storage,
    ];

    /// Ordered field list of this group
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            MetricGroup::Instance => &INSTANCE_FIELDS,
            MetricGroup::Appliance => &APPLIANCE_FIELDS,
            MetricGroup::Storage => &STORAGE_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|field| field.name == name)
    }

    /// Whether the group is delivered as a list of `{name, ...}` records
    pub fn uses_named_records(self) -> bool {
        !matches!(self, MetricGroup::Instance)
    }

    /// Management endpoint of this group on the given appliance
    ///
    /// The instance list is shared by the whole cluster, the other two are
    /// requested for one appliance identity.
    pub fn endpoint(self, base: &Url, identity: &str) -> Url {
        let operation = match self {
            MetricGroup::Instance => "getInstanceMetrics",
            MetricGroup::Appliance => "getApplianceMetricsForAppliance",
            MetricGroup::Storage => "getStorageMetricsForAppliance",
        };

        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["mgmt", "bpl", operation]);
        }
        if self.uses_named_records() {
            url.query_pairs_mut().append_pair("appliance", identity);
        }
        url
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricGroup::Instance => "instance",
            MetricGroup::Appliance => "appliance",
            MetricGroup::Storage => "storage",
        }
    }
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
