// Copyright (c) Facebook, Inc. and its affiliates.
//
// Benchmark results as recorded by the task runner. TaskResult is the
// legacy per-workload record, ScenarioResult the extended form the report
// and trend processing consume.
//
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub name: String,
    #[serde(default)]
    pub pos: u32,
    #[serde(default)]
    pub kw: serde_json::Value,
}

impl ScenarioKey {
    /// Split "Class.method" on the first dot. A name without a dot is all
    /// class.
    pub fn cls_met(&self) -> (&str, &str) {
        match self.name.find('.') {
            Some(idx) => (&self.name[..idx], &self.name[idx + 1..]),
            None => (&self.name, ""),
        }
    }

    pub fn runner_type(&self) -> Option<&str> {
        self.kw.get("runner")?.get("type")?.as_str()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaResult {
    #[serde(default)]
    pub criterion: String,
    pub success: bool,
    #[serde(default)]
    pub detail: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputChart {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub chart_plugin: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub axis_label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationOutput {
    #[serde(default)]
    pub additive: Vec<OutputChart>,
    #[serde(default)]
    pub complete: Vec<OutputChart>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    pub timestamp: f64,
    pub duration: f64,
    #[serde(default)]
    pub idle_duration: f64,
    /// [type, message, traceback] for a failed iteration, empty otherwise.
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub atomic_actions: BTreeMap<String, f64>,
    #[serde(default)]
    pub output: IterationOutput,
}

impl IterationResult {
    pub fn failed(&self) -> bool {
        !self.error.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomicInfo {
    pub min_duration: f64,
    pub max_duration: f64,
}

/// Table of per-action duration stats. Rows are heterogeneous: the first
/// cell is the action name, the rest follow `cols`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatTable {
    pub cols: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioInfo {
    pub atomic: BTreeMap<String, AtomicInfo>,
    pub iterations_count: usize,
    pub iterations_passed: usize,
    pub min_duration: f64,
    pub max_duration: f64,
    pub tstamp_start: f64,
    pub tstamp_end: f64,
    pub full_duration: f64,
    pub load_duration: f64,
    pub output_names: Vec<String>,
    pub stat: StatTable,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub key: ScenarioKey,
    #[serde(default)]
    pub sla: Vec<SlaResult>,
    #[serde(default)]
    pub result: Vec<IterationResult>,
    #[serde(default)]
    pub load_duration: f64,
    #[serde(default)]
    pub full_duration: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub key: ScenarioKey,
    #[serde(default)]
    pub sla: Vec<SlaResult>,
    #[serde(default)]
    pub iterations: Vec<IterationResult>,
    #[serde(default)]
    pub info: ScenarioInfo,
}

impl ScenarioResult {
    /// Vacuously true without SLA criteria.
    pub fn sla_success(&self) -> bool {
        self.sla.iter().all(|sla| sla.success)
    }
}

/// A numeric stat or the "n/a" sentinel for a slot without samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatValue {
    Num(f64),
    NotAvailable,
}

impl StatValue {
    pub const NA_STR: &'static str = "n/a";

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Num(v) => Some(*v),
            Self::NotAvailable => None,
        }
    }
}

impl Default for StatValue {
    fn default() -> Self {
        Self::NotAvailable
    }
}

impl From<Option<f64>> for StatValue {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) => Self::Num(v),
            None => Self::NotAvailable,
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Num(v) => serializer.serialize_f64(*v),
            Self::NotAvailable => serializer.serialize_str(Self::NA_STR),
        }
    }
}

impl<'de> Deserialize<'de> for StatValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(v) => Ok(Self::Num(v)),
            Raw::Str(s) if s == Self::NA_STR => Ok(Self::NotAvailable),
            Raw::Str(s) => Err(serde::de::Error::custom(format!(
                "expected a number or {:?}, got {:?}",
                Self::NA_STR,
                &s
            ))),
        }
    }
}
