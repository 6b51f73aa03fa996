// Copyright (c) Facebook, Inc. and its affiliates.
//
// Trends group scenario results by workload config. Results whose configs
// canonicalize identically are merged into one record carrying a series
// per stat kind for "total" and every atomic action.
//
use anyhow::Result;
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashMap;

use super::canon::{config_hash, ConfigValue};
use super::extend::extend_results;
use super::stats::{parse_stat_table, DurationKind, StatRow, TOTAL};
use vb_util::*;
use vbench_intf::{ScenarioResult, StatValue, TaskResult};

pub type Series<T> = Vec<(u32, T)>;

#[derive(Clone, Debug, Default)]
struct ActionTrend {
    durations: [Series<StatValue>; 6],
    success: Series<f64>,
}

impl ActionTrend {
    fn push(&mut self, nr: u32, row: &StatRow, success: f64) {
        for kind in DurationKind::ALL.iter() {
            self.durations[*kind as usize].push((nr, row.duration(*kind)));
        }
        self.success.push((nr, success));
    }

    fn durations(&self, kind: DurationKind) -> &Series<StatValue> {
        &self.durations[kind as usize]
    }

    fn record(&self, name: &str) -> TrendAction {
        TrendAction {
            name: name.into(),
            values: DurationKind::ALL
                .iter()
                .map(|kind| (kind.key(), self.durations(*kind).clone()))
                .collect(),
            success: vec![("success", self.success.clone())],
        }
    }
}

#[derive(Clone, Debug)]
struct TrendGroup {
    seq: usize,
    name: String,
    cls: String,
    met: String,
    config: String,
    merged: u32,
    sla_failures: usize,
    total: ActionTrend,
    atomic: Vec<(String, ActionTrend)>,
}

impl TrendGroup {
    fn stat(&self) -> TrendStat {
        let nums = |kind| {
            self.total
                .durations(kind)
                .iter()
                .filter_map(|(_, v)| v.as_f64())
                .collect::<Vec<f64>>()
        };

        let min = nums(DurationKind::Min).into_iter().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |acc| acc.min(v)))
        });
        let max = nums(DurationKind::Max).into_iter().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |acc| acc.max(v)))
        });
        let avgs = nums(DurationKind::Avg);
        let avg = if avgs.is_empty() {
            None
        } else {
            Some(statistical::mean(&avgs))
        };

        TrendStat { min, max, avg }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendStat {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendAction {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub values: Vec<(&'static str, Series<StatValue>)>,
    pub success: Vec<(&'static str, Series<f64>)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendRecord {
    pub cls: String,
    pub met: String,
    pub name: String,
    pub config: String,
    pub seq: usize,
    pub single: bool,
    pub length: u32,
    pub sla_failures: usize,
    pub stat: TrendStat,
    pub total: TrendAction,
    pub atomic: Vec<TrendAction>,
}

#[derive(Debug, Default)]
pub struct Trends {
    groups: Vec<TrendGroup>,
    by_hash: HashMap<String, usize>,
}

impl Trends {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Merge `result` into the group of its config. The stat table is fully
    /// validated before anything is recorded.
    pub fn add_result(&mut self, result: &ScenarioResult) -> Result<()> {
        let hash = config_hash(&ConfigValue::from(&result.key.kw))?;
        let rows = parse_stat_table(&result.info.stat)?
            .into_iter()
            .map(|row| -> Result<(StatRow, f64)> {
                let success = row.success_pct()?;
                Ok((row, success))
            })
            .collect::<Result<Vec<(StatRow, f64)>>>()?;

        let idx = match self.by_hash.get(&hash) {
            Some(idx) => *idx,
            None => {
                let (cls, met) = result.key.cls_met();
                let group = TrendGroup {
                    seq: self.groups.len() + 1,
                    name: result.key.name.clone(),
                    cls: cls.into(),
                    met: met.into(),
                    config: serde_json::to_string_pretty(&result.key.kw)?,
                    merged: 0,
                    sla_failures: 0,
                    total: Default::default(),
                    atomic: vec![],
                };
                debug!(
                    "trends: new group {} for {:?} ({})",
                    group.seq, &group.name, &hash
                );
                self.groups.push(group);
                self.by_hash.insert(hash.clone(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[idx];
        group.merged += 1;
        if !result.sla_success() {
            group.sla_failures += 1;
        }

        let nr = group.merged;
        for (row, success) in rows.iter() {
            let trend = if row.name == TOTAL {
                &mut group.total
            } else {
                let pos = match group.atomic.iter().position(|(name, _)| *name == row.name) {
                    Some(pos) => pos,
                    None => {
                        group.atomic.push((row.name.clone(), Default::default()));
                        group.atomic.len() - 1
                    }
                };
                &mut group.atomic[pos].1
            };
            trend.push(nr, row, *success);
        }
        trace!("trends: {:?} merged {} into group {}", &result.key.name, nr, group.seq);
        Ok(())
    }

    /// One record per distinct config in first-seen order.
    pub fn get_data(&self) -> Vec<TrendRecord> {
        self.groups
            .iter()
            .map(|group| TrendRecord {
                cls: group.cls.clone(),
                met: group.met.clone(),
                name: group.name.clone(),
                config: group.config.clone(),
                seq: group.seq,
                single: group.merged == 1,
                length: group.merged,
                sla_failures: group.sla_failures,
                stat: group.stat(),
                total: group.total.record(""),
                atomic: group
                    .atomic
                    .iter()
                    .map(|(name, trend)| trend.record(name))
                    .collect(),
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TrendsReport {
    pub version: String,
    pub created_at: String,
    pub data: Vec<TrendRecord>,
}

impl JsonSave for TrendsReport {}

pub fn trends(task_results: &[TaskResult]) -> Result<TrendsReport> {
    let mut trends = Trends::new();
    for res in extend_results(task_results).iter() {
        trends.add_result(res)?;
    }
    debug!(
        "trends: {} results in {} groups",
        task_results.len(),
        trends.len()
    );

    Ok(TrendsReport {
        version: vbench_intf::FULL_VERSION.clone(),
        created_at: format_unix_time(unix_now()),
        data: trends.get_data(),
    })
}
