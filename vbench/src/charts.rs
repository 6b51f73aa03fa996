// Copyright (c) Facebook, Inc. and its affiliates.
//
// Chart payloads for the scenario report. A chart is built from the
// scenario info, fed every iteration in order and then rendered into an
// opaque JSON payload for the report template.
//
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::stats::{round_to, StatsTable};
use vbench_intf::{IterationResult, ScenarioInfo};

mod histogram;
mod output;

pub use histogram::{AtomicHistogramChart, HistogramMethod, MainHistogramChart};
pub use output::{
    complete_output, find_output_plugin, AdditiveOutputChart, ChartError, OutputPlugin, Widget,
};

pub const LOAD_PROFILE_STEPS: usize = 100;

pub trait Chart {
    fn add_iteration(&mut self, itr: &IterationResult);
    fn render(&self) -> Value;
}

type Series = Vec<(u32, f64)>;

/// Per-iteration duration and idle time. A failed iteration shows up only
/// in the failed_duration series.
#[derive(Debug, Default)]
pub struct MainStackedAreaChart {
    nr: u32,
    duration: Series,
    idle_duration: Series,
    failed_duration: Series,
}

impl MainStackedAreaChart {
    pub fn new(_info: &ScenarioInfo) -> Self {
        Default::default()
    }
}

impl Chart for MainStackedAreaChart {
    fn add_iteration(&mut self, itr: &IterationResult) {
        self.nr += 1;
        let (dur, idle, failed) = if itr.failed() {
            (0.0, 0.0, itr.duration + itr.idle_duration)
        } else {
            (itr.duration, itr.idle_duration, 0.0)
        };
        self.duration.push((self.nr, dur));
        self.idle_duration.push((self.nr, idle));
        self.failed_duration.push((self.nr, failed));
    }

    fn render(&self) -> Value {
        json!([
            ["duration", self.duration],
            ["idle_duration", self.idle_duration],
            ["failed_duration", self.failed_duration],
        ])
    }
}

#[derive(Debug, Default)]
pub struct MainStatsTable {
    table: StatsTable,
}

impl MainStatsTable {
    pub fn new(_info: &ScenarioInfo) -> Self {
        Default::default()
    }
}

impl Chart for MainStatsTable {
    fn add_iteration(&mut self, itr: &IterationResult) {
        self.table.add_iteration(itr);
    }

    fn render(&self) -> Value {
        let table = self.table.table();
        json!({"cols": table.cols, "rows": table.rows})
    }
}

/// Number of iterations in flight sampled at both ends of each of the
/// LOAD_PROFILE_STEPS equal steps over the load window.
#[derive(Debug)]
pub struct LoadProfileChart {
    tstamp_start: f64,
    tstamp_end: f64,
    spans: Vec<(f64, f64)>,
}

impl LoadProfileChart {
    pub fn new(info: &ScenarioInfo) -> Self {
        Self {
            tstamp_start: info.tstamp_start,
            tstamp_end: info.tstamp_end,
            spans: vec![],
        }
    }

    fn points(&self) -> Series {
        let window = self.tstamp_end - self.tstamp_start;
        if window <= 0.0 {
            return vec![];
        }
        let step = window / LOAD_PROFILE_STEPS as f64;
        (0..=LOAD_PROFILE_STEPS)
            .map(|i| {
                let at = self.tstamp_start + step * i as f64;
                let running = self
                    .spans
                    .iter()
                    .filter(|(start, end)| *start <= at && at < *end)
                    .count();
                (i as u32, running as f64)
            })
            .collect()
    }
}

impl Chart for LoadProfileChart {
    fn add_iteration(&mut self, itr: &IterationResult) {
        self.spans
            .push((itr.timestamp, itr.timestamp + itr.duration));
    }

    fn render(&self) -> Value {
        let window = self.tstamp_end - self.tstamp_start;
        let step = window / LOAD_PROFILE_STEPS as f64;
        let points: Vec<(f64, f64)> = self
            .points()
            .into_iter()
            .map(|(i, cnt)| (round_to(step * i as f64, 2), cnt))
            .collect();
        json!([["parallel iterations", points]])
    }
}

/// Average duration of each atomic action over the successful iterations.
#[derive(Debug)]
pub struct AtomicAvgChart {
    sums: BTreeMap<String, (f64, u32)>,
}

impl AtomicAvgChart {
    pub fn new(info: &ScenarioInfo) -> Self {
        Self {
            sums: info
                .atomic
                .keys()
                .map(|name| (name.clone(), (0.0, 0)))
                .collect(),
        }
    }
}

impl Chart for AtomicAvgChart {
    fn add_iteration(&mut self, itr: &IterationResult) {
        if itr.failed() {
            return;
        }
        for (name, dur) in itr.atomic_actions.iter() {
            let (sum, cnt) = self.sums.entry(name.clone()).or_insert((0.0, 0));
            *sum += dur;
            *cnt += 1;
        }
    }

    fn render(&self) -> Value {
        let pie: Vec<(&str, f64)> = self
            .sums
            .iter()
            .map(|(name, (sum, cnt))| {
                let avg = match cnt {
                    0 => 0.0,
                    cnt => round_to(sum / *cnt as f64, 3),
                };
                (name.as_str(), avg)
            })
            .collect();
        json!(pie)
    }
}

#[derive(Debug)]
pub struct AtomicStackedAreaChart {
    nr: u32,
    series: BTreeMap<String, Series>,
    failed_duration: Series,
}

impl AtomicStackedAreaChart {
    pub fn new(info: &ScenarioInfo) -> Self {
        Self {
            nr: 0,
            series: info
                .atomic
                .keys()
                .map(|name| (name.clone(), vec![]))
                .collect(),
            failed_duration: vec![],
        }
    }
}

impl Chart for AtomicStackedAreaChart {
    fn add_iteration(&mut self, itr: &IterationResult) {
        self.nr += 1;
        let failed = itr.failed();
        for (name, series) in self.series.iter_mut() {
            let dur = if failed {
                0.0
            } else {
                itr.atomic_actions.get(name).copied().unwrap_or(0.0)
            };
            series.push((self.nr, dur));
        }
        let failed_dur = if failed {
            itr.duration + itr.idle_duration
        } else {
            0.0
        };
        self.failed_duration.push((self.nr, failed_dur));
    }

    fn render(&self) -> Value {
        let mut rendered: Vec<Value> = self
            .series
            .iter()
            .map(|(name, series)| json!([name, series]))
            .collect();
        if self.failed_duration.iter().any(|(_, dur)| *dur > 0.0) {
            rendered.push(json!(["failed_duration", self.failed_duration]));
        }
        Value::Array(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbench_intf::AtomicInfo;

    fn iteration(timestamp: f64, duration: f64, atomics: &[(&str, f64)], failed: bool) -> IterationResult {
        IterationResult {
            timestamp,
            duration,
            idle_duration: 0.5,
            error: if failed {
                vec!["E".into(), "msg".into(), "trace".into()]
            } else {
                vec![]
            },
            atomic_actions: atomics.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ..Default::default()
        }
    }

    fn info() -> ScenarioInfo {
        let mut info = ScenarioInfo {
            tstamp_start: 10.0,
            tstamp_end: 20.0,
            ..Default::default()
        };
        for name in &["a", "b"] {
            info.atomic.insert(name.to_string(), AtomicInfo::default());
        }
        info
    }

    #[test]
    fn test_main_stacked_area() {
        let mut chart = MainStackedAreaChart::new(&info());
        chart.add_iteration(&iteration(10.0, 2.0, &[], false));
        chart.add_iteration(&iteration(11.0, 3.0, &[], true));
        assert_eq!(
            chart.render(),
            json!([
                ["duration", [[1, 2.0], [2, 0.0]]],
                ["idle_duration", [[1, 0.5], [2, 0.0]]],
                ["failed_duration", [[1, 0.0], [2, 3.5]]],
            ])
        );
    }

    #[test]
    fn test_load_profile() {
        let mut chart = LoadProfileChart::new(&info());
        chart.add_iteration(&iteration(10.0, 5.0, &[], false));
        chart.add_iteration(&iteration(12.0, 8.0, &[], false));

        let points = chart.points();
        assert_eq!(points.len(), LOAD_PROFILE_STEPS + 1);
        assert_eq!(points[0], (0, 1.0));
        assert_eq!(points[30], (30, 2.0));
        assert_eq!(points[60], (60, 1.0));
        assert_eq!(points[100], (100, 0.0));

        let rendered = chart.render();
        assert_eq!(rendered[0][0], json!("parallel iterations"));
        assert_eq!(rendered[0][1][40], json!([4.0, 2.0]));

        let empty = LoadProfileChart::new(&ScenarioInfo::default());
        assert_eq!(empty.render(), json!([["parallel iterations", []]]));
    }

    #[test]
    fn test_atomic_charts() {
        let mut avg = AtomicAvgChart::new(&info());
        let mut area = AtomicStackedAreaChart::new(&info());
        for itr in &[
            iteration(10.0, 3.0, &[("a", 1.0), ("b", 2.0)], false),
            iteration(13.0, 4.0, &[("a", 2.0)], false),
            iteration(17.0, 1.0, &[("a", 9.0)], true),
        ] {
            avg.add_iteration(itr);
            area.add_iteration(itr);
        }

        assert_eq!(avg.render(), json!([["a", 1.5], ["b", 2.0]]));
        assert_eq!(
            area.render(),
            json!([
                ["a", [[1, 1.0], [2, 2.0], [3, 0.0]]],
                ["b", [[1, 2.0], [2, 0.0], [3, 0.0]]],
                ["failed_duration", [[1, 0.0], [2, 0.0], [3, 1.5]]],
            ])
        );
    }

    #[test]
    fn test_main_stats_table() {
        let mut chart = MainStatsTable::new(&info());
        chart.add_iteration(&iteration(10.0, 2.0, &[("a", 1.0)], false));
        let rendered = chart.render();
        assert_eq!(rendered["cols"][0], json!("Action"));
        assert_eq!(rendered["rows"][0], json!(["a", 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, "100.0%", 1]));
        assert_eq!(rendered["rows"][1][0], json!("total"));
    }
}
