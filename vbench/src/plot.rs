// Copyright (c) Facebook, Inc. and its affiliates.
//
// Per-scenario report records. Every scenario result is run through the
// chart set and flattened into the record the report template consumes.
//
use anyhow::Result;
use log::{debug, warn};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::charts::{
    complete_output, AdditiveOutputChart, AtomicAvgChart, AtomicHistogramChart,
    AtomicStackedAreaChart, Chart, LoadProfileChart, MainHistogramChart, MainStackedAreaChart,
    MainStatsTable,
};
use super::extend::extend_results;
use vb_util::*;
use vbench_intf::{ScenarioResult, SlaResult, TaskResult};

#[derive(Clone, Debug, Serialize)]
pub struct IterationCharts {
    pub iter: Value,
    pub pie: Vec<(&'static str, usize)>,
    pub histogram: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct AtomicCharts {
    pub histogram: Value,
    pub iter: Value,
    pub pie: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationError {
    pub iteration: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub traceback: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioRecord {
    pub cls: String,
    pub met: String,
    pub pos: String,
    pub name: String,
    pub runner: Option<String>,
    pub config: String,
    pub iterations: IterationCharts,
    pub load_profile: Value,
    pub atomic: AtomicCharts,
    pub table: Value,
    pub additive_output: Vec<Value>,
    pub complete_output: Vec<Vec<Value>>,
    pub output_errors: Vec<(usize, String)>,
    pub errors: Vec<IterationError>,
    pub load_duration: f64,
    pub full_duration: f64,
    pub sla: Vec<SlaResult>,
    pub sla_success: bool,
    pub iterations_count: usize,
    pub has_output: bool,

    #[serde(skip)]
    pub pos_idx: usize,
}

fn iteration_error(nr: usize, error: &[String]) -> IterationError {
    let field = |idx: usize| error.get(idx).cloned().unwrap_or_default();
    IterationError {
        iteration: nr,
        kind: field(0),
        message: field(1),
        traceback: field(2),
    }
}

pub fn process_scenario(data: &ScenarioResult, pos: usize) -> Result<ScenarioRecord> {
    let info = &data.info;
    let mut main_area = MainStackedAreaChart::new(info);
    let mut main_hist = MainHistogramChart::new(info);
    let mut main_stat = MainStatsTable::new(info);
    let mut load_profile = LoadProfileChart::new(info);
    let mut atomic_pie = AtomicAvgChart::new(info);
    let mut atomic_area = AtomicStackedAreaChart::new(info);
    let mut atomic_hist = AtomicHistogramChart::new(info);

    let mut errors = vec![];
    let mut output_errors = vec![];
    let mut additive_charts: Vec<AdditiveOutputChart> = vec![];
    let mut complete = vec![];

    for (nr, itr) in data.iterations.iter().enumerate().map(|(i, itr)| (i + 1, itr)) {
        if itr.failed() {
            errors.push(iteration_error(nr, &itr.error));
        }

        for (idx, out) in itr.output.additive.iter().enumerate() {
            if idx >= additive_charts.len() {
                additive_charts.push(AdditiveOutputChart::new(out)?);
            }
            if let Err(e) = additive_charts[idx].add_output(out) {
                warn!("plot: {:?} iteration {}: {}", &data.key.name, nr, &e);
                output_errors.push((nr, e.to_string()));
            }
        }

        complete.push(
            itr.output
                .complete
                .iter()
                .map(complete_output)
                .collect::<std::result::Result<Vec<Value>, _>>()?,
        );

        let charts: [&mut dyn Chart; 7] = [
            &mut main_area,
            &mut main_hist,
            &mut main_stat,
            &mut load_profile,
            &mut atomic_pie,
            &mut atomic_area,
            &mut atomic_hist,
        ];
        for chart in charts {
            chart.add_iteration(itr);
        }
    }

    let (cls, met) = data.key.cls_met();
    let nr_iters = data.iterations.len();
    let nr_errors = errors.len();
    let additive_output: Vec<Value> = additive_charts.iter().map(|c| c.render()).collect();
    let has_output =
        !additive_output.is_empty() || complete.iter().any(|outs| !outs.is_empty());

    Ok(ScenarioRecord {
        cls: cls.into(),
        met: met.into(),
        pos: pos.to_string(),
        name: format!("{} [{}]", met, pos + 1),
        runner: data.key.runner_type().map(|s| s.to_string()),
        config: serde_json::to_string_pretty(&json!({ data.key.name.as_str(): [data.key.kw] }))?,
        iterations: IterationCharts {
            iter: main_area.render(),
            pie: vec![("success", nr_iters - nr_errors), ("errors", nr_errors)],
            histogram: main_hist.render(),
        },
        load_profile: load_profile.render(),
        atomic: AtomicCharts {
            histogram: atomic_hist.render(),
            iter: atomic_area.render(),
            pie: atomic_pie.render(),
        },
        table: main_stat.render(),
        additive_output,
        complete_output: complete,
        output_errors,
        errors,
        load_duration: info.load_duration,
        full_duration: info.full_duration,
        sla: data.sla.clone(),
        sla_success: data.sla_success(),
        iterations_count: nr_iters,
        has_output,
        pos_idx: pos,
    })
}

/// Scenario name to every config it ran with, serialized in first-seen
/// name order.
struct Source<'a>(Vec<(&'a str, Vec<&'a Value>)>);

impl Serialize for Source<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, kws)| (name, kws)))
    }
}

/// Returns the source blob and the records sorted by class, method and
/// position. Positions count prior results of the same scenario name.
pub fn process_tasks(results: &[ScenarioResult]) -> Result<(String, Vec<ScenarioRecord>)> {
    let mut source = Source(vec![]);
    let mut positions = HashMap::<&str, usize>::new();
    let mut records = vec![];

    for res in results.iter() {
        let name = res.key.name.as_str();
        match source.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, kws)) => kws.push(&res.key.kw),
            None => source.0.push((name, vec![&res.key.kw])),
        }

        let pos = positions.entry(name).or_insert(0);
        records.push(process_scenario(res, *pos)?);
        *pos += 1;
    }

    records.sort_by(|a, b| (&a.cls, &a.met, a.pos_idx).cmp(&(&b.cls, &b.met, b.pos_idx)));
    Ok((serde_json::to_string_pretty(&source)?, records))
}

#[derive(Clone, Debug, Serialize)]
pub struct TaskReport {
    pub version: String,
    pub created_at: String,
    pub source: String,
    pub data: Vec<ScenarioRecord>,
}

impl JsonSave for TaskReport {}

pub fn plot(task_results: &[TaskResult]) -> Result<TaskReport> {
    let (source, data) = process_tasks(&extend_results(task_results))?;
    debug!("plot: {} scenario records", data.len());

    Ok(TaskReport {
        version: vbench_intf::FULL_VERSION.clone(),
        created_at: format_unix_time(unix_now()),
        source,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbench_intf::IterationResult;

    fn scenario(name: &str, kw: Value, errors: &[bool]) -> ScenarioResult {
        let iterations: Vec<IterationResult> = errors
            .iter()
            .enumerate()
            .map(|(i, failed)| IterationResult {
                timestamp: i as f64,
                duration: 1.0 + i as f64,
                error: if *failed {
                    vec!["KeyError".into(), "boom".into(), "Traceback".into()]
                } else {
                    vec![]
                },
                atomic_actions: vec![("act".to_string(), 0.5)].into_iter().collect(),
                ..Default::default()
            })
            .collect();
        let mut res = ScenarioResult {
            key: serde_json::from_value(json!({"name": name, "pos": 0, "kw": kw})).unwrap(),
            iterations,
            ..Default::default()
        };
        res.info.iterations_count = errors.len();
        res
    }

    #[test]
    fn test_process_scenario() {
        let _ = ::env_logger::try_init();

        let mut res = scenario(
            "Foo.bar",
            json!({"runner": {"type": "constant"}, "args": {"x": 1}}),
            &[false, true, false, true, true],
        );
        res.sla = vec![
            SlaResult {
                success: true,
                ..Default::default()
            },
            SlaResult {
                success: false,
                ..Default::default()
            },
        ];
        res.info.load_duration = 3.0;

        let rec = process_scenario(&res, 1).unwrap();
        assert_eq!(rec.cls, "Foo");
        assert_eq!(rec.met, "bar");
        assert_eq!(rec.pos, "1");
        assert_eq!(rec.name, "bar [2]");
        assert_eq!(rec.runner.as_deref(), Some("constant"));
        assert_eq!(
            serde_json::from_str::<Value>(&rec.config).unwrap(),
            json!({"Foo.bar": [{"runner": {"type": "constant"}, "args": {"x": 1}}]})
        );
        assert_eq!(rec.iterations.pie, vec![("success", 2), ("errors", 3)]);
        assert_eq!(rec.errors.len(), 3);
        assert_eq!(
            rec.errors[0],
            IterationError {
                iteration: 2,
                kind: "KeyError".into(),
                message: "boom".into(),
                traceback: "Traceback".into(),
            }
        );
        assert!(!rec.sla_success);
        assert_eq!(rec.iterations_count, 5);
        assert_eq!(rec.load_duration, 3.0);
        assert_eq!(rec.complete_output, vec![Vec::<Value>::new(); 5]);
        assert!(!rec.has_output);

        let serialized = serde_json::to_value(&rec).unwrap();
        assert_eq!(serialized["iterations"]["pie"], json!([["success", 2], ["errors", 3]]));
        assert_eq!(serialized["errors"][0]["type"], json!("KeyError"));
        assert!(serialized.get("pos_idx").is_none());
    }

    #[test]
    fn test_process_scenario_outputs() {
        let mut res = scenario("Foo.bar", json!({}), &[false, false]);
        res.iterations[0].output = serde_json::from_value(json!({
            "additive": [{"title": "t", "chart_plugin": "Lines", "data": [["x", 1]]}],
            "complete": [{"title": "c", "chart_plugin": "TextArea", "data": ["txt"]}],
        }))
        .unwrap();
        res.iterations[1].output = serde_json::from_value(json!({
            "additive": [{"title": "t", "chart_plugin": "Lines", "data": "garbage"}],
        }))
        .unwrap();

        let rec = process_scenario(&res, 0).unwrap();
        assert_eq!(rec.name, "bar [1]");
        assert_eq!(rec.runner, None);
        assert!(rec.has_output);
        assert_eq!(rec.additive_output.len(), 1);
        assert_eq!(rec.additive_output[0]["data"], json!([["x", [[1, 1.0]]]]));
        assert_eq!(rec.complete_output[0][0]["widget"], json!("TextArea"));
        assert!(rec.complete_output[1].is_empty());
        assert_eq!(rec.output_errors.len(), 1);
        assert_eq!(rec.output_errors[0].0, 2);

        res.iterations[1].output.complete = serde_json::from_value(
            json!([{"title": "c", "chart_plugin": "Bogus", "data": []}]),
        )
        .unwrap();
        assert!(process_scenario(&res, 0).is_err());
    }

    #[test]
    fn test_pie_counts() {
        for errors in &[
            vec![],
            vec![false],
            vec![true],
            vec![true, true, false],
            vec![false, false, false, true],
        ] {
            let rec = process_scenario(&scenario("A.b", json!({}), errors), 0).unwrap();
            let nr_errors = errors.iter().filter(|e| **e).count();
            assert_eq!(
                rec.iterations.pie,
                vec![("success", errors.len() - nr_errors), ("errors", nr_errors)]
            );
            assert!(rec.sla_success);
        }
    }

    #[test]
    fn test_process_tasks() {
        let results = vec![
            scenario("Foo.bar", json!({"n": 1}), &[false]),
            scenario("Abc.def", json!({"n": 2}), &[false]),
            scenario("Foo.bar", json!({"n": 3}), &[true]),
            scenario("Foo.bar", json!({"n": 1}), &[false]),
        ];

        let (source, records) = process_tasks(&results).unwrap();
        let names: Vec<(&str, &str)> =
            records.iter().map(|r| (r.name.as_str(), r.pos.as_str())).collect();
        assert_eq!(
            names,
            vec![("def [1]", "0"), ("bar [1]", "0"), ("bar [2]", "1"), ("bar [3]", "2")]
        );
        assert_eq!(records[2].errors.len(), 1);

        assert_eq!(
            serde_json::from_str::<Value>(&source).unwrap(),
            json!({"Foo.bar": [{"n": 1}, {"n": 3}, {"n": 1}], "Abc.def": [{"n": 2}]})
        );
        assert!(source.find("Foo.bar").unwrap() < source.find("Abc.def").unwrap());

        let (source, records) = process_tasks(&[]).unwrap();
        assert_eq!(source, "{}");
        assert!(records.is_empty());
    }

    #[test]
    fn test_plot() {
        let task: TaskResult = serde_json::from_value(json!({
            "key": {"name": "Foo.bar", "pos": 0, "kw": {"runner": {"type": "serial"}}},
            "sla": [],
            "result": [{"timestamp": 1.0, "duration": 2.0, "error": []}],
            "load_duration": 2.0,
            "full_duration": 3.0,
        }))
        .unwrap();

        let report = plot(&[task]).unwrap();
        assert_eq!(report.data.len(), 1);
        assert_eq!(report.data[0].full_duration, 3.0);
        assert_eq!(report.data[0].table["rows"][0][0], json!("total"));
        assert!(report.version.starts_with(env!("CARGO_PKG_VERSION")));

        let json = report.as_json().unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["data"][0]["name"], json!("bar [1]"));
    }
}
