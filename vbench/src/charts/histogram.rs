// Copyright (c) Facebook, Inc. and its affiliates.
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::super::stats::round_to;
use super::Chart;
use vbench_intf::{IterationResult, ScenarioInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramMethod {
    SquareRoot,
    Sturges,
    Rice,
}

impl HistogramMethod {
    pub const ALL: [HistogramMethod; 3] = [Self::SquareRoot, Self::Sturges, Self::Rice];

    pub fn title(&self) -> &'static str {
        match self {
            Self::SquareRoot => "Square Root Choice",
            Self::Sturges => "Sturges Formula",
            Self::Rice => "Rice Rule",
        }
    }

    pub fn nr_bins(&self, nr_samples: usize) -> usize {
        if nr_samples == 0 {
            return 0;
        }
        let n = nr_samples as f64;
        let bins = match self {
            Self::SquareRoot => n.sqrt().ceil(),
            Self::Sturges => n.log2().ceil() + 1.0,
            Self::Rice => (2.0 * n.cbrt()).ceil(),
        };
        (bins as usize).max(1)
    }
}

/// Bins `values` evenly over [min, max]. Each bin is reported by its upper
/// edge.
fn bins(values: &[f64], nr_bins: usize) -> Vec<(f64, u32)> {
    if values.is_empty() || nr_bins == 0 {
        return vec![];
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let step = (max - min) / nr_bins as f64;

    let mut counts = vec![0u32; nr_bins];
    for v in values.iter() {
        let idx = if step > 0.0 {
            ((v - min) / step) as usize
        } else {
            0
        };
        counts[idx.min(nr_bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, cnt)| (round_to(min + step * (i + 1) as f64, 3), cnt))
        .collect()
}

/// One view per binning method, each carrying a series per key.
fn render_views<'a, I>(series: I) -> Value
where
    I: Iterator<Item = (&'a str, &'a Vec<f64>)> + Clone,
{
    let views: Vec<Value> = HistogramMethod::ALL
        .iter()
        .map(|method| {
            let keyed: Vec<Value> = series
                .clone()
                .map(|(key, values)| {
                    json!({
                        "key": key,
                        "values": bins(values, method.nr_bins(values.len())),
                    })
                })
                .collect();
            json!({"method": method.title(), "series": keyed})
        })
        .collect();
    Value::Array(views)
}

/// Histogram of the total duration of the successful iterations.
#[derive(Debug, Default)]
pub struct MainHistogramChart {
    durations: Vec<f64>,
}

impl MainHistogramChart {
    pub fn new(_info: &ScenarioInfo) -> Self {
        Default::default()
    }
}

impl Chart for MainHistogramChart {
    fn add_iteration(&mut self, itr: &IterationResult) {
        if !itr.failed() {
            self.durations.push(itr.duration);
        }
    }

    fn render(&self) -> Value {
        render_views(std::iter::once(("task", &self.durations)))
    }
}

#[derive(Debug)]
pub struct AtomicHistogramChart {
    durations: BTreeMap<String, Vec<f64>>,
}

impl AtomicHistogramChart {
    pub fn new(info: &ScenarioInfo) -> Self {
        Self {
            durations: info
                .atomic
                .keys()
                .map(|name| (name.clone(), vec![]))
                .collect(),
        }
    }
}

impl Chart for AtomicHistogramChart {
    fn add_iteration(&mut self, itr: &IterationResult) {
        if itr.failed() {
            return;
        }
        for (name, dur) in itr.atomic_actions.iter() {
            self.durations.entry(name.clone()).or_default().push(*dur);
        }
    }

    fn render(&self) -> Value {
        render_views(
            self.durations
                .iter()
                .map(|(name, values)| (name.as_str(), values)),
        )
    }
}
