// Copyright (c) Facebook, Inc. and its affiliates.
//
// Scenario-provided output charts. Each output names a chart plugin which
// resolves to a widget the report knows how to draw. Additive outputs are
// merged across iterations, complete ones are shown as-is.
//
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::super::stats::{percentile, round_to};
use vbench_intf::OutputChart;

pub const DFL_AXIS_LABEL: &str = "Iteration sequence number";

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("unknown output chart plugin {0:?}")]
    UnknownPlugin(String),
    #[error("output chart plugin {0:?} can't be used for additive output")]
    NotAdditive(String),
    #[error("{plugin} output {title:?} has malformed data: {data}")]
    InvalidData {
        plugin: String,
        title: String,
        data: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    StackedArea,
    Lines,
    Pie,
    Table,
    TextArea,
}

impl Widget {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StackedArea => "StackedArea",
            Self::Lines => "Lines",
            Self::Pie => "Pie",
            Self::Table => "Table",
            Self::TextArea => "TextArea",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutputPlugin {
    pub widget: Widget,
    pub additive: bool,
}

lazy_static::lazy_static! {
    static ref OUTPUT_PLUGINS: BTreeMap<&'static str, OutputPlugin> = vec![
        ("StackedArea", OutputPlugin { widget: Widget::StackedArea, additive: true }),
        ("Lines", OutputPlugin { widget: Widget::Lines, additive: true }),
        ("Pie", OutputPlugin { widget: Widget::Pie, additive: true }),
        ("StatsTable", OutputPlugin { widget: Widget::Table, additive: true }),
        ("Table", OutputPlugin { widget: Widget::Table, additive: false }),
        ("TextArea", OutputPlugin { widget: Widget::TextArea, additive: false }),
    ]
    .into_iter()
    .collect();
}

pub fn find_output_plugin(name: &str) -> Result<OutputPlugin, ChartError> {
    OUTPUT_PLUGINS
        .get(name)
        .copied()
        .ok_or_else(|| ChartError::UnknownPlugin(name.into()))
}

/// `[[name, value], ...]` as carried by additive output data.
fn parse_pairs(out: &OutputChart) -> Result<Vec<(String, f64)>, ChartError> {
    let invalid = || ChartError::InvalidData {
        plugin: out.chart_plugin.clone(),
        title: out.title.clone(),
        data: out.data.clone(),
    };

    let items = out.data.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| match item.as_array().map(|pair| pair.as_slice()) {
            Some([Value::String(name), v]) => match v.as_f64() {
                Some(v) => Ok((name.clone(), v)),
                None => Err(invalid()),
            },
            _ => Err(invalid()),
        })
        .collect()
}

/// Accumulates one additive output position over the iterations.
#[derive(Debug)]
pub struct AdditiveOutputChart {
    widget: Widget,
    title: String,
    description: String,
    label: String,
    axis_label: String,
    nr: u32,
    series: Vec<(String, Vec<(u32, f64)>)>,
}

impl AdditiveOutputChart {
    pub fn new(out: &OutputChart) -> Result<Self, ChartError> {
        let plugin = find_output_plugin(&out.chart_plugin)?;
        if !plugin.additive {
            return Err(ChartError::NotAdditive(out.chart_plugin.clone()));
        }
        Ok(Self {
            widget: plugin.widget,
            title: out.title.clone(),
            description: out.description.clone(),
            label: out.label.clone(),
            axis_label: if out.axis_label.is_empty() {
                DFL_AXIS_LABEL.into()
            } else {
                out.axis_label.clone()
            },
            nr: 0,
            series: vec![],
        })
    }

    /// Malformed data leaves the chart untouched and is reported to the
    /// caller. The iteration still counts.
    pub fn add_output(&mut self, out: &OutputChart) -> Result<(), ChartError> {
        self.nr += 1;
        for (name, v) in parse_pairs(out)? {
            match self.series.iter_mut().find(|(n, _)| *n == name) {
                Some((_, points)) => points.push((self.nr, v)),
                None => self.series.push((name, vec![(self.nr, v)])),
            }
        }
        Ok(())
    }

    fn render_data(&self) -> Value {
        match self.widget {
            Widget::StackedArea | Widget::Lines => json!(self.series),
            Widget::Pie => {
                let nr = self.nr.max(1) as f64;
                let pie: Vec<(&str, f64)> = self
                    .series
                    .iter()
                    .map(|(name, points)| {
                        let sum: f64 = points.iter().map(|(_, v)| v).sum();
                        (name.as_str(), round_to(sum / nr, 3))
                    })
                    .collect();
                json!(pie)
            }
            _ => {
                let rows: Vec<Value> = self
                    .series
                    .iter()
                    .map(|(name, points)| {
                        let mut vals: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
                        vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                        let pct = |p| percentile(&vals, p).map(|v| round_to(v, 3));
                        json!([
                            name,
                            vals.first().map(|v| round_to(*v, 3)),
                            pct(0.5),
                            pct(0.9),
                            pct(0.95),
                            vals.last().map(|v| round_to(*v, 3)),
                            round_to(statistical::mean(&vals), 3),
                            vals.len(),
                        ])
                    })
                    .collect();
                json!({
                    "cols": ["Action", "Min (sec)", "Median (sec)", "90%ile (sec)",
                             "95%ile (sec)", "Max (sec)", "Avg (sec)", "Count"],
                    "rows": rows,
                })
            }
        }
    }

    pub fn render(&self) -> Value {
        json!({
            "title": self.title,
            "description": self.description,
            "label": self.label,
            "axis_label": self.axis_label,
            "widget": self.widget.name(),
            "data": self.render_data(),
        })
    }
}

/// A complete output with `chart_plugin` swapped for the widget name.
pub fn complete_output(out: &OutputChart) -> Result<Value, ChartError> {
    let plugin = find_output_plugin(&out.chart_plugin)?;
    Ok(json!({
        "title": out.title,
        "description": out.description,
        "label": out.label,
        "axis_label": out.axis_label,
        "widget": plugin.widget.name(),
        "data": out.data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(plugin: &str, data: Value) -> OutputChart {
        OutputChart {
            title: "foo".into(),
            chart_plugin: plugin.into(),
            data,
            ..Default::default()
        }
    }

    #[test]
    fn test_find_output_plugin() {
        for (name, widget) in &[
            ("StackedArea", Widget::StackedArea),
            ("Lines", Widget::Lines),
            ("Pie", Widget::Pie),
            ("StatsTable", Widget::Table),
            ("Table", Widget::Table),
            ("TextArea", Widget::TextArea),
        ] {
            assert_eq!(find_output_plugin(name).unwrap().widget, *widget);
        }
        assert!(matches!(
            find_output_plugin("Bogus"),
            Err(ChartError::UnknownPlugin(_))
        ));
    }

    #[test]
    fn test_additive_lines() {
        let first = output("Lines", json!([["a", 1], ["b", 2.5]]));
        let mut chart = AdditiveOutputChart::new(&first).unwrap();
        chart.add_output(&first).unwrap();
        chart.add_output(&output("Lines", json!([["a", 3]]))).unwrap();

        let rendered = chart.render();
        assert_eq!(rendered["widget"], json!("Lines"));
        assert_eq!(rendered["axis_label"], json!(DFL_AXIS_LABEL));
        assert_eq!(
            rendered["data"],
            json!([["a", [[1, 1.0], [2, 3.0]]], ["b", [[1, 2.5]]]])
        );
    }

    #[test]
    fn test_additive_pie_and_table() {
        let mut pie = AdditiveOutputChart::new(&output("Pie", json!([]))).unwrap();
        let mut table = AdditiveOutputChart::new(&output("StatsTable", json!([]))).unwrap();
        for v in &[1.0, 2.0, 3.0, 4.0] {
            let out = output("Pie", json!([["x", v]]));
            pie.add_output(&out).unwrap();
            table.add_output(&out).unwrap();
        }
        assert_eq!(pie.render()["data"], json!([["x", 2.5]]));

        let rendered = table.render();
        assert_eq!(rendered["widget"], json!("Table"));
        assert_eq!(
            rendered["data"]["rows"],
            json!([["x", 1.0, 2.5, 3.7, 3.85, 4.0, 2.5, 4]])
        );
    }

    #[test]
    fn test_additive_errors() {
        assert!(matches!(
            AdditiveOutputChart::new(&output("TextArea", json!("text"))),
            Err(ChartError::NotAdditive(_))
        ));
        assert!(AdditiveOutputChart::new(&output("Bogus", json!([]))).is_err());

        let mut chart = AdditiveOutputChart::new(&output("Lines", json!([]))).unwrap();
        for data in &[json!("nope"), json!([["a"]]), json!([[1, 2]]), json!([["a", "b"]])] {
            assert!(matches!(
                chart.add_output(&output("Lines", data.clone())),
                Err(ChartError::InvalidData { .. })
            ));
        }
        chart.add_output(&output("Lines", json!([["a", 1]]))).unwrap();
        assert_eq!(chart.render()["data"], json!([["a", [[5, 1.0]]]]));
    }

    #[test]
    fn test_complete_output() {
        let rendered = complete_output(&output("TextArea", json!(["line"]))).unwrap();
        assert_eq!(rendered["widget"], json!("TextArea"));
        assert_eq!(rendered["data"], json!(["line"]));
        assert!(rendered.get("chart_plugin").is_none());
        assert!(complete_output(&output("Bogus", json!([]))).is_err());
    }
}
