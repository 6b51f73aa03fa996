// Copyright (c) Facebook, Inc. and its affiliates.
//
// Per-action duration statistics. StatsTable accumulates iterations and
// renders the wire StatTable, StatRow is the typed view of one wire row.
//
use serde_json::Value;
use std::collections::BTreeMap;

use vbench_intf::{IterationResult, StatTable, StatValue};

pub const TOTAL: &str = "total";
pub const ACTION_COL: &str = "Action";
pub const SUCCESS_COL: &str = "Success";
pub const COUNT_COL: &str = "Count";
const FLOAT_PRECISION: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum StatError {
    #[error("stat table has no {0:?} column")]
    MissingColumn(String),
    #[error("stat row {row:?} has no cell for {col:?}")]
    MissingCell { row: String, col: String },
    #[error("stat row {row:?} has invalid {col:?} value {value}")]
    InvalidCell {
        row: String,
        col: String,
        value: Value,
    },
    #[error("stat row without action name: {0:?}")]
    NoName(Vec<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DurationKind {
    Min,
    Median,
    P90,
    P95,
    Max,
    Avg,
}

impl DurationKind {
    pub const ALL: [DurationKind; 6] = [
        Self::Min,
        Self::Median,
        Self::P90,
        Self::P95,
        Self::Max,
        Self::Avg,
    ];

    /// Series name used in trend data.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Median => "median",
            Self::P90 => "90%ile",
            Self::P95 => "95%ile",
            Self::Max => "max",
            Self::Avg => "avg",
        }
    }

    /// Column title in the stat table.
    pub fn col(&self) -> &'static str {
        match self {
            Self::Min => "Min (sec)",
            Self::Median => "Median (sec)",
            Self::P90 => "90%ile (sec)",
            Self::P95 => "95%ile (sec)",
            Self::Max => "Max (sec)",
            Self::Avg => "Avg (sec)",
        }
    }
}

pub fn stat_cols() -> Vec<String> {
    let mut cols = vec![ACTION_COL.to_string()];
    cols.extend(DurationKind::ALL.iter().map(|kind| kind.col().to_string()));
    cols.push(SUCCESS_COL.into());
    cols.push(COUNT_COL.into());
    cols
}

/// Linear interpolation between the closest ranks of `sorted`.
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let k = (sorted.len() - 1) as f64 * pct;
    let (f, c) = (k.floor(), k.ceil());
    if f == c {
        return Some(sorted[k as usize]);
    }
    Some(sorted[f as usize] * (c - k) + sorted[c as usize] * (k - f))
}

pub fn round_to(v: f64, precision: i32) -> f64 {
    let mult = 10f64.powi(precision);
    (v * mult).round() / mult
}

pub fn format_success(pct: Option<f64>) -> String {
    match pct {
        Some(pct) => format!("{:.1}%", pct),
        None => StatValue::NA_STR.into(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatRow {
    pub name: String,
    pub durations: [StatValue; 6],
    pub success: String,
    pub count: u64,
}

impl StatRow {
    pub fn duration(&self, kind: DurationKind) -> StatValue {
        self.durations[kind as usize]
    }

    /// "100.0%" parses to 100.0, "n/a" maps to 0.
    pub fn success_pct(&self) -> Result<f64, StatError> {
        let invalid = || StatError::InvalidCell {
            row: self.name.clone(),
            col: SUCCESS_COL.into(),
            value: Value::String(self.success.clone()),
        };

        if self.success == StatValue::NA_STR {
            return Ok(0.0);
        }
        match self.success.strip_suffix('%') {
            Some(num) => num.trim().parse::<f64>().map_err(|_| invalid()),
            None => Err(invalid()),
        }
    }

    pub fn to_cells(&self) -> Vec<Value> {
        let mut cells = vec![Value::String(self.name.clone())];
        for dur in self.durations.iter() {
            cells.push(serde_json::to_value(dur).unwrap_or(Value::Null));
        }
        cells.push(Value::String(self.success.clone()));
        cells.push(Value::from(self.count));
        cells
    }

    pub fn from_cells(cols: &[String], cells: &[Value]) -> Result<Self, StatError> {
        let col_idx = |title: &str| -> Result<usize, StatError> {
            cols.iter()
                .position(|col| col == title)
                .ok_or_else(|| StatError::MissingColumn(title.into()))
        };

        let name = match cells.get(col_idx(ACTION_COL)?) {
            Some(Value::String(name)) => name.clone(),
            _ => return Err(StatError::NoName(cells.to_vec())),
        };
        let cell = |title: &str| -> Result<&Value, StatError> {
            cells.get(col_idx(title)?).ok_or_else(|| StatError::MissingCell {
                row: name.clone(),
                col: title.into(),
            })
        };
        let invalid = |title: &str, value: &Value| StatError::InvalidCell {
            row: name.clone(),
            col: title.into(),
            value: value.clone(),
        };

        let mut durations = [StatValue::NotAvailable; 6];
        for kind in DurationKind::ALL.iter() {
            let v = cell(kind.col())?;
            durations[*kind as usize] =
                serde_json::from_value(v.clone()).map_err(|_| invalid(kind.col(), v))?;
        }

        let success = match cell(SUCCESS_COL)? {
            Value::String(s) => s.clone(),
            v => return Err(invalid(SUCCESS_COL, v)),
        };
        let count = match cell(COUNT_COL)? {
            v if v.is_u64() => v.as_u64().unwrap_or(0),
            v => return Err(invalid(COUNT_COL, v)),
        };

        Ok(Self {
            name,
            durations,
            success,
            count,
        })
    }
}

pub fn parse_stat_table(table: &StatTable) -> Result<Vec<StatRow>, StatError> {
    table
        .rows
        .iter()
        .map(|cells| StatRow::from_cells(&table.cols, cells))
        .collect()
}

#[derive(Clone, Debug, Default)]
struct ActionSamples {
    durations: Vec<f64>,
    count: u64,
    succeeded: u64,
}

impl ActionSamples {
    fn add(&mut self, duration: f64, failed: bool) {
        self.count += 1;
        if !failed {
            self.succeeded += 1;
            self.durations.push(duration);
        }
    }

    fn row(&self, name: &str) -> StatRow {
        let mut sorted = self.durations.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut durations = [StatValue::NotAvailable; 6];
        if !sorted.is_empty() {
            let rounded = |v: f64| StatValue::Num(round_to(v, FLOAT_PRECISION));
            durations[DurationKind::Min as usize] = rounded(sorted[0]);
            durations[DurationKind::Max as usize] = rounded(sorted[sorted.len() - 1]);
            durations[DurationKind::Avg as usize] = rounded(statistical::mean(&sorted));
            for (kind, pct) in &[
                (DurationKind::Median, 0.5),
                (DurationKind::P90, 0.9),
                (DurationKind::P95, 0.95),
            ] {
                durations[*kind as usize] = percentile(&sorted, *pct)
                    .map(|v| round_to(v, FLOAT_PRECISION))
                    .into();
            }
        }

        let success = if self.count > 0 {
            Some(self.succeeded as f64 / self.count as f64 * 100.0)
        } else {
            None
        };

        StatRow {
            name: name.into(),
            durations,
            success: format_success(success),
            count: self.count,
        }
    }
}

/// Accumulates iterations into one row per atomic action plus "total".
#[derive(Clone, Debug, Default)]
pub struct StatsTable {
    actions: BTreeMap<String, ActionSamples>,
    total: ActionSamples,
}

impl StatsTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_iteration(&mut self, itr: &IterationResult) {
        let failed = itr.failed();
        for (name, dur) in itr.atomic_actions.iter() {
            self.actions
                .entry(name.clone())
                .or_default()
                .add(*dur, failed);
        }
        self.total.add(itr.duration, failed);
    }

    pub fn rows(&self) -> Vec<StatRow> {
        let mut rows: Vec<StatRow> = self
            .actions
            .iter()
            .map(|(name, samples)| samples.row(name))
            .collect();
        rows.push(self.total.row(TOTAL));
        rows
    }

    pub fn table(&self) -> StatTable {
        StatTable {
            cols: stat_cols(),
            rows: self.rows().iter().map(|row| row.to_cells()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn iteration(duration: f64, atomics: &[(&str, f64)], failed: bool) -> IterationResult {
        IterationResult {
            timestamp: 1.0,
            duration,
            error: if failed {
                vec!["KeyError".into(), "boom".into(), "trace".into()]
            } else {
                vec![]
            },
            atomic_actions: atomics
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<String, f64>>(),
            ..Default::default()
        }
    }

    #[test]
    fn test_percentile() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        for (pct, result) in &[(0.0, 1.0), (0.5, 3.0), (0.9, 4.6), (0.95, 4.8), (1.0, 5.0)] {
            let v = percentile(&sorted, *pct).unwrap();
            assert!((v - result).abs() < 1e-9, "{} -> {} ({})", pct, v, result);
        }
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[7.0], 0.9), Some(7.0));
    }

    #[test]
    fn test_stats_table_rows() {
        let _ = ::env_logger::try_init();

        let mut table = StatsTable::new();
        for (dur, a) in &[(1.0, 0.5), (2.0, 1.5), (3.0, 2.5), (4.0, 3.5)] {
            table.add_iteration(&iteration(*dur, &[("a", *a)], false));
        }
        table.add_iteration(&iteration(9.0, &[("a", 9.0)], true));

        let rows = table.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "a");
        assert_eq!(rows[1].name, TOTAL);

        let total = &rows[1];
        assert_eq!(total.duration(DurationKind::Min), StatValue::Num(1.0));
        assert_eq!(total.duration(DurationKind::Max), StatValue::Num(4.0));
        assert_eq!(total.duration(DurationKind::Avg), StatValue::Num(2.5));
        assert_eq!(total.duration(DurationKind::Median), StatValue::Num(2.5));
        assert_eq!(total.duration(DurationKind::P90), StatValue::Num(3.7));
        assert_eq!(total.duration(DurationKind::P95), StatValue::Num(3.85));
        assert_eq!(total.success, "80.0%");
        assert_eq!(total.count, 5);

        assert_eq!(rows[0].duration(DurationKind::Avg), StatValue::Num(2.0));
    }

    #[test]
    fn test_stats_table_all_failed() {
        let mut table = StatsTable::new();
        table.add_iteration(&iteration(1.0, &[("a", 0.5)], true));
        table.add_iteration(&iteration(2.0, &[], true));

        let rows = table.rows();
        for row in rows.iter() {
            for kind in DurationKind::ALL.iter() {
                assert_eq!(row.duration(*kind), StatValue::NotAvailable);
            }
            assert_eq!(row.success, "0.0%");
        }
        assert_eq!(rows[0].count, 1);
        assert_eq!(rows[1].count, 2);

        let empty = StatsTable::new().rows();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].success, "n/a");
        assert_eq!(empty[0].success_pct().unwrap(), 0.0);
    }

    #[test]
    fn test_stat_row_cells() {
        let cols = stat_cols();
        let cells = vec![
            json!("a"),
            json!(0.7),
            json!(0.85),
            json!(0.9),
            json!(0.87),
            json!(1.25),
            json!(0.67),
            json!("100.0%"),
            json!(4),
        ];
        let row = StatRow::from_cells(&cols, &cells).unwrap();
        assert_eq!(row.name, "a");
        assert_eq!(row.duration(DurationKind::P95), StatValue::Num(0.87));
        assert_eq!(row.success_pct().unwrap(), 100.0);
        assert_eq!(row.count, 4);
        assert_eq!(row.to_cells(), cells);

        let na = vec![
            json!("b"),
            json!("n/a"),
            json!("n/a"),
            json!("n/a"),
            json!("n/a"),
            json!("n/a"),
            json!("n/a"),
            json!("n/a"),
            json!(4),
        ];
        let row = StatRow::from_cells(&cols, &na).unwrap();
        assert_eq!(row.duration(DurationKind::Min), StatValue::NotAvailable);
        assert_eq!(row.success_pct().unwrap(), 0.0);
    }

    #[test]
    fn test_stat_row_malformed() {
        let cols = stat_cols();
        let mut cells = vec![
            json!("a"),
            json!(0.7),
            json!(0.85),
            json!(0.9),
            json!(0.87),
            json!(1.25),
            json!(0.67),
            json!("lots"),
            json!(4),
        ];
        let row = StatRow::from_cells(&cols, &cells).unwrap();
        assert!(row.success_pct().is_err());

        cells[1] = json!("fast");
        assert!(StatRow::from_cells(&cols, &cells).is_err());
        assert!(StatRow::from_cells(&cols, &cells[..3]).is_err());
        assert!(StatRow::from_cells(&cols[1..], &cells).is_err());
        assert!(StatRow::from_cells(&cols, &[json!(42)]).is_err());
    }
}
