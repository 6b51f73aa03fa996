// Copyright (c) Facebook, Inc. and its affiliates.
use log::debug;

use super::stats::StatsTable;
use vbench_intf::{AtomicInfo, ScenarioInfo, ScenarioResult, TaskResult};

fn scenario_info(res: &TaskResult) -> ScenarioInfo {
    let mut info = ScenarioInfo {
        iterations_count: res.result.len(),
        full_duration: res.full_duration,
        load_duration: res.load_duration,
        ..Default::default()
    };
    let mut stats = StatsTable::new();

    for (idx, itr) in res.result.iter().enumerate() {
        if !itr.failed() {
            info.iterations_passed += 1;
        }

        let end = itr.timestamp + itr.duration;
        if idx == 0 {
            info.min_duration = itr.duration;
            info.max_duration = itr.duration;
            info.tstamp_start = itr.timestamp;
            info.tstamp_end = end;
        } else {
            info.min_duration = info.min_duration.min(itr.duration);
            info.max_duration = info.max_duration.max(itr.duration);
            info.tstamp_start = info.tstamp_start.min(itr.timestamp);
            info.tstamp_end = info.tstamp_end.max(end);
        }

        for (name, dur) in itr.atomic_actions.iter() {
            info.atomic
                .entry(name.clone())
                .and_modify(|ai| {
                    ai.min_duration = ai.min_duration.min(*dur);
                    ai.max_duration = ai.max_duration.max(*dur);
                })
                .or_insert(AtomicInfo {
                    min_duration: *dur,
                    max_duration: *dur,
                });
        }

        for out in itr.output.additive.iter() {
            if !info.output_names.contains(&out.title) {
                info.output_names.push(out.title.clone());
            }
        }

        stats.add_iteration(itr);
    }

    info.stat = stats.table();
    info
}

/// Convert the runner's per-workload records into the extended format the
/// report and trend processing work on.
pub fn extend_results(results: &[TaskResult]) -> Vec<ScenarioResult> {
    results
        .iter()
        .map(|res| {
            let info = scenario_info(res);
            debug!(
                "extend: {:?} pos={} iterations={}/{}",
                &res.key.name, res.key.pos, info.iterations_passed, info.iterations_count
            );
            ScenarioResult {
                key: res.key.clone(),
                sla: res.sla.clone(),
                iterations: res.result.clone(),
                info,
            }
        })
        .collect()
}
