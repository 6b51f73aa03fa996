// Copyright (c) Facebook, Inc. and its affiliates.
//
// Benchmark result post-processing. Task results recorded by the runner
// are extended with per-scenario stats and turned into either per-scenario
// report records or trend series grouped by workload config.
//
pub mod canon;
pub mod charts;
pub mod extend;
pub mod plot;
pub mod stats;
pub mod trends;
pub mod types;

pub use canon::{canonicalize, config_hash, CanonError, ConfigValue};
pub use charts::{Chart, ChartError};
pub use extend::extend_results;
pub use plot::{plot, process_scenario, process_tasks, ScenarioRecord, TaskReport};
pub use stats::{percentile, StatError, StatRow, StatsTable};
pub use trends::{trends, TrendRecord, Trends, TrendsReport};
pub use types::{
    obj_from_id, obj_from_name, preprocess, Resource, ResourceCatalog, ResourceError,
    ResourceKind, ResourceTypeRegistry, StaticCatalog,
};
