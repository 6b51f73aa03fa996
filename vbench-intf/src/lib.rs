// Copyright (c) Facebook, Inc. and its affiliates.
use vb_util::*;

pub mod args;
pub mod result;

pub use args::{Args, Mode};
pub use result::{
    AtomicInfo, IterationOutput, IterationResult, OutputChart, ScenarioInfo, ScenarioKey,
    ScenarioResult, SlaResult, StatTable, StatValue, TaskResult,
};

lazy_static::lazy_static! {
    pub static ref VERSION: &'static str = env!("CARGO_PKG_VERSION");
    pub static ref FULL_VERSION: String = full_version(*VERSION);
}
