// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use vb_util::*;

const TOP_ARGS_STR: &str = "-o, --output=[FILE]  'Write the report data to FILE instead of stdout'
                            -a, --args=[FILE]    'Loads base command line arguments from FILE'
                            -v...                'Sets the level of verbosity'";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mode {
    Report,
    Trends,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Args {
    pub mode: Mode,
    pub output: Option<String>,
    pub sources: Vec<String>,

    #[serde(skip)]
    pub verbosity: u32,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            mode: Mode::Report,
            output: None,
            sources: vec![],
            verbosity: 0,
        }
    }
}

impl Args {
    #[allow(dangerous_implicit_autorefs)]
    fn app() -> clap::App<'static, 'static> {
        let result_file_arg = clap::Arg::with_name("RESULTFILE")
            .multiple(true)
            .help("Task result file (JSON list of workload results)");

        clap::App::new("vbench")
            .version((*super::FULL_VERSION).as_str())
            .author(clap::crate_authors!("\n"))
            .about("Benchmark task report and trend data generator")
            .setting(clap::AppSettings::UnifiedHelpMessage)
            .setting(clap::AppSettings::DeriveDisplayOrder)
            .setting(clap::AppSettings::SubcommandRequiredElseHelp)
            .args_from_usage(TOP_ARGS_STR)
            .subcommand(
                clap::SubCommand::with_name("report")
                    .about("Generates per-scenario report data from task results")
                    .arg(result_file_arg.clone()),
            )
            .subcommand(
                clap::SubCommand::with_name("trends")
                    .about("Groups results by workload config and generates trend data")
                    .arg(result_file_arg),
            )
    }

    fn process_subcommand(&mut self, mode: Mode, subm: &clap::ArgMatches) -> Result<bool> {
        let mut updated = false;

        if self.mode != mode {
            self.mode = mode;
            updated = true;
        }

        if let Some(srcs) = subm.values_of("RESULTFILE") {
            self.sources = srcs.map(|s| s.to_string()).collect();
            updated = true;
        }

        if self.sources.is_empty() {
            bail!("{:?} requires at least one result file", &mode);
        }
        Ok(updated)
    }
}

impl JsonLoad for Args {}
impl JsonSave for Args {}

impl JsonArgs for Args {
    fn match_cmdline() -> clap::ArgMatches<'static> {
        Self::app().get_matches()
    }

    fn verbosity(matches: &clap::ArgMatches) -> u32 {
        matches.occurrences_of("v") as u32
    }

    fn process_cmdline(&mut self, matches: &clap::ArgMatches) -> Result<bool> {
        let mut updated = false;

        if let Some(v) = matches.value_of("output") {
            self.output = if !v.is_empty() {
                Some(v.to_string())
            } else {
                None
            };
            updated = true;
        }

        self.verbosity = Self::verbosity(matches);

        updated |= match matches.subcommand() {
            ("report", Some(subm)) => self.process_subcommand(Mode::Report, subm)?,
            ("trends", Some(subm)) => self.process_subcommand(Mode::Trends, subm)?,
            _ => false,
        };

        Ok(updated)
    }
}
