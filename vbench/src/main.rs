// Copyright (c) Facebook, Inc. and its affiliates.
use anyhow::Result;
use log::{error, info};
use std::io::Write;
use std::process::exit;

use vb_util::*;
use vbench::{plot, trends};
use vbench_intf::{Args, Mode, TaskResult};

fn load_sources(args: &Args) -> Result<Vec<TaskResult>> {
    let mut results = vec![];
    for src in args.sources.iter() {
        let mut loaded: Vec<TaskResult> = load_json(src)?;
        info!("Loaded {} task results from {:?}", loaded.len(), src);
        results.append(&mut loaded);
    }
    Ok(results)
}

fn write_output<T: JsonSave>(args: &Args, report: &T) -> Result<()> {
    match args.output.as_deref() {
        Some(path) => {
            report.save(path)?;
            info!("Wrote {:?}", path);
        }
        None => std::io::stdout().write_all(report.as_json()?.as_bytes())?,
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let results = load_sources(args)?;
    match args.mode {
        Mode::Report => write_output(args, &plot(&results)?),
        Mode::Trends => write_output(args, &trends(&results)?),
    }
}

fn main() {
    let (args_file, updated) = Args::init_args_and_logging_nosave().unwrap_or_else(|e| {
        error!("Failed to process args file ({:#})", &e);
        exit(1);
    });

    if updated {
        if let Err(e) = Args::save_args(&args_file) {
            error!("Failed to update args file ({:#})", &e);
            exit(1);
        }
    }

    if let Err(e) = run(&args_file.data) {
        error!("{:?} failed ({:#})", args_file.data.mode, &e);
        exit(1);
    }
}
