// Copyright (c) Facebook, Inc. and its affiliates.
use chrono::{DateTime, Local};
use simplelog as sl;
use std::time::{Duration, UNIX_EPOCH};

pub mod json_file;

pub use json_file::{load_json, JsonArgs, JsonArgsHelper, JsonConfigFile, JsonLoad, JsonSave};

lazy_static::lazy_static! {
    static ref GIT_SHA: Option<&'static str> = option_env!("VERGEN_GIT_SHA")
        .filter(|sha| !sha.is_empty() && !sha.starts_with("VERGEN"));
    static ref TARGET_TRIPLE: Option<&'static str> = option_env!("VERGEN_CARGO_TARGET_TRIPLE")
        .filter(|triple| !triple.is_empty() && !triple.starts_with("VERGEN"));
}

/// Decorate `semver` with the git revision and target triple the binary
/// was built from, e.g. "0.3.0 3f2a9c1 x86_64-unknown-linux-gnu".
pub fn full_version(semver: &str) -> String {
    let mut ver = semver.to_string();
    if let Some(sha) = *GIT_SHA {
        ver += " ";
        ver += &sha[0..sha.len().min(7)];
    }
    if let Some(triple) = *TARGET_TRIPLE {
        ver += " ";
        ver += triple;
    }
    ver
}

pub fn unix_now() -> u64 {
    UNIX_EPOCH.elapsed().map(|dur| dur.as_secs()).unwrap_or(0)
}

pub fn format_unix_time(time: u64) -> String {
    DateTime::<Local>::from(UNIX_EPOCH + Duration::from_secs(time))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn init_logging(verbosity: u32) {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    } else {
        let sl_level = match verbosity {
            0 | 1 => sl::LevelFilter::Info,
            2 => sl::LevelFilter::Debug,
            _ => sl::LevelFilter::Trace,
        };
        let mut lcfg = sl::ConfigBuilder::new();
        lcfg.set_time_level(sl::LevelFilter::Off)
            .set_location_level(sl::LevelFilter::Off)
            .set_target_level(sl::LevelFilter::Off)
            .set_thread_level(sl::LevelFilter::Off);
        if !console::user_attended_stderr()
            || sl::TermLogger::init(
                sl_level,
                lcfg.build(),
                sl::TerminalMode::Stderr,
                sl::ColorChoice::Auto,
            )
            .is_err()
        {
            // A logger may already be installed, nothing left to do then.
            let _ = sl::SimpleLogger::init(sl_level, lcfg.build());
        }
    }
}
