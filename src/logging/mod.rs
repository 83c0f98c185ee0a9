// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging setup.
//!
//! All code logs through the `log` facade, usually via the `*_fmt!` macros.
//! Either env_logger or, when `logging.structured` is set, a global slog
//! logger fed by the `slog-stdlog` bridge receives the records.

pub mod config;
pub mod structured;
mod wrapper;


use log::{LevelFilter, info};
use once_cell::sync::OnceCell;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use self::config::LoggingConfig;
use self::structured::LoggerGuard;

static INIT: Once = Once::new();
static USING_STRUCTURED: AtomicBool = AtomicBool::new(false);
static GLOBAL_LOGGER: OnceCell<LoggerGuard> = OnceCell::new();

fn level_name(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Trace => "trace",
        LevelFilter::Debug => "debug",
        LevelFilter::Info => "info",
        LevelFilter::Warn => "warn",
        LevelFilter::Error => "error",
        LevelFilter::Off => "off",
    }
}

/// Install env_logger at `level` (info when `None`). `RUST_LOG` wins.
///
/// Only the first initialization in a process has any effect.
pub fn init(level: Option<LevelFilter>) {
    INIT.call_once(|| {
        let env = env_logger::Env::default()
            .filter_or("RUST_LOG", level_name(level.unwrap_or(LevelFilter::Info)));

        // try_init: a test harness may already own the global logger.
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp_millis()
            .format_target(true)
            .try_init();

        info!("Logging initialized at level: {}", log::max_level());
    });
}

/// Initialize from the `logging` configuration table.
pub fn init_with_config(config: &LoggingConfig) {
    let level = config.level_filter();
    if !config.structured {
        init(Some(level));
        return;
    }

    INIT.call_once(|| {
        let guard = structured::init_global_logger(&config.to_logger_config());
        let _ = GLOBAL_LOGGER.set(guard);

        match level.to_level() {
            Some(level) => {
                if slog_stdlog::init_with_level(level).is_err() {
                    return;
                }
            }
            None => log::set_max_level(LevelFilter::Off),
        }

        USING_STRUCTURED.store(true, Ordering::SeqCst);
        info!("Structured logging initialized at level: {}", level);
    });
}

/// Whether records go to slog.
pub fn is_structured() -> bool {
    USING_STRUCTURED.load(Ordering::SeqCst)
}
