// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured logging via slog, for deployments that ship logs as JSON.

use slog::{Drain, FnValue, Logger, Record, o};
use slog_async::Async;
use slog_json::Json;
use slog_term::{FullFormat, TermDecorator};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable terminal output
    Terminal,
    /// One JSON object per line on stdout
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LogFormat,
    pub level: slog::Level,
    /// Attach `file:line` of the call site to every record.
    pub include_location: bool,
    /// Key-value pairs attached to every record.
    pub static_fields: Vec<(String, String)>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            level: slog::Level::Info,
            include_location: true,
            static_fields: Vec::new(),
        }
    }
}

/// Create a structured logger with the given configuration
pub fn create_logger(config: &LoggerConfig) -> Logger {
    let drain = match config.format {
        LogFormat::Terminal => {
            let decorator = TermDecorator::new().build();
            let drain = FullFormat::new(decorator).build().fuse();
            let drain = drain.filter_level(config.level).fuse();
            Async::new(drain).build()
        }
        LogFormat::Json => {
            let drain = Json::new(io::stdout()).add_default_keys().build().fuse();
            let drain = drain.filter_level(config.level).fuse();
            Async::new(drain).build()
        }
    };

    let mut logger = Logger::root(drain.fuse(), o!());

    if config.include_location {
        logger = logger.new(o!(
            "location" => FnValue(|record: &Record| format!("{}:{}", record.file(), record.line()))
        ));
    }

    for (key, value) in &config.static_fields {
        // slog keys are &'static str; fields are installed once per process.
        let key_str: &'static str = Box::leak(key.clone().into_boxed_str());
        logger = logger.new(o!(key_str => value.clone()));
    }

    logger
}

/// Keeps the global slog logger installed while alive.
pub struct LoggerGuard {
    _guard: slog_scope::GlobalLoggerGuard,
}

pub fn init_global_logger(config: &LoggerConfig) -> LoggerGuard {
    let logger = create_logger(config);
    let guard = slog_scope::set_global_logger(logger);

    LoggerGuard { _guard: guard }
}
