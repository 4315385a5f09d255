//! Per-subsystem logging for the targets this crate emits on.
//!
//! Every `log` record in the library names one of [`TARGETS`] as its
//! target (`log::debug!(target: "xfr", ...)`), so a consumer can turn a
//! single subsystem up or down without touching the rest. [`Logger`] is a
//! `log::Log` implementation doing exactly that routing, writing to
//! stderr. The crate's own network tests install it through
//! [`init_for_tests`] to make transfer and TSIG traffic visible.

use std::collections::HashMap;
use std::sync::Once;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// The targets the library logs on, one per subsystem.
pub const TARGETS: &[&str] = &["wire", "xfr", "tsig", "zone", "cache", "resolver", "key"];

pub struct Logger {
    default_level: LevelFilter,
    target_levels: HashMap<String, LevelFilter>,
}

impl Logger {
    pub fn new() -> Logger {
        Logger {
            default_level: LevelFilter::Info,
            target_levels: HashMap::new(),
        }
    }

    pub fn with_level(mut self, level: LevelFilter) -> Logger {
        self.default_level = level;
        self
    }

    /// Overrides the level of one subsystem, matched against the whole
    /// target string: `with_target("xfr", LevelFilter::Trace)` floods the
    /// transfer state machine and nothing else.
    pub fn with_target(mut self, target: &str, level: LevelFilter) -> Logger {
        self.target_levels.insert(target.to_string(), level);
        self
    }

    fn level_for(&self, target: &str) -> LevelFilter {
        self.target_levels
            .get(target)
            .copied()
            .unwrap_or(self.default_level)
    }

    /// The most verbose level any target can reach, handed to
    /// `log::set_max_level` so disabled records cost nothing.
    fn ceiling(&self) -> LevelFilter {
        self.target_levels
            .values()
            .copied()
            .fold(self.default_level, Ord::max)
    }

    /// Installs this logger process-wide. Fails if another logger is
    /// already registered.
    pub fn init(self) -> Result<(), SetLoggerError> {
        log::set_max_level(self.ceiling());
        log::set_boxed_logger(Box::new(self))
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new()
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level().to_level_filter() <= self.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = if record.target().is_empty() {
            record.module_path().unwrap_or("-")
        } else {
            record.target()
        };
        eprintln!("{:<5} {}: {}", record.level(), target, record.args());
    }

    fn flush(&self) {}
}

/// Installs a logger for the test binary: quiet by default, every crate
/// target at trace. Safe to call from any number of tests; only the first
/// call does anything, and an already-registered logger is left alone.
pub fn init_for_tests() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let mut logger = Logger::new().with_level(LevelFilter::Warn);
        for target in TARGETS {
            logger = logger.with_target(target, LevelFilter::Trace);
        }
        let _ = logger.init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn meta(target: &str, level: Level) -> Metadata<'_> {
        Metadata::builder().target(target).level(level).build()
    }

    #[test]
    fn targets_route_independently() {
        let logger = Logger::new()
            .with_level(LevelFilter::Warn)
            .with_target("xfr", LevelFilter::Trace);

        assert!(logger.enabled(&meta("xfr", Level::Trace)));
        assert!(!logger.enabled(&meta("zone", Level::Debug)));
        assert!(logger.enabled(&meta("zone", Level::Warn)));
        // Whole-target match only: a prefix is not the subsystem.
        assert!(!logger.enabled(&meta("xfr2", Level::Debug)));
    }

    #[test]
    fn ceiling_covers_the_loudest_target() {
        let logger = Logger::new()
            .with_level(LevelFilter::Error)
            .with_target("tsig", LevelFilter::Debug);
        assert_eq!(logger.ceiling(), LevelFilter::Debug);

        assert_eq!(Logger::new().ceiling(), LevelFilter::Info);
    }

    #[test]
    fn every_crate_target_is_listed() {
        for target in ["wire", "xfr", "tsig", "zone", "cache", "resolver", "key"] {
            assert!(TARGETS.contains(&target));
        }
    }
}
