//! Forwards `log` records to a host-supplied sink.
//!
//! The host identifies levels by number: 0 debug, 1 info, 2 warning,
//! 3 error. Trace records are folded into debug.

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Host log sink. Receives the numeric level and the formatted message.
pub type LogSink = Box<dyn Fn(i32, &str) + Send + Sync>;

/// Host numeric code for `level`.
#[must_use]
pub fn host_level(level: Level) -> i32 {
    match level {
        Level::Trace | Level::Debug => 0,
        Level::Info => 1,
        Level::Warn => 2,
        Level::Error => 3,
    }
}

pub struct HostLogger {
    sink: LogSink,
    max_level: LevelFilter,
}

impl HostLogger {
    #[must_use]
    pub fn new(sink: LogSink, max_level: LevelFilter) -> Self {
        Self { sink, max_level }
    }
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        (self.sink)(host_level(record.level()), &message);
    }

    fn flush(&self) {}
}

/// Installs a [`HostLogger`] as the global logger.
///
/// Fails if a logger is already installed.
pub fn install(sink: LogSink, max_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(HostLogger::new(sink, max_level)))?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn forwards_with_host_codes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let logger = HostLogger::new(
            Box::new(move |level, msg| sink_seen.lock().push((level, msg.to_string()))),
            LevelFilter::Info,
        );

        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("careful"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("dropped"))
                .build(),
        );

        assert_eq!(*seen.lock(), vec![(2, "careful".to_string())]);
    }

    #[test]
    fn level_codes() {
        assert_eq!(host_level(Level::Trace), 0);
        assert_eq!(host_level(Level::Debug), 0);
        assert_eq!(host_level(Level::Info), 1);
        assert_eq!(host_level(Level::Error), 3);
    }
}
