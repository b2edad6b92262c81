//! Routes the `log` crate's macros through the serial console, so
//! `gui-core` and the rest of the kernel can use `log::trace!`/`log::warn!`
//! instead of the ad-hoc `serial_println!` formatting directly.

use log::{Level, LevelFilter, Metadata, Record};

struct SerialLogger;

static LOGGER: SerialLogger = SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            crate::serial_println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Installs the serial-backed logger as the `log` crate's global logger.
/// Must run once, early in boot, before anything calls a `log::*!` macro.
pub fn init(level: LevelFilter) {
    log::set_logger(&LOGGER).expect("logger already initialized");
    log::set_max_level(level);
}
