//! `log` backend that writes to the browser console.

use log::{Level, Log, Metadata, Record, SetLoggerError};
use polar_shared::LogLevel;
use wasm_bindgen::JsValue;
use web_sys::console;

struct ConsoleLogger {
    min_level: LogLevel,
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        LogLevel::from(metadata.level()).passes_filter(&self.min_level)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = LogLevel::from(record.level());
        let text = JsValue::from_str(&format!(
            "%c{level}%c {}: {}",
            record.target(),
            record.args()
        ));
        let badge = JsValue::from_str(&format!("color: {}; font-weight: bold", level.color()));
        let plain = JsValue::from_str("");

        match record.level() {
            Level::Error => console::error_3(&text, &badge, &plain),
            Level::Warn => console::warn_3(&text, &badge, &plain),
            Level::Info => console::info_3(&text, &badge, &plain),
            Level::Debug => console::debug_3(&text, &badge, &plain),
            Level::Trace => console::log_3(&text, &badge, &plain),
        }
    }

    fn flush(&self) {}
}

/// Install the console logger. Fails if a logger is already set.
pub fn init(min_level: LogLevel) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(ConsoleLogger { min_level }))?;
    log::set_max_level(min_level.to_level_filter());
    Ok(())
}
