/// `log` crate bridge
///
/// reqwest and friends emit through the `log` facade. Records are routed into
/// our logger under `LogTag::Other(<crate>)` so they obey the same filters.
use super::core::log_internal;
use super::levels::LogLevel;
use super::tags::LogTag;

struct BridgeLogger;

impl log::Log for BridgeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        // Third-party INFO chatter is noise for a batch tool
        metadata.level() <= log::Level::Warn
            || super::get_logger_config().min_level >= LogLevel::Debug
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = record.target().split("::").next().unwrap_or("external");
        log_internal(
            LogTag::Other(target.to_string()),
            LogLevel::from(record.level()),
            &record.args().to_string(),
        );
    }

    fn flush(&self) {
        super::file::flush_file_logging();
    }
}

static BRIDGE: BridgeLogger = BridgeLogger;

/// Register the bridge; a second call is a silent no-op
pub fn install() {
    if log::set_logger(&BRIDGE).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}
