mod error;
mod error_tracking;
mod formatters;
mod gelf;
mod level;
mod logger;
mod record;
mod sinks;
mod writer;

pub use error::{SinkError, SinkResult};
pub use error_tracking::{build_error_tracking_sink, ErrorTrackingSink};
pub use formatters::{EncoderConfig, JsonFormatter};
pub use gelf::{GelfCompression, GelfWriter};
pub use level::{Level, LevelRange};
pub use logger::{Builder, Config, Logger};
pub use record::LogRecord;
pub use sinks::{build_console_sink, build_remote_sink, build_remote_sink_with, IoSink};
pub use writer::LogWriter;

pub trait LogFormatter: Sync + Send {
    fn format(&self, record: &LogRecord) -> String;
}

pub trait LogSink: Sync + Send {
    /// Levels this sink accepts. Depends on nothing but the level.
    fn levels(&self) -> LevelRange;

    fn enabled(&self, level: Level) -> bool {
        self.levels().accepts(level)
    }

    /// Writes `record` if its level is enabled. Records outside the sink's
    /// levels are silently skipped.
    fn write_log(&self, record: &LogRecord) -> eyre::Result<()>;

    fn flush(&self) -> eyre::Result<()>;
}
