use std::{io, sync::Mutex};

use eyre::Context;

use super::{
    error::{SinkError, SinkResult},
    formatters::JsonFormatter,
    gelf::{GelfCompression, GelfWriter},
    writer::LogWriter,
    Level, LevelRange, LogFormatter, LogRecord, LogSink,
};

/// Sink that encodes records with a formatter and hands the line to a
/// [`LogWriter`]. Writes are serialized through a mutex.
pub struct IoSink<W: LogWriter> {
    writer: Mutex<W>,
    formatter: Box<dyn LogFormatter>,
    levels: LevelRange,
}

impl<W: LogWriter> IoSink<W> {
    pub fn new(writer: W, formatter: Box<dyn LogFormatter>, levels: LevelRange) -> Self {
        Self {
            writer: Mutex::new(writer),
            formatter,
            levels,
        }
    }

    pub fn into_writer(self) -> eyre::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| eyre::eyre!(e.to_string()))
    }
}

impl<W: LogWriter> LogSink for IoSink<W> {
    fn levels(&self) -> LevelRange {
        self.levels
    }

    fn write_log(&self, record: &LogRecord) -> eyre::Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }

        let line = self.formatter.format(record);
        let mut writer = self.writer.lock().map_err(|e| eyre::eyre!(e.to_string()))?;
        writer
            .write_line(record, &line)
            .context("Failed writing log record")
    }

    fn flush(&self) -> eyre::Result<()> {
        let mut writer = self.writer.lock().map_err(|e| eyre::eyre!(e.to_string()))?;
        LogWriter::flush(&mut *writer).context("Can't flush log writer")
    }
}

/// JSON lines on stdout for every level from DEBUG up.
pub fn build_console_sink() -> IoSink<io::Stdout> {
    IoSink::new(
        io::stdout(),
        Box::new(JsonFormatter::production()),
        LevelRange::at_least(Level::Debug),
    )
}

/// JSON records sent as GELF over UDP to `address`, limited to the
/// inclusive band `min_level..=max_level`.
///
/// The socket is checked once before the sink is returned; a pending error
/// there fails the build just like a failure to open the socket. After
/// that, delivery problems are never reported.
pub fn build_remote_sink(
    address: &str,
    facility: &str,
    min_level: Level,
    max_level: Level,
) -> SinkResult<IoSink<GelfWriter>> {
    build_remote_sink_with(address, facility, min_level, max_level, GelfCompression::None)
}

/// Same as [`build_remote_sink`], with a choice of payload compression.
pub fn build_remote_sink_with(
    address: &str,
    facility: &str,
    min_level: Level,
    max_level: Level,
    compression: GelfCompression,
) -> SinkResult<IoSink<GelfWriter>> {
    let transport_err = |source: io::Error| SinkError::TransportInit {
        address: address.to_string(),
        source,
    };

    let mut writer = GelfWriter::new(address).map_err(transport_err)?;
    writer.set_facility(facility);
    writer.set_compression(compression);
    writer.check().map_err(transport_err)?;

    let sink = IoSink::new(
        writer,
        Box::new(JsonFormatter::production()),
        LevelRange::between(min_level, max_level),
    );

    log::debug!(target: "logcores", "remote sink ready, address={} facility={} levels={}", address, facility, sink.levels());
    Ok(sink)
}
