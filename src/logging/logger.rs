use std::collections::BTreeMap;

use eyre::Context;
use log::{LevelFilter, Log};

use super::{
    build_console_sink, build_error_tracking_sink, build_remote_sink_with, GelfCompression, Level,
    LogRecord, LogSink,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub enabled: bool,
}

impl Config {
    pub fn new() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// `log` frontend writing through a single sink.
pub struct Logger {
    filter: LevelFilter,
    sink: Box<dyn LogSink>,
    config: Config,
}

impl Logger {
    pub fn new(filter: LevelFilter, sink: Box<dyn LogSink>, config: Config) -> Self {
        Self {
            filter,
            sink,
            config,
        }
    }

    pub fn sink(&self) -> &dyn LogSink {
        self.sink.as_ref()
    }

    pub fn init(self) -> eyre::Result<()> {
        log::set_max_level(self.filter);
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;

        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.config.enabled
            && self.filter >= metadata.level()
            && self.sink.enabled(Level::from(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            // Nowhere left to report a failing sink to.
            let _ = self.sink.write_log(&LogRecord::from(record));
        }
    }

    fn flush(&self) {
        let _ = self.sink.flush();
    }
}

type SinkConstructor = Box<dyn Fn() -> eyre::Result<Box<dyn LogSink + 'static>>>;

pub struct Builder {
    filter: LevelFilter,
    constructor: Option<SinkConstructor>,
    config: Config,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            filter: LevelFilter::Off,
            constructor: None,
            config: Config::new(),
        }
    }

    pub fn with_level(self, filter: LevelFilter) -> Self {
        Self { filter, ..self }
    }

    pub fn with_config(self, config: Config) -> Self {
        Self { config, ..self }
    }

    pub fn with_console_sink(self) -> Self {
        Self {
            constructor: Some(Box::new(|| -> eyre::Result<Box<dyn LogSink>> {
                Ok(Box::new(build_console_sink()))
            })),
            ..self
        }
    }

    pub fn with_remote_sink(
        self,
        address: impl Into<String>,
        facility: impl Into<String>,
        min_level: Level,
        max_level: Level,
        compression: GelfCompression,
    ) -> Self {
        let address: String = address.into();
        let facility: String = facility.into();
        Self {
            constructor: Some(Box::new(move || -> eyre::Result<Box<dyn LogSink>> {
                let sink =
                    build_remote_sink_with(&address, &facility, min_level, max_level, compression)?;
                Ok(Box::new(sink))
            })),
            ..self
        }
    }

    pub fn with_error_tracking_sink(
        self,
        address: impl Into<String>,
        tags: BTreeMap<String, String>,
    ) -> Self {
        let address: String = address.into();
        Self {
            constructor: Some(Box::new(move || -> eyre::Result<Box<dyn LogSink>> {
                let sink = build_error_tracking_sink(&address, tags.clone())?;
                Ok(Box::new(sink))
            })),
            ..self
        }
    }

    pub fn build(&self) -> eyre::Result<Logger> {
        let constructor = self
            .constructor
            .as_ref()
            .ok_or_else(|| eyre::eyre!("No log sink configured"))?;
        let sink = constructor()?;

        Ok(Logger::new(self.filter, sink, self.config.clone()))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
