use std::{fmt::Display, path::PathBuf};

use clap::{Parser, Subcommand};
use eyre::Context;
use log::LevelFilter;

use logcores::{
    config::SinkConfig,
    logging::{self, Level, LogRecord},
};

mod console;
mod remote;
mod tracking;

#[derive(Subcommand, Debug)]
pub enum SinkCmd {
    Console(console::Cmd),

    Remote(remote::Cmd),

    #[command(name = "sentry")]
    Tracking(tracking::Cmd),
}

impl Display for SinkCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkCmd::Console(_cmd) => write!(f, "console"),
            SinkCmd::Remote(cmd) => write!(f, "remote {}", cmd),
            SinkCmd::Tracking(_cmd) => write!(f, "sentry"),
        }
    }
}

#[derive(Parser)]
#[command(version, long_version = "")]
#[command(about = "Send a log record through one of the logcores sinks.", long_about = None, disable_help_subcommand = true)]
pub struct Cli {
    #[arg(
        global = true,
        long,
        short = 'c',
        help = "JSON file with sink settings. Flags given on the command line take precedence.",
        display_order = 0
    )]
    pub config: Option<PathBuf>,

    #[arg(
        global = true,
        long,
        short = 'm',
        default_value = "logcores test record",
        help = "Message of the record to send.",
        display_order = 1
    )]
    pub message: String,

    #[arg(
        global = true,
        long,
        short = 'l',
        default_value = "info",
        value_parser = parse_level,
        help = "Level of the record to send.",
        display_order = 1
    )]
    pub level: Level,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Let lower level records through the logger: -v for debug, -vv for trace.",
        display_order = 999
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub sink: SinkCmd,
}

impl Cli {
    fn log_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            2_u8..=u8::MAX => LevelFilter::Trace,
        }
    }

    fn load_config(&self) -> eyre::Result<SinkConfig> {
        match &self.config {
            Some(path) => SinkConfig::from_file(path)
                .with_context(|| format!("Failed loading sink config {}", path.display())),
            None => Ok(SinkConfig::default()),
        }
    }

    /// `None` for levels the `log` facade can't express.
    fn record_level(&self) -> Option<log::Level> {
        match self.level {
            Level::Trace => Some(log::Level::Trace),
            Level::Debug => Some(log::Level::Debug),
            Level::Info => Some(log::Level::Info),
            Level::Warn => Some(log::Level::Warn),
            Level::Error => Some(log::Level::Error),
            Level::Fatal => None,
        }
    }

    pub fn run(self) -> eyre::Result<()> {
        let config = self.load_config()?;

        let builder = logging::Builder::new().with_level(self.log_filter());
        let builder = match &self.sink {
            SinkCmd::Console(cmd) => cmd.configure(builder),
            SinkCmd::Remote(cmd) => cmd.configure(builder, &config)?,
            SinkCmd::Tracking(cmd) => cmd.configure(builder, &config)?,
        };

        let logger = builder
            .build()
            .with_context(|| format!("Failed building {} sink", &self.sink))?;

        let Some(level) = self.record_level() else {
            let record = LogRecord::new(self.level, self.message.clone()).with_logger("logcores");
            logger.sink().write_log(&record)?;
            return logger.sink().flush();
        };

        logger.init()?;

        log::debug!(target: "logcores", "sending record through {} sink", &self.sink);
        log::log!(target: "logcores", level, "{}", self.message);
        log::logger().flush();

        Ok(())
    }
}

fn parse_level(level: &str) -> eyre::Result<Level> {
    level.parse()
}

fn parse_key_value(pair: &str) -> eyre::Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(eyre::eyre!("Expected key=value, got {}", pair)),
    }
}
