//! Log sinks for three destinations: JSON lines on stdout, GELF over UDP
//! to a remote collector, and Sentry for errors.
//!
//! Each builder hands back an independent [`logging::LogSink`]; wiring them
//! into a logger is left to the caller, or to [`logging::Builder`] for a
//! single sink behind the `log` facade.

pub mod config;
pub mod logging;

pub use config::SinkConfig;
pub use logging::{
    build_console_sink, build_error_tracking_sink, build_remote_sink, Level, LevelRange,
    LogRecord, LogSink, SinkError,
};
