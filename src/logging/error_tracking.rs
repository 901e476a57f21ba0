use std::{collections::BTreeMap, sync::Arc, time::Duration};

use sentry::{
    protocol::Event, transports::DefaultTransportFactory, types::Dsn, Client, ClientOptions,
};

use super::{
    error::{SinkError, SinkResult},
    Level, LevelRange, LogRecord, LogSink,
};

pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Forwards ERROR and FATAL records to Sentry as events carrying a fixed
/// tag set.
pub struct ErrorTrackingSink {
    client: Arc<Client>,
    tags: BTreeMap<String, String>,
}

impl ErrorTrackingSink {
    /// Builds the sink around a client created from `options`. Useful to
    /// plug in a custom transport.
    pub fn with_client_options(options: ClientOptions, tags: BTreeMap<String, String>) -> Self {
        Self {
            client: Arc::new(Client::from_config(options)),
            tags,
        }
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    fn event(&self, record: &LogRecord) -> Event<'static> {
        Event {
            message: Some(record.message.clone()),
            level: sentry_level(record.level),
            logger: record.logger.clone(),
            timestamp: record.timestamp.into(),
            tags: self.tags.clone(),
            extra: record
                .fields
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            ..Default::default()
        }
    }

    fn flush_client(&self) -> eyre::Result<()> {
        if self.client.flush(Some(FLUSH_TIMEOUT)) {
            Ok(())
        } else {
            Err(eyre::eyre!(
                "Timed out flushing error tracking events after {}",
                humantime::format_duration(FLUSH_TIMEOUT)
            ))
        }
    }
}

impl LogSink for ErrorTrackingSink {
    fn levels(&self) -> LevelRange {
        LevelRange::at_least(Level::Error)
    }

    fn write_log(&self, record: &LogRecord) -> eyre::Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }

        self.client.capture_event(self.event(record), None);

        // The process is likely about to go down, get the event out first.
        if record.level > Level::Error {
            self.flush_client()?;
        }

        Ok(())
    }

    fn flush(&self) -> eyre::Result<()> {
        self.flush_client()
    }
}

fn sentry_level(level: Level) -> sentry::Level {
    match level {
        Level::Trace | Level::Debug => sentry::Level::Debug,
        Level::Info => sentry::Level::Info,
        Level::Warn => sentry::Level::Warning,
        Level::Error => sentry::Level::Error,
        Level::Fatal => sentry::Level::Fatal,
    }
}

/// An empty address falls back to `SENTRY_DSN`. With neither set the
/// client is disabled and drops every event.
fn resolve_dsn(address: &str) -> SinkResult<Option<Dsn>> {
    let address = match address {
        "" => match std::env::var("SENTRY_DSN") {
            Ok(from_env) if !from_env.is_empty() => from_env,
            _ => return Ok(None),
        },
        address => address.to_string(),
    };

    address
        .parse()
        .map(Some)
        .map_err(|source| SinkError::ClientInit { source })
}

/// Sentry sink for `address` (a DSN). Only ERROR and above are forwarded,
/// each event tagged with `tags`.
pub fn build_error_tracking_sink(
    address: &str,
    tags: BTreeMap<String, String>,
) -> SinkResult<ErrorTrackingSink> {
    let dsn = resolve_dsn(address)?;
    let enabled = dsn.is_some();

    let options = ClientOptions {
        dsn,
        transport: Some(Arc::new(DefaultTransportFactory)),
        ..Default::default()
    };

    let sink = ErrorTrackingSink::with_client_options(options, tags);
    log::debug!(target: "logcores", "error tracking sink ready, enabled={} tags={:?}", enabled, sink.tags());
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use sentry::test::TestTransport;

    use super::*;

    const TEST_DSN: &str = "https://public@sentry.invalid/1";

    fn tags() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("service".to_string(), "api".to_string()),
            ("env".to_string(), "prod".to_string()),
        ])
    }

    fn captured_sink(transport: &Arc<TestTransport>) -> ErrorTrackingSink {
        let options = ClientOptions {
            dsn: Some(TEST_DSN.parse().unwrap()),
            transport: Some(Arc::new(transport.clone())),
            ..Default::default()
        };
        ErrorTrackingSink::with_client_options(options, tags())
    }

    fn captured_events(transport: &Arc<TestTransport>) -> Vec<Event<'static>> {
        transport
            .fetch_and_clear_envelopes()
            .into_iter()
            .filter_map(|envelope| envelope.event().cloned())
            .collect()
    }

    #[test]
    fn accepts_error_and_above_only() {
        let sink = build_error_tracking_sink(TEST_DSN, BTreeMap::new()).unwrap();

        for level in Level::ALL {
            assert_eq!(sink.enabled(level), level >= Level::Error);
        }
    }

    #[test]
    fn rejects_malformed_dsn() {
        for address in ["not a dsn", "https://sentry.invalid/1"] {
            let err = build_error_tracking_sink(address, tags()).err().unwrap();
            assert!(matches!(err, SinkError::ClientInit { .. }), "{}", address);
        }
    }

    #[test]
    fn empty_dsn_without_environment_builds_a_disabled_sink() {
        std::env::remove_var("SENTRY_DSN");

        let sink = build_error_tracking_sink("", tags()).unwrap();
        assert!(sink.enabled(Level::Error));
        sink.write_log(&LogRecord::new(Level::Fatal, "goes nowhere"))
            .unwrap();
        sink.flush().unwrap();
    }

    #[test]
    fn identical_builds_keep_separate_clients() {
        let first_transport = TestTransport::new();
        let second_transport = TestTransport::new();
        let first = captured_sink(&first_transport);
        let second = captured_sink(&second_transport);

        first
            .write_log(&LogRecord::new(Level::Error, "from first"))
            .unwrap();
        first.flush().unwrap();
        second.flush().unwrap();

        let first_events = captured_events(&first_transport);
        assert_eq!(first_events.len(), 1);
        assert_eq!(first_events[0].message.as_deref(), Some("from first"));
        assert_eq!(first_events[0].tags, tags());
        assert!(captured_events(&second_transport).is_empty());

        second
            .write_log(&LogRecord::new(Level::Error, "from second"))
            .unwrap();
        second.flush().unwrap();

        assert!(captured_events(&first_transport).is_empty());
        let second_events = captured_events(&second_transport);
        assert_eq!(second_events.len(), 1);
        assert_eq!(second_events[0].message.as_deref(), Some("from second"));
        assert_eq!(first.tags(), second.tags());
    }

    #[test]
    fn forwarded_events_carry_tags_unchanged() {
        let transport = TestTransport::new();
        let sink = captured_sink(&transport);

        sink.write_log(&LogRecord::new(Level::Error, "payment failed").with_field("order", 17))
            .unwrap();
        sink.write_log(&LogRecord::new(Level::Fatal, "shutting down"))
            .unwrap();
        sink.flush().unwrap();

        let events = captured_events(&transport);
        assert_eq!(events.len(), 2);
        for event in &events {
            assert_eq!(event.tags, tags());
        }
        assert_eq!(events[0].message.as_deref(), Some("payment failed"));
        assert_eq!(events[0].level, sentry::Level::Error);
        assert_eq!(events[0].extra["order"], 17);
        assert_eq!(events[1].level, sentry::Level::Fatal);
    }

    #[test]
    fn lower_levels_are_not_forwarded() {
        let transport = TestTransport::new();
        let sink = captured_sink(&transport);

        sink.write_log(&LogRecord::new(Level::Warn, "just a warning"))
            .unwrap();
        sink.flush().unwrap();

        assert!(captured_events(&transport).is_empty());
    }
}
