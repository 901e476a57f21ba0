use serde_json::Value;

use super::{LogFormatter, LogRecord};

/// Key names used by [`JsonFormatter`]. `None` leaves the entry out.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub time_key: Option<String>,
    pub level_key: Option<String>,
    pub name_key: Option<String>,
    pub caller_key: Option<String>,
    pub message_key: String,
}

impl EncoderConfig {
    pub fn production() -> Self {
        Self {
            time_key: Some("ts".to_string()),
            level_key: Some("level".to_string()),
            name_key: Some("logger".to_string()),
            caller_key: Some("caller".to_string()),
            message_key: "msg".to_string(),
        }
    }

    fn is_reserved(&self, key: &str) -> bool {
        key == self.message_key
            || [
                &self.time_key,
                &self.level_key,
                &self.name_key,
                &self.caller_key,
            ]
            .into_iter()
            .any(|reserved| reserved.as_deref() == Some(key))
    }
}

/// Encodes a record as a single line of JSON. Entries come out in a fixed
/// order: level, timestamp, logger, caller, message, then the record's
/// fields sorted by key.
pub struct JsonFormatter {
    config: EncoderConfig,
}

impl JsonFormatter {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn production() -> Self {
        Self::new(EncoderConfig::production())
    }

    fn timestamp(record: &LogRecord) -> Value {
        let micros = record.timestamp.timestamp_micros();
        Value::from(micros as f64 / 1_000_000.0)
    }
}

impl LogFormatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut line = JsonLine::new();

        if let Some(key) = &self.config.level_key {
            line.entry(key, &Value::from(record.level.as_str()));
        }
        if let Some(key) = &self.config.time_key {
            line.entry(key, &Self::timestamp(record));
        }
        if let (Some(key), Some(logger)) = (&self.config.name_key, &record.logger) {
            line.entry(key, &Value::from(logger.as_str()));
        }
        if let (Some(key), Some(caller)) = (&self.config.caller_key, &record.caller) {
            line.entry(key, &Value::from(caller.as_str()));
        }
        line.entry(&self.config.message_key, &Value::from(record.message.as_str()));

        // Fields never shadow the layout's own keys.
        for (key, value) in &record.fields {
            if !self.config.is_reserved(key) {
                line.entry(key, value);
            }
        }

        line.finish()
    }
}

struct JsonLine {
    buf: String,
    empty: bool,
}

impl JsonLine {
    fn new() -> Self {
        Self {
            buf: String::from("{"),
            empty: true,
        }
    }

    fn entry(&mut self, key: &str, value: &Value) {
        if !self.empty {
            self.buf.push(',');
        }
        self.empty = false;
        self.buf.push_str(&Value::from(key).to_string());
        self.buf.push(':');
        self.buf.push_str(&value.to_string());
    }

    fn finish(mut self) -> String {
        self.buf.push('}');
        self.buf
    }
}
