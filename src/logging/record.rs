use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::Level;

/// A single structured log entry as handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub logger: Option<String>,
    pub caller: Option<String>,
    pub fields: BTreeMap<String, Value>,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            logger: None,
            caller: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds a structured field. A later value for the same key replaces the
    /// earlier one.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl<'a> From<&log::Record<'a>> for LogRecord {
    fn from(record: &log::Record<'a>) -> Self {
        let caller = match (record.file(), record.line()) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            (Some(file), None) => Some(file.to_string()),
            _ => None,
        };

        Self {
            level: record.level().into(),
            message: record.args().to_string(),
            timestamp: Utc::now(),
            logger: Some(record.target().to_string()),
            caller,
            fields: BTreeMap::new(),
        }
    }
}
