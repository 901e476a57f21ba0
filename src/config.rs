use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;

use crate::logging::{Level, LevelRange, SinkError, SinkResult};

pub const DEFAULT_FACILITY: &str = "logcores";

/// Everything the sink builders need, in one place. Each builder only
/// reads the fields that apply to it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    pub level_lower_bound: Level,
    pub level_upper_bound: Level,
    pub facility: String,
    pub tags: BTreeMap<String, String>,
    pub destination_address: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            level_lower_bound: Level::Debug,
            level_upper_bound: Level::Fatal,
            facility: DEFAULT_FACILITY.to_string(),
            tags: BTreeMap::new(),
            destination_address: None,
        }
    }
}

impl SinkConfig {
    pub fn from_file(path: impl AsRef<Path>) -> SinkResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SinkError::Config(format!("can't read {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> SinkResult<Self> {
        serde_json::from_str(content).map_err(|e| SinkError::Config(e.to_string()))
    }

    pub fn levels(&self) -> LevelRange {
        LevelRange::between(self.level_lower_bound, self.level_upper_bound)
    }

    pub fn destination(&self) -> SinkResult<&str> {
        self.destination_address
            .as_deref()
            .filter(|address| !address.is_empty())
            .ok_or_else(|| SinkError::Config("destination_address is not set".to_string()))
    }
}
