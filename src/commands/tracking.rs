use std::collections::BTreeMap;

use clap::Args;

use super::parse_key_value;
use logcores::{config::SinkConfig, logging::Builder};

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(long, short, help = "Sentry DSN.")]
    pub dsn: Option<String>,

    #[arg(
        long = "tag",
        short,
        value_parser = parse_key_value,
        help = "Tag attached to every event, as key=value. Can be repeated."
    )]
    pub tags: Vec<(String, String)>,
}

impl Cmd {
    pub fn configure(&self, builder: Builder, config: &SinkConfig) -> eyre::Result<Builder> {
        let dsn = match &self.dsn {
            Some(dsn) => dsn.clone(),
            None => config.destination()?.to_string(),
        };

        let mut tags: BTreeMap<String, String> = config.tags.clone();
        tags.extend(self.tags.iter().cloned());

        Ok(builder.with_error_tracking_sink(dsn, tags))
    }
}
