use std::fmt::Display;

use clap::Args;

use super::parse_level;
use logcores::{
    config::SinkConfig,
    logging::{Builder, GelfCompression, Level},
};

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(long, short, help = "Collector address as host:port.")]
    pub address: Option<String>,

    #[arg(long, short, help = "Facility attached to every message.")]
    pub facility: Option<String>,

    #[arg(long, value_parser = parse_level, help = "Lowest level forwarded (inclusive).")]
    pub min_level: Option<Level>,

    #[arg(long, value_parser = parse_level, help = "Highest level forwarded (inclusive).")]
    pub max_level: Option<Level>,

    #[arg(long, help = "Gzip the GELF payloads.")]
    pub gzip: bool,
}

impl Display for Cmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.address.as_deref().unwrap_or("from config"))
    }
}

impl Cmd {
    pub fn configure(&self, builder: Builder, config: &SinkConfig) -> eyre::Result<Builder> {
        let address = match &self.address {
            Some(address) => address.clone(),
            None => config.destination()?.to_string(),
        };
        let facility = self.facility.clone().unwrap_or_else(|| config.facility.clone());
        let min_level = self.min_level.unwrap_or(config.level_lower_bound);
        let max_level = self.max_level.unwrap_or(config.level_upper_bound);

        let compression = if self.gzip {
            GelfCompression::Gzip
        } else {
            GelfCompression::None
        };

        Ok(builder.with_remote_sink(address, facility, min_level, max_level, compression))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::commands::{Cli, SinkCmd};

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "logcores",
            "remote",
            "--address",
            "127.0.0.1:12201",
            "--min-level",
            "warn",
        ]);
        let SinkCmd::Remote(cmd) = cli.sink else {
            panic!("expected remote sink");
        };

        assert_eq!(cmd.address.as_deref(), Some("127.0.0.1:12201"));
        assert_eq!(cmd.min_level, Some(logcores::logging::Level::Warn));
        assert!(cmd.max_level.is_none());
        assert!(!cmd.gzip);
    }

    #[test]
    fn missing_address_is_an_error() {
        let cli = Cli::parse_from(["logcores", "remote"]);
        let SinkCmd::Remote(cmd) = cli.sink else {
            panic!("expected remote sink");
        };

        let result = cmd.configure(logcores::logging::Builder::new(), &Default::default());
        assert!(result.is_err());
    }
}
