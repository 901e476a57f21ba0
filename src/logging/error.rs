use thiserror::Error;

/// Failures while building a sink. Once a sink exists, per-record errors
/// are reported through `eyre` instead.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed setting up log transport to {address}")]
    TransportInit {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed creating error tracking client")]
    ClientInit {
        #[source]
        source: sentry::types::ParseDsnError,
    },
    #[error("invalid sink configuration: {0}")]
    Config(String),
}

pub type SinkResult<T> = Result<T, SinkError>;
