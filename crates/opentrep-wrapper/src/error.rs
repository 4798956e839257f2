use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrepError {
    #[error("Engine error: {0}")]
    EngineError(#[from] crate::engine::EngineError),
    #[error("Parse error: {0}")]
    ParseError(#[from] opentrep_results::ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TrepError>;
