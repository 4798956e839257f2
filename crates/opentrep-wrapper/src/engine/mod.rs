//! Access to the OpenTrep engine.
//!
//! The engine (indexing, ranking, the index on disk) lives outside this crate
//! and is reached through the [`TrepEngine`] trait. A [`TrepSession`] is the
//! only way to talk to an engine: it is created by a successful `init`,
//! searched and indexed while alive, and finalizes the engine exactly once.

use std::path::Path;

use bytes::Bytes;
pub use command::CommandEngine;
pub use error::EngineError;
use opentrep_results::WireFormat;
pub use replay::ReplayEngine;
pub use session::{EnginePaths, SearchOutcome, TrepSession};

use crate::config::TrepConfig;

mod command;
mod replay;
mod session;

/// Query used when the caller searches for nothing.
pub const DEFAULT_QUERY: &str = "nce sfo";

/// Native entry points of a travel search engine.
pub trait TrepEngine: std::fmt::Debug {
    /// Prepares the engine; `Ok(false)` means the engine refused the configuration.
    fn init(&mut self, config: &TrepConfig) -> Result<bool, EngineError>;

    /// Location of the POR file and of the index, as `"<por>;<index>"`.
    fn paths(&self) -> Result<String, EngineError>;

    /// (Re)builds the index and returns the number of indexed points of reference.
    fn index(&mut self) -> Result<u64, EngineError>;

    /// Raw answer for `query` serialized as `format`.
    fn search(&self, format: WireFormat, query: &str) -> Result<Bytes, EngineError>;

    /// Releases engine resources.
    fn finalize(&mut self);
}

mod error {
    use std::path::PathBuf;

    use opentrep_results::WireFormat;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum EngineError {
        #[error("The engine cannot be initialized with {0}")]
        Init(String),
        #[error("The {path} directory structure cannot be created: {source}")]
        PathCreation {
            path: PathBuf,
            source: std::io::Error,
        },
        #[error("The engine reported malformed file paths: '{0}'")]
        MalformedPaths(String),
        #[error("No {0} answer available from the engine")]
        MissingAnswer(WireFormat),
        #[error("Engine backend failure: {0}")]
        Backend(String),
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
    }
}

/// `mkdir -p` for the index directory.
pub(crate) fn ensure_directory(path: &Path) -> Result<(), EngineError> {
    std::fs::create_dir_all(path).map_err(|source| EngineError::PathCreation {
        path: path.to_path_buf(),
        source,
    })
}

/// Lets a session hold an engine chosen at run time.
impl<E: TrepEngine + ?Sized> TrepEngine for Box<E> {
    fn init(&mut self, config: &TrepConfig) -> Result<bool, EngineError> {
        (**self).init(config)
    }

    fn paths(&self) -> Result<String, EngineError> {
        (**self).paths()
    }

    fn index(&mut self) -> Result<u64, EngineError> {
        (**self).index()
    }

    fn search(&self, format: WireFormat, query: &str) -> Result<Bytes, EngineError> {
        (**self).search(format, query)
    }

    fn finalize(&mut self) {
        (**self).finalize();
    }
}
