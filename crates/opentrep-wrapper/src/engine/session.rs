use std::fmt;

use bytes::Bytes;
use opentrep_results::{OutputFormat, ParseResult, ResultParser};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::{DEFAULT_QUERY, EngineError, TrepEngine, ensure_directory};
use crate::{config::TrepConfig, error::Result};

const SEPARATOR_LINE: &str = "------------------";

/// File locations reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnginePaths {
    /// OPTD-maintained list of points of reference.
    pub por_path: String,
    /// Travel database/index.
    pub index_path: String,
}

impl EnginePaths {
    fn parse(raw: &str) -> std::result::Result<Self, EngineError> {
        let (por_path, index_path) = raw
            .split_once(';')
            .ok_or_else(|| EngineError::MalformedPaths(raw.to_owned()))?;
        Ok(Self {
            por_path: por_path.to_owned(),
            index_path: index_path.to_owned(),
        })
    }
}

/// Answer to one search.
///
/// `result` is absent for the full (`F`) output, which is only meant to be
/// printed.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query: String,
    pub format: OutputFormat,
    pub raw: Bytes,
    pub result: Option<ParseResult>,
}

impl SearchOutcome {
    /// The raw answer as text; binary answers are shown lossily.
    #[must_use]
    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.format, &self.result) {
            (OutputFormat::Compact, Some(result)) => {
                writeln!(f, "Compact format => recognised place (city/airport) codes:")?;
                writeln!(f, "{result}")?;
            }
            (OutputFormat::Interpreted, Some(result)) => {
                writeln!(f, "JSON format => recognised place (city/airport) codes:")?;
                writeln!(f, "{}", result.render_interpreted())?;
            }
            (OutputFormat::Protobuf, Some(result)) => {
                writeln!(f, "Protobuf format => recognised place (city/airport) codes:")?;
                writeln!(f, "{}", result.render_interpreted())?;
                writeln!(f, "Unmatched keywords:")?;
                writeln!(f, "{}", result.unmatched_text())?;
            }
            (OutputFormat::Json, _) => {
                writeln!(f, "Raw (JSON) result from the OpenTrep library:")?;
                writeln!(f, "{}", self.raw_text())?;
            }
            _ => {
                writeln!(f, "Raw result from the OpenTrep library:")?;
                writeln!(f, "{}", self.raw_text())?;
            }
        }
        write!(f, "{SEPARATOR_LINE}")
    }
}

/// An initialized engine.
///
/// Sessions only come out of [`TrepSession::initialize`], so holding one
/// proves `init` succeeded. Dropping the session finalizes the engine.
#[derive(Debug)]
pub struct TrepSession<E: TrepEngine> {
    engine: E,
    config: TrepConfig,
    finalized: bool,
}

impl<E: TrepEngine> TrepSession<E> {
    /// Creates the index directory if needed and initializes the engine.
    #[instrument(name = "Initialize OpenTrep session", level = "info", skip(engine, config), fields(config = %config))]
    pub fn initialize(mut engine: E, config: TrepConfig) -> Result<Self> {
        let index_dir = &config.xapian_index_path;
        if !index_dir.is_dir() {
            if config.log_level.is_informative() {
                info!(
                    path = %index_dir.display(),
                    "Index directory does not exist, creating it"
                );
            }
            ensure_directory(index_dir)?;
        }

        if !engine.init(&config)? {
            return Err(EngineError::Init(config.to_string()).into());
        }
        info!(engine = ?engine, "OpenTrep engine initialized");

        Ok(Self {
            engine,
            config,
            finalized: false,
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrepConfig {
        &self.config
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn paths(&self) -> Result<EnginePaths> {
        let paths = EnginePaths::parse(&self.engine.paths()?)?;
        info!(
            por = %paths.por_path,
            index = %paths.index_path,
            "OpenTrep file paths"
        );
        Ok(paths)
    }

    /// Indexes the points of reference; returns how many were indexed.
    #[instrument(name = "Index travel database", level = "info", skip(self))]
    pub fn index(&mut self) -> Result<u64> {
        if self.config.log_level.is_informative() {
            info!("Indexing the travel database, this may take several minutes on slow machines");
        }
        let t0 = std::time::Instant::now();
        let count = self.engine.index()?;
        info!(
            count,
            elapsed_seconds = t0.elapsed().as_secs_f32(),
            "Done. Indexed POR (points of reference)"
        );
        Ok(count)
    }

    /// Searches `query` in the session's default output format.
    pub fn search_default(&self, query: &str) -> Result<SearchOutcome> {
        self.search(query, self.config.output_format)
    }

    /// Searches `query` and decodes the answer.
    ///
    /// An empty query searches for [`DEFAULT_QUERY`]. The interpreted format
    /// asks the engine for JSON.
    #[instrument(name = "Search", level = "debug", skip(self))]
    pub fn search(&self, query: &str, format: OutputFormat) -> Result<SearchOutcome> {
        let query = if query.trim().is_empty() {
            DEFAULT_QUERY
        } else {
            query
        };

        let raw = self.engine.search(format.wire_format(), query)?;
        debug!(bytes = raw.len(), "Raw answer received");

        let result = match format {
            OutputFormat::Full => None,
            _ => Some(ResultParser::parse(&raw, format)?),
        };

        Ok(SearchOutcome {
            query: query.to_owned(),
            format,
            raw,
            result,
        })
    }

    /// Releases the engine.
    pub fn finalize(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.finalized {
            self.engine.finalize();
            self.finalized = true;
            debug!("OpenTrep engine finalized");
        }
    }
}

impl<E: TrepEngine> Drop for TrepSession<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
