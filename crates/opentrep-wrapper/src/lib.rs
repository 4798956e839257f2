//! OpenTrep wrapper - travel points of reference search from Rust
//!
//! OpenTrep resolves free text such as `"rio de janero lso angles"` into
//! airport and city codes (IATA/ICAO). This crate drives an OpenTrep engine
//! through an explicit [`TrepSession`] and decodes its answers with
//! [`opentrep_results`].
//!
//! # Quick Start
//!
//! ```rust
//! use opentrep_wrapper::{OutputFormat, ReplayEngine, TrepConfig, TrepSession, WireFormat};
//!
//! let dir = tempfile::tempdir()?;
//! let config = TrepConfig::builder()
//!     .xapian_index_path(dir.path().join("xapian_traveldb"))
//!     .build()?;
//!
//! // A recorded answer stands in for the native engine here
//! let engine = ReplayEngine::new().with_answer(WireFormat::Compact, "nce/100,sfo/100-emb/98");
//!
//! let session = TrepSession::initialize(engine, config)?;
//! let outcome = session.search("nce sfo", OutputFormat::Compact)?;
//! if let Some(result) = &outcome.result {
//!     assert_eq!(result.codes(), vec!["NCE", "SFO"]);
//! }
//! session.finalize();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Lifecycle
//!
//! `initialize → index / search → finalize`. The session value is the
//! capability: there is no global engine instance, and a session that goes
//! out of scope finalizes its engine.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod engine;
pub mod error;

pub use config::{
    DEFAULT_INDEX_PATH, DEFAULT_LOG_PATH, DEFAULT_POR_PATH, LogLevel, SqlDbType, TrepConfig,
    TrepConfigBuilder,
};
pub use engine::{
    CommandEngine, DEFAULT_QUERY, EngineError, EnginePaths, ReplayEngine, SearchOutcome,
    TrepEngine, TrepSession,
};
pub use opentrep_results as results;
pub use opentrep_results::{
    DecodeStatus, OutputFormat, ParseResult, PlaceMatch, ResultParser, ScoreScale, WireFormat,
};

#[cfg(feature = "python")]
pub mod python;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the wrapper and its decoders.
///
/// `RUST_LOG` takes precedence over `level` when set. Only the first call
/// installs a subscriber; later calls are no-ops.
///
/// # Examples
///
/// ```rust
/// use opentrep_wrapper::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), opentrep_wrapper::error::TrepError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::TrepError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?;

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
}
