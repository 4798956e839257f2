//! Python bindings for the OpenTrep result decoders.
//!
//! Function names follow the `pyopentrep` result parsers so existing scripts
//! keep working: `compact_result_parser`, `json_result_parser` and
//! `protobuf_result_parser`.

use std::path::PathBuf;

use pyo3::prelude::*;

use crate::{
    CommandEngine, OutputFormat, ParseResult, PlaceMatch, ReplayEngine, ResultParser, TrepConfig,
    TrepEngine, TrepSession, results,
};

fn value_error(context: &str, e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{context}: {e}"))
}

fn runtime_error(context: &str, e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{context}: {e}"))
}

type DynEngine = Box<dyn TrepEngine + Send + Sync>;

/// One recognised place (airport, city, ...).
#[pyclass(name = "PlaceMatch", get_all, frozen)]
#[derive(Clone)]
struct PyPlaceMatch {
    score: f64,
    code: String,
    icao_code: Option<String>,
    geonames_id: Option<u64>,
    city_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<PlaceMatch> for PyPlaceMatch {
    fn from(place: PlaceMatch) -> Self {
        Self {
            score: place.score,
            code: place.code,
            icao_code: place.icao_code,
            geonames_id: place.geonames_id,
            city_code: place.city_code,
            latitude: place.latitude,
            longitude: place.longitude,
        }
    }
}

#[pymethods]
impl PyPlaceMatch {
    fn __repr__(&self) -> String {
        format!("PlaceMatch(score={}, code='{}')", self.score, self.code)
    }
}

/// Decoded engine answer.
#[pyclass(name = "ParseResult", frozen)]
struct PyParseResult {
    inner: ParseResult,
}

#[pymethods]
impl PyParseResult {
    /// Recognised places, in answer order.
    #[getter]
    fn matches(&self) -> Vec<PyPlaceMatch> {
        self.inner
            .matches()
            .iter()
            .cloned()
            .map(PyPlaceMatch::from)
            .collect()
    }

    /// Unmatched words, concatenated.
    #[getter]
    fn unmatched(&self) -> String {
        self.inner.unmatched_text()
    }

    /// True when a protobuf answer could not be decoded.
    #[getter]
    fn degraded(&self) -> bool {
        self.inner.is_degraded()
    }

    /// Places rendered as `IATA-ICAO-GEONAMESID-SS.SS%-CITY-LAT-LON`, joined with `; `.
    fn interpreted(&self) -> String {
        self.inner.render_interpreted()
    }

    fn __len__(&self) -> usize {
        self.inner.matches().len()
    }

    fn __repr__(&self) -> String {
        self.inner.to_string()
    }
}

/// Parse a compact answer.
///
/// Args:
///     result_string: e.g. 'nce/100,sfo/100-emb/98;niznayou'
///
/// Returns:
///     ([(score, code), ...], unmatched)
///
/// Raises:
///     ValueError: If the answer is malformed.
#[pyfunction]
fn compact_result_parser(result_string: &str) -> PyResult<(Vec<(f64, String)>, String)> {
    results::parse_compact(result_string)
        .map(ParseResult::into_pairs)
        .map_err(|e| value_error("Compact answer error", e))
}

/// Render a JSON answer one place per `; `-separated entry.
///
/// Raises:
///     ValueError: If the answer is malformed.
#[pyfunction]
fn json_result_parser(result_string: &str) -> PyResult<String> {
    results::interpret_json(result_string).map_err(|e| value_error("JSON answer error", e))
}

/// Decode a protobuf answer.
///
/// Malformed bytes are logged and give an empty answer rather than an error.
///
/// Returns:
///     (unmatched, interpreted)
#[pyfunction]
fn protobuf_result_parser(py: Python<'_>, payload: &[u8]) -> (String, String) {
    let payload = payload.to_vec();
    py.allow_threads(move || {
        let result = results::parse_protobuf(&payload);
        (result.unmatched_text(), result.render_interpreted())
    })
}

/// Decode an answer given its output format tag (S, J, I or P).
///
/// Raises:
///     ValueError: If the format is unknown or the answer malformed.
#[pyfunction]
#[pyo3(signature = (payload, output_format = "S"))]
fn parse(payload: &[u8], output_format: &str) -> PyResult<PyParseResult> {
    let format: OutputFormat = output_format
        .parse()
        .map_err(|e| value_error("Output format error", e))?;
    ResultParser::parse(payload, format)
        .map(|inner| PyParseResult { inner })
        .map_err(|e| value_error("Answer error", e))
}

/// Session on an OpenTrep engine, usable as a context manager.
///
/// The engine is either an external searcher program (`engine_cmd`) or a
/// directory of recorded answers (`replay_dir`).
#[pyclass(name = "OpenTrepLib")]
struct PyOpenTrepLib {
    engine_cmd: Option<PathBuf>,
    replay_dir: Option<PathBuf>,
    session: Option<TrepSession<DynEngine>>,
}

impl PyOpenTrepLib {
    fn engine(&self) -> PyResult<DynEngine> {
        match (&self.engine_cmd, &self.replay_dir) {
            (Some(program), _) => Ok(Box::new(CommandEngine::new(program))),
            (None, Some(dir)) => ReplayEngine::from_dir(dir)
                .map(|engine| Box::new(engine) as DynEngine)
                .map_err(|e| runtime_error("Replay engine error", e)),
            (None, None) => Err(value_error(
                "Engine error",
                "either engine_cmd or replay_dir is required",
            )),
        }
    }

    fn session(&self) -> PyResult<&TrepSession<DynEngine>> {
        self.session.as_ref().ok_or_else(|| {
            runtime_error(
                "OpenTrep error",
                "the engine has not been initialized, call init_cpp_extension() first",
            )
        })
    }
}

#[pymethods]
impl PyOpenTrepLib {
    #[new]
    #[pyo3(signature = (engine_cmd=None, replay_dir=None))]
    fn new(engine_cmd: Option<PathBuf>, replay_dir: Option<PathBuf>) -> Self {
        Self {
            engine_cmd,
            replay_dir,
            session: None,
        }
    }

    /// Initialize the engine, creating the index directory if needed.
    ///
    /// Raises:
    ///     ValueError: If the configuration is invalid.
    ///     RuntimeError: If the engine refuses to start.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (por_path=None, xapian_index_path=None, sql_db_type=None,
                        sql_db_conn_str=None, deployment_nb=None, log_path=None, log_level=None))]
    fn init_cpp_extension(
        &mut self,
        py: Python<'_>,
        por_path: Option<PathBuf>,
        xapian_index_path: Option<PathBuf>,
        sql_db_type: Option<String>,
        sql_db_conn_str: Option<String>,
        deployment_nb: Option<u16>,
        log_path: Option<PathBuf>,
        log_level: Option<u8>,
    ) -> PyResult<()> {
        let mut builder = TrepConfig::builder();
        if let Some(path) = por_path {
            builder = builder.por_path(path);
        }
        if let Some(path) = xapian_index_path {
            builder = builder.xapian_index_path(path);
        }
        if let Some(db_type) = sql_db_type {
            builder = builder.sql_db_type(db_type);
        }
        if let Some(conn_str) = sql_db_conn_str {
            builder = builder.sql_db_conn_str(conn_str);
        }
        if let Some(nb) = deployment_nb {
            builder = builder.deployment_nb(nb);
        }
        if let Some(path) = log_path {
            builder = builder.log_path(path);
        }
        if let Some(level) = log_level {
            builder = builder.log_level(level);
        }
        let config = builder
            .build()
            .map_err(|e| value_error("Configuration error", e))?;

        if let Some(previous) = self.session.take() {
            previous.finalize();
        }
        let engine = self.engine()?;
        let session = py
            .allow_threads(|| TrepSession::initialize(engine, config))
            .map_err(|e| runtime_error("OpenTrep init error", e))?;
        self.session = Some(session);
        Ok(())
    }

    /// Returns (POR file path, index path) as reported by the engine.
    #[pyo3(name = "getPaths")]
    fn get_paths(&self) -> PyResult<(String, String)> {
        let paths = self
            .session()?
            .paths()
            .map_err(|e| runtime_error("OpenTrep paths error", e))?;
        Ok((paths.por_path, paths.index_path))
    }

    /// Index the travel database; returns the number of indexed POR.
    fn index(&mut self, py: Python<'_>) -> PyResult<u64> {
        let session = self.session.as_mut().ok_or_else(|| {
            runtime_error(
                "OpenTrep error",
                "the engine has not been initialized, call init_cpp_extension() first",
            )
        })?;
        py.allow_threads(|| session.index())
            .map_err(|e| runtime_error("OpenTrep index error", e))
    }

    /// Search `search_string`; returns the result block as printed by the CLI.
    ///
    /// An empty search string searches for 'nce sfo'. The output format
    /// defaults to the one of the configuration.
    #[pyo3(signature = (search_string=None, output_format=None))]
    fn search(
        &self,
        py: Python<'_>,
        search_string: Option<&str>,
        output_format: Option<&str>,
    ) -> PyResult<String> {
        let session = self.session()?;
        let format = match output_format {
            Some(tag) => tag
                .parse::<OutputFormat>()
                .map_err(|e| value_error("Output format error", e))?,
            None => session.config().output_format,
        };
        let query = search_string.unwrap_or_default();
        py.allow_threads(|| session.search(query, format))
            .map(|outcome| outcome.to_string())
            .map_err(|e| runtime_error("OpenTrep search error", e))
    }

    /// Free the engine; calling it again is a no-op.
    fn finalize(&mut self) {
        if let Some(session) = self.session.take() {
            session.finalize();
        }
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    #[pyo3(signature = (_exc_type=None, _exc_value=None, _traceback=None))]
    fn __exit__(
        &mut self,
        _exc_type: Option<PyObject>,
        _exc_value: Option<PyObject>,
        _traceback: Option<PyObject>,
    ) -> bool {
        self.finalize();
        false
    }

    fn __str__(&self) -> String {
        self.session.as_ref().map_or_else(
            || TrepConfig::default().to_string(),
            |session| session.config().to_string(),
        )
    }
}

/// The OpenTrep wrapper Python module.
#[pymodule]
fn opentrep_wrapper(_py: Python, m: &Bound<PyModule>) -> PyResult<()> {
    // Forward Rust log records to Python logging
    pyo3_log::init();

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("DEFAULT_FMT", OutputFormat::default().to_string())?;

    m.add_class::<PyPlaceMatch>()?;
    m.add_class::<PyParseResult>()?;
    m.add_class::<PyOpenTrepLib>()?;

    m.add_function(wrap_pyfunction!(compact_result_parser, m)?)?;
    m.add_function(wrap_pyfunction!(json_result_parser, m)?)?;
    m.add_function(wrap_pyfunction!(protobuf_result_parser, m)?)?;
    m.add_function(wrap_pyfunction!(parse, m)?)?;

    Ok(())
}
