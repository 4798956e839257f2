use std::{collections::HashMap, fs, path::Path};

use bytes::Bytes;
use opentrep_results::WireFormat;
use tracing::debug;

use super::{EngineError, TrepEngine};
use crate::config::TrepConfig;

const FORMATS: [WireFormat; 4] = [
    WireFormat::Compact,
    WireFormat::Full,
    WireFormat::Json,
    WireFormat::Protobuf,
];

/// Engine stand-in answering every query with a recorded payload.
///
/// Useful to replay answers captured from a real engine, and in tests.
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    answers: HashMap<WireFormat, Bytes>,
    init_result: bool,
    index_count: u64,
    paths: Option<String>,
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self {
            answers: HashMap::new(),
            init_result: true,
            index_count: 0,
            paths: None,
        }
    }
}

impl ReplayEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `<dir>/<code>.out` for every format code present (`S.out`, `J.out`, ...).
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let dir = dir.as_ref();
        let mut engine = Self::new();
        for format in FORMATS {
            let path = dir.join(format!("{}.out", format.code()));
            if path.is_file() {
                debug!(path = %path.display(), %format, "Loading recorded answer");
                engine.answers.insert(format, Bytes::from(fs::read(&path)?));
            }
        }
        if engine.answers.is_empty() {
            return Err(EngineError::Backend(format!(
                "no recorded answers (S.out, F.out, J.out, P.out) in {}",
                dir.display()
            )));
        }
        Ok(engine)
    }

    #[must_use]
    pub fn with_answer(mut self, format: WireFormat, payload: impl Into<Bytes>) -> Self {
        self.answers.insert(format, payload.into());
        self
    }

    #[must_use]
    pub fn with_init_result(mut self, init_result: bool) -> Self {
        self.init_result = init_result;
        self
    }

    #[must_use]
    pub fn with_index_count(mut self, count: u64) -> Self {
        self.index_count = count;
        self
    }
}

impl TrepEngine for ReplayEngine {
    fn init(&mut self, config: &TrepConfig) -> Result<bool, EngineError> {
        self.paths = Some(format!(
            "{};{}",
            config.por_path.display(),
            config.deployment_index_path().display()
        ));
        Ok(self.init_result)
    }

    fn paths(&self) -> Result<String, EngineError> {
        self.paths
            .clone()
            .ok_or_else(|| EngineError::Backend("paths requested before init".into()))
    }

    fn index(&mut self) -> Result<u64, EngineError> {
        Ok(self.index_count)
    }

    fn search(&self, format: WireFormat, _query: &str) -> Result<Bytes, EngineError> {
        self.answers
            .get(&format)
            .cloned()
            .ok_or(EngineError::MissingAnswer(format))
    }

    fn finalize(&mut self) {
        self.paths = None;
    }
}
