use std::{
    path::{Path, PathBuf},
    process::Command,
};

use bytes::Bytes;
use opentrep_results::WireFormat;
use tracing::{debug, warn};

use super::{EngineError, TrepEngine};
use crate::config::TrepConfig;

/// Engine reached by running an external program once per call.
///
/// Arguments are templates; `{format}`, `{query}`, `{index}`, `{por}` and
/// `{log}` are substituted before the program is spawned. Each template entry
/// stays a single argument, so queries are never split or shell-expanded.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    search_args: Vec<String>,
    index_args: Vec<String>,
    config: Option<TrepConfig>,
}

impl CommandEngine {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            search_args: vec!["-f".into(), "{format}".into(), "{query}".into()],
            index_args: vec!["-i".into()],
            config: None,
        }
    }

    #[must_use]
    pub fn with_search_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_index_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn placeholder(&self, name: &str, format: Option<WireFormat>, query: &str) -> Option<String> {
        match name {
            "format" => Some(format.map(|f| f.code().to_string()).unwrap_or_default()),
            "query" => Some(query.to_owned()),
            "index" => self
                .config
                .as_ref()
                .map(|c| c.deployment_index_path().to_string_lossy().into_owned()),
            "por" => self
                .config
                .as_ref()
                .map(|c| c.por_path.to_string_lossy().into_owned()),
            "log" => self
                .config
                .as_ref()
                .map(|c| c.log_path.to_string_lossy().into_owned()),
            _ => None,
        }
    }

    /// Substitutes placeholders in a single left-to-right pass, so text coming
    /// from a substituted value is never expanded again.
    fn expand(&self, template: &str, format: Option<WireFormat>, query: &str) -> String {
        let mut arg = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            arg.push_str(&rest[..start]);
            let candidate = &rest[start..];
            let value = candidate.find('}').and_then(|end| {
                self.placeholder(&candidate[1..end], format, query)
                    .map(|value| (value, end))
            });
            match value {
                Some((value, end)) => {
                    arg.push_str(&value);
                    rest = &candidate[end + 1..];
                }
                None => {
                    arg.push('{');
                    rest = &candidate[1..];
                }
            }
        }
        arg.push_str(rest);
        arg
    }

    fn run(
        &self,
        templates: &[String],
        format: Option<WireFormat>,
        query: &str,
    ) -> Result<Bytes, EngineError> {
        let args: Vec<String> = templates
            .iter()
            .map(|template| self.expand(template, format, query))
            .collect();
        debug!(program = %self.program.display(), ?args, "Running engine command");

        let output = Command::new(&self.program).args(&args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Backend(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(Bytes::from(output.stdout))
    }
}

impl TrepEngine for CommandEngine {
    fn init(&mut self, config: &TrepConfig) -> Result<bool, EngineError> {
        let has_dir = self.program.components().count() > 1;
        if has_dir && !self.program.is_file() {
            warn!(program = %self.program.display(), "Engine program not found");
            return Ok(false);
        }
        self.config = Some(config.clone());
        Ok(true)
    }

    fn paths(&self) -> Result<String, EngineError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| EngineError::Backend("paths requested before init".into()))?;
        Ok(format!(
            "{};{}",
            config.por_path.display(),
            config.deployment_index_path().display()
        ))
    }

    fn index(&mut self) -> Result<u64, EngineError> {
        let stdout = self.run(&self.index_args, None, "")?;
        let report = String::from_utf8_lossy(&stdout);
        report
            .split_whitespace()
            .find_map(|token| token.parse::<u64>().ok())
            .ok_or_else(|| {
                EngineError::Backend(format!("no indexed count in engine output '{}'", report.trim()))
            })
    }

    fn search(&self, format: WireFormat, query: &str) -> Result<Bytes, EngineError> {
        self.run(&self.search_args, Some(format), query)
    }

    fn finalize(&mut self) {
        self.config = None;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn configured(engine: CommandEngine) -> CommandEngine {
        let mut engine = engine;
        let config = TrepConfig::builder()
            .xapian_index_path("/data/index")
            .build()
            .unwrap();
        assert!(engine.init(&config).unwrap());
        engine
    }

    #[test]
    fn test_search_passes_format_and_query_as_arguments() {
        let engine = configured(
            CommandEngine::new("echo").with_search_args(["-n", "{format}|{query}|{index}"]),
        );
        let answer = engine.search(WireFormat::Json, "nice sna francisco").unwrap();
        assert_eq!(answer, Bytes::from_static(b"J|nice sna francisco|/data/index0"));
    }

    #[test]
    fn test_placeholders_in_query_are_not_expanded() {
        let engine = configured(CommandEngine::new("echo").with_search_args(["-n", "{query}"]));
        let answer = engine.search(WireFormat::Compact, "{index} {por} {log}").unwrap();
        assert_eq!(answer, Bytes::from_static(b"{index} {por} {log}"));
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let engine = configured(CommandEngine::new("echo"));
        assert_eq!(
            engine.expand("{nope}-{format}-{", Some(WireFormat::Json), "nce"),
            "{nope}-J-{"
        );
    }

    #[test]
    fn test_index_reads_count() {
        let mut engine = configured(
            CommandEngine::new("echo").with_index_args(["Done. Indexed 11742 POR"]),
        );
        assert_eq!(engine.index().unwrap(), 11_742);
    }

    #[test]
    fn test_failing_program_is_a_backend_error() {
        let engine = configured(CommandEngine::new("false"));
        assert!(matches!(
            engine.search(WireFormat::Compact, "nce"),
            Err(EngineError::Backend(_))
        ));
    }

    #[test]
    fn test_missing_program_refuses_init() {
        let mut engine = CommandEngine::new("/nonexistent/opentrep-searcher");
        assert!(!engine.init(&TrepConfig::default()).unwrap());
    }
}
