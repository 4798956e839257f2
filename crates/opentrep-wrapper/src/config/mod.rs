use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use opentrep_results::OutputFormat;
use serde::Serialize;
use tracing::level_filters::LevelFilter;

use crate::error::TrepError;

pub const DEFAULT_POR_PATH: &str = "/tmp/opentraveldata/optd_por_public_all.csv";
pub const DEFAULT_INDEX_PATH: &str = "/tmp/opentrep/xapian_traveldb";
pub const DEFAULT_LOG_PATH: &str = "/tmp/opentrep/opentrepwrapper.log";

/// SQL backend the engine may mirror its points of reference into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDbType {
    #[default]
    NoDb,
    Sqlite,
    MySql,
}

impl SqlDbType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoDb => "nodb",
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
        }
    }
}

impl fmt::Display for SqlDbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlDbType {
    type Err = TrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nodb" => Ok(Self::NoDb),
            "sqlite" => Ok(Self::Sqlite),
            "mysql" => Ok(Self::MySql),
            other => Err(TrepError::ConfigError(format!(
                "SQL database type '{other}' is not one of nodb, sqlite, mysql"
            ))),
        }
    }
}

/// Engine verbosity: 1 critical, 2 errors, 3 warnings, 4 info, 5 verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LogLevel(u8);

impl LogLevel {
    pub const CRITICAL: Self = Self(1);
    pub const ERROR: Self = Self(2);
    pub const WARNING: Self = Self(3);
    pub const INFO: Self = Self(4);
    pub const VERBOSE: Self = Self(5);

    pub fn new(level: u8) -> Result<Self, TrepError> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(TrepError::ConfigError(format!(
                "Log level must be between 1 (critical) and 5 (verbose), got {level}"
            )))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether progress messages should be reported.
    #[must_use]
    pub fn is_informative(self) -> bool {
        self >= Self::INFO
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::ERROR
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level.0 {
            1 | 2 => Self::ERROR,
            3 => Self::WARN,
            4 => Self::INFO,
            _ => Self::DEBUG,
        }
    }
}

/// Everything the engine needs for its `init` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrepConfig {
    /// CSV file of points of reference to index.
    pub por_path: PathBuf,
    /// Directory of the full-text index.
    pub xapian_index_path: PathBuf,
    pub sql_db_type: SqlDbType,
    pub sql_db_conn_str: String,
    /// Index generation, appended to the index path.
    pub deployment_nb: u16,
    /// Format used when a search does not name one.
    pub output_format: OutputFormat,
    /// Log file handed to the engine.
    pub log_path: PathBuf,
    pub log_level: LogLevel,
    pub index_non_iata_por: bool,
    pub init_xapian: bool,
    pub add_por_to_db: bool,
}

impl Default for TrepConfig {
    fn default() -> Self {
        Self {
            por_path: PathBuf::from(DEFAULT_POR_PATH),
            xapian_index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            sql_db_type: SqlDbType::default(),
            sql_db_conn_str: String::new(),
            deployment_nb: 0,
            output_format: OutputFormat::default(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            log_level: LogLevel::default(),
            index_non_iata_por: false,
            init_xapian: true,
            add_por_to_db: false,
        }
    }
}

impl TrepConfig {
    #[must_use]
    pub fn builder() -> TrepConfigBuilder {
        TrepConfigBuilder::new()
    }

    /// Index directory of the current deployment (`<index path><deployment>`).
    #[must_use]
    pub fn deployment_index_path(&self) -> PathBuf {
        let mut path = self.xapian_index_path.clone().into_os_string();
        path.push(self.deployment_nb.to_string());
        PathBuf::from(path)
    }
}

impl fmt::Display for TrepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Xapian index: {}; SQL DB type: {}; Deployment: {}; log file: {}",
            self.xapian_index_path.display(),
            self.sql_db_type,
            self.deployment_nb,
            self.log_path.display()
        )
    }
}

/// Builder for [`TrepConfig`]; values are checked in [`TrepConfigBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct TrepConfigBuilder {
    config: TrepConfig,
    sql_db_type: Option<String>,
    output_format: Option<String>,
    log_level: Option<u8>,
}

impl TrepConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn por_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.por_path = path.as_ref().to_path_buf();
        self
    }

    pub fn xapian_index_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.xapian_index_path = path.as_ref().to_path_buf();
        self
    }

    /// One of `nodb`, `sqlite` or `mysql`.
    pub fn sql_db_type(mut self, db_type: impl Into<String>) -> Self {
        self.sql_db_type = Some(db_type.into());
        self
    }

    pub fn sql_db_conn_str(mut self, conn_str: impl Into<String>) -> Self {
        self.config.sql_db_conn_str = conn_str.into();
        self
    }

    pub fn deployment_nb(mut self, deployment_nb: u16) -> Self {
        self.config.deployment_nb = deployment_nb;
        self
    }

    /// Format tag (`S`, `F`, `J`, `I`, `P` or the long names).
    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn log_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.log_path = path.as_ref().to_path_buf();
        self
    }

    pub fn log_level(mut self, level: u8) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Also index points of reference that have no IATA code.
    pub fn index_non_iata_por(mut self, enabled: bool) -> Self {
        self.config.index_non_iata_por = enabled;
        self
    }

    pub fn init_xapian(mut self, enabled: bool) -> Self {
        self.config.init_xapian = enabled;
        self
    }

    pub fn add_por_to_db(mut self, enabled: bool) -> Self {
        self.config.add_por_to_db = enabled;
        self
    }

    pub fn build(self) -> Result<TrepConfig, TrepError> {
        let mut config = self.config;
        if let Some(db_type) = self.sql_db_type {
            config.sql_db_type = db_type.parse()?;
        }
        if let Some(format) = self.output_format {
            config.output_format = format.parse()?;
        }
        if let Some(level) = self.log_level {
            config.log_level = LogLevel::new(level)?;
        }
        if config.sql_db_type != SqlDbType::NoDb && config.sql_db_conn_str.is_empty() {
            return Err(TrepError::ConfigError(format!(
                "SQL database type '{}' needs a connection string",
                config.sql_db_type
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrepConfig::default();
        assert_eq!(config.xapian_index_path, PathBuf::from(DEFAULT_INDEX_PATH));
        assert_eq!(config.sql_db_type, SqlDbType::NoDb);
        assert_eq!(config.output_format, OutputFormat::Compact);
        assert_eq!(config.log_level.value(), 2);
        assert!(config.init_xapian);
        assert!(!config.index_non_iata_por);
    }

    #[test]
    fn test_builder_overrides() {
        let config = TrepConfig::builder()
            .xapian_index_path("/srv/trep/index")
            .sql_db_type("sqlite")
            .sql_db_conn_str("/srv/trep/travel.db")
            .deployment_nb(1)
            .output_format("I")
            .log_level(5)
            .build()
            .unwrap();

        assert_eq!(config.sql_db_type, SqlDbType::Sqlite);
        assert_eq!(config.output_format, OutputFormat::Interpreted);
        assert_eq!(config.log_level, LogLevel::VERBOSE);
        assert_eq!(
            config.deployment_index_path(),
            PathBuf::from("/srv/trep/index1")
        );
    }

    #[test]
    fn test_unknown_sql_db_type() {
        let err = TrepConfig::builder().sql_db_type("oracle").build().unwrap_err();
        assert!(matches!(err, TrepError::ConfigError(_)));
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_sql_db_needs_connection_string() {
        assert!(TrepConfig::builder().sql_db_type("mysql").build().is_err());
    }

    #[test]
    fn test_unknown_output_format() {
        let err = TrepConfig::builder().output_format("X").build().unwrap_err();
        assert!(matches!(err, TrepError::ParseError(_)));
    }

    #[test]
    fn test_log_level_bounds() {
        assert!(TrepConfig::builder().log_level(0).build().is_err());
        assert!(TrepConfig::builder().log_level(6).build().is_err());
        assert!(LogLevel::INFO.is_informative());
        assert!(!LogLevel::WARNING.is_informative());
        assert_eq!(LevelFilter::from(LogLevel::VERBOSE), LevelFilter::DEBUG);
    }

    #[test]
    fn test_display() {
        let config = TrepConfig::default();
        assert_eq!(
            config.to_string(),
            "Xapian index: /tmp/opentrep/xapian_traveldb; SQL DB type: nodb; Deployment: 0; log \
             file: /tmp/opentrep/opentrepwrapper.log"
        );
    }
}
