use std::env;
use std::path::PathBuf;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Workbook JSON file to operate on
    pub workbook: Option<PathBuf>,
    /// Schema configuration JSON file
    pub schema: Option<PathBuf>,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workbook: None,
            schema: None,
            log_filter: "gridkeep=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let workbook = env::var_os("GRIDKEEP_WORKBOOK").map(PathBuf::from);
        let schema = env::var_os("GRIDKEEP_SCHEMA").map(PathBuf::from);
        let log_filter = env::var("GRIDKEEP_LOG").unwrap_or(defaults.log_filter);

        Ok(Self {
            workbook,
            schema,
            log_filter,
        })
    }

    /// Command line paths win over the environment
    pub fn with_overrides(mut self, workbook: Option<PathBuf>, schema: Option<PathBuf>) -> Self {
        if workbook.is_some() {
            self.workbook = workbook;
        }
        if schema.is_some() {
            self.schema = schema;
        }
        self
    }
}
