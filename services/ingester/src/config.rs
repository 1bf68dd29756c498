//! Ingester configuration.
//!
//! Loaded from a YAML file, where `${VAR}` and `${VAR:-default}` are
//! substituted from the environment, or from environment variables alone
//! (a `.env` file is honoured).

use anyhow::{ensure, Context, Result};
use ingestion::{AliasTable, WindowConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use storage::OutputLayout;

/// Monthly Argo directory listing used when nothing else is configured.
pub const DEFAULT_SOURCE_URL: &str = "https://data-argo.ifremer.fr/geo/indian_ocean/2025/08/";

/// Top-level ingester configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngesterConfig {
    /// Where dataset files are listed and fetched from
    pub source: SourceConfig,

    /// Local CSV/JSON output
    #[serde(default)]
    pub output: OutputConfig,

    /// PostgreSQL catalog; outputs are only written to files when unset
    #[serde(default)]
    pub database_url: Option<String>,

    /// Number of datasets fetched and processed concurrently
    #[serde(default = "default_parallel_downloads")]
    pub parallel_downloads: usize,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Time window used for chunk export
    #[serde(default)]
    pub window: WindowConfig,

    /// JSON lines file receiving exported time chunks
    #[serde(default = "default_chunks_path")]
    pub chunks_path: PathBuf,

    /// Alias overrides per canonical field
    #[serde(default)]
    pub aliases: AliasTable,
}

/// Dataset source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// HTML directory listing served over HTTP(S)
    Http {
        url: String,
        #[serde(default = "default_suffix")]
        suffix: String,
    },
    /// Directory on the local filesystem, searched recursively
    Local {
        path: PathBuf,
        #[serde(default = "default_suffix")]
        suffix: String,
    },
}

/// Output directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub csv_dir: PathBuf,
    pub json_dir: PathBuf,
    /// Append metadata fields as constant columns on every CSV row
    #[serde(default)]
    pub join_metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("csvs"),
            json_dir: PathBuf::from("jsons"),
            join_metadata: false,
        }
    }
}

impl OutputConfig {
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(expand_path(&self.csv_dir), expand_path(&self.json_dir))
            .with_joined_metadata(self.join_metadata)
    }
}

fn default_parallel_downloads() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_chunks_path() -> PathBuf {
    PathBuf::from("chunks.jsonl")
}

fn default_suffix() -> String {
    ".nc".to_string()
}

impl IngesterConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: Self = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let source = match env::var("ARGO_SOURCE_DIR") {
            Ok(path) => SourceConfig::Local {
                path: PathBuf::from(path),
                suffix: default_suffix(),
            },
            Err(_) => SourceConfig::Http {
                url: env::var("ARGO_SOURCE_URL").unwrap_or_else(|_| DEFAULT_SOURCE_URL.to_string()),
                suffix: default_suffix(),
            },
        };

        let output = OutputConfig {
            csv_dir: env::var("CSV_DIR").map(PathBuf::from).unwrap_or_else(|_| "csvs".into()),
            json_dir: env::var("JSON_DIR").map(PathBuf::from).unwrap_or_else(|_| "jsons".into()),
            join_metadata: env::var("JOIN_METADATA").map(|v| v == "true").unwrap_or(false),
        };

        let window = WindowConfig {
            width_days: parse_env("WINDOW_DAYS")?.unwrap_or(WindowConfig::default().width_days),
            overlap_days: parse_env("OVERLAP_DAYS")?.unwrap_or(WindowConfig::default().overlap_days),
        };

        let config = Self {
            source,
            output,
            database_url: database_url_from_env(),
            parallel_downloads: parse_env("PARALLEL_DOWNLOADS")?
                .unwrap_or_else(default_parallel_downloads),
            timeout_secs: parse_env("REQUEST_TIMEOUT_SECS")?.unwrap_or_else(default_timeout_secs),
            window,
            chunks_path: env::var("CHUNKS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_chunks_path()),
            aliases: AliasTable::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.parallel_downloads > 0, "parallel_downloads must be at least 1");
        ensure!(self.timeout_secs > 0, "timeout_secs must be at least 1");
        self.window.validate()?;
        Ok(())
    }

    pub fn chunks_path(&self) -> PathBuf {
        expand_path(&self.chunks_path)
    }
}

/// `DATABASE_URL`, or a URL assembled from the `POSTGRES_*` variables when
/// `POSTGRES_DB` is set.
fn database_url_from_env() -> Option<String> {
    if let Ok(url) = env::var("DATABASE_URL") {
        return Some(url);
    }
    let db = env::var("POSTGRES_DB").ok()?;
    let var = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.to_string());
    Some(format!(
        "postgresql://{}:{}@{}:{}/{}",
        var("POSTGRES_USER", "postgres"),
        var("POSTGRES_PASSWORD", "postgres"),
        var("POSTGRES_HOST", "localhost"),
        var("POSTGRES_PORT", "5432"),
        db
    ))
}

fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: {}", name, value)),
        Err(_) => Ok(None),
    }
}

/// Expand a leading `~` in a configured path.
fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_common::CanonicalField;

    #[test]
    fn test_expand_env_vars_simple() {
        env::set_var("INGESTER_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${INGESTER_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        env::remove_var("INGESTER_UNSET_VAR");
        let result = expand_env_vars("value_${INGESTER_UNSET_VAR:-default}_end").unwrap();
        assert_eq!(result, "value_default_end");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        env::remove_var("INGESTER_REQUIRED_VAR");
        assert!(expand_env_vars("${INGESTER_REQUIRED_VAR}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = IngesterConfig::from_yaml_str(
            "source:\n  type: http\n  url: https://data-argo.ifremer.fr/geo/indian_ocean/2025/08/\n",
        )
        .unwrap();

        assert_eq!(
            config.source,
            SourceConfig::Http {
                url: DEFAULT_SOURCE_URL.to_string(),
                suffix: ".nc".to_string(),
            }
        );
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.parallel_downloads, 8);
        assert_eq!(config.database_url, None);
        assert_eq!(config.aliases, AliasTable::default());
    }

    #[test]
    fn test_full_yaml() {
        env::set_var("INGESTER_TEST_DATA", "/data/argo");
        let yaml = r#"
source:
  type: local
  path: ${INGESTER_TEST_DATA}/incoming
output:
  csv_dir: /data/out/csvs
  json_dir: /data/out/jsons
  join_metadata: true
database_url: postgresql://argo:${INGESTER_TEST_PW:-secret}@db:5432/argo
parallel_downloads: 4
window:
  width_days: 7
  overlap_days: 1
aliases:
  temperature: [TEMP_ADJUSTED, TEMP]
"#;
        env::remove_var("INGESTER_TEST_PW");
        let config = IngesterConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(
            config.source,
            SourceConfig::Local {
                path: PathBuf::from("/data/argo/incoming"),
                suffix: ".nc".to_string(),
            }
        );
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgresql://argo:secret@db:5432/argo")
        );
        assert_eq!(config.window, WindowConfig::new(7, 1).unwrap());
        assert!(config.output.join_metadata);
        assert_eq!(config.output.layout().csv_dir(), Path::new("/data/out/csvs"));
        assert_eq!(
            config.aliases.aliases(CanonicalField::Temperature),
            &["TEMP_ADJUSTED", "TEMP"]
        );
        assert_eq!(config.aliases.aliases(CanonicalField::Pressure)[0], "PRES");
    }

    #[test]
    fn test_invalid_window_rejected() {
        let yaml = "source:\n  type: local\n  path: /tmp\nwindow:\n  width_days: 3\n  overlap_days: 3\n";
        assert!(IngesterConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let yaml = "source:\n  type: local\n  path: /tmp\nparallel_downloads: 0\n";
        assert!(IngesterConfig::from_yaml_str(yaml).is_err());
    }
}
