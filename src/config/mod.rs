//! Configuration management.
//!
//! Settings are resolved in three layers: built-in defaults, then an
//! optional TOML file, then environment variables.
//!
//! ```toml
//! max_depth = 64
//! validate_on_evaluate = false
//!
//! [logging]
//! format = "json"
//! filter = "cellgc=debug"
//!
//! [families.metrics]
//! policy = "maxversions=10 or (maxversions=2 and maxage=5d)"
//! ```

use crate::gc::DEFAULT_MAX_DEPTH;
use crate::models::GcRule;
use crate::policy::parse_policy_with_limit;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file to load.
pub const CONFIG_PATH_ENV: &str = "CELLGC_CONFIG_PATH";

/// Environment variable overriding the rule depth limit.
pub const MAX_DEPTH_ENV: &str = "CELLGC_MAX_DEPTH";

/// Environment variable enabling validation on every evaluation.
pub const VALIDATE_ON_EVALUATE_ENV: &str = "CELLGC_VALIDATE_ON_EVALUATE";

/// Environment variable selecting the log format (`pretty` or `json`).
pub const LOG_FORMAT_ENV: &str = "CELLGC_LOG_FORMAT";

/// Environment variable holding log filter directives.
pub const LOG_FILTER_ENV: &str = "CELLGC_LOG";

/// Main configuration for cellgc.
#[derive(Debug, Clone)]
pub struct CellgcConfig {
    /// Maximum rule nesting depth.
    pub max_depth: usize,
    /// Re-validate the whole rule tree on every evaluation.
    pub validate_on_evaluate: bool,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// GC rules by column family name, parsed and validated at load time.
    pub families: BTreeMap<String, GcRule>,
}

/// Logging settings as written in the config file or environment.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directives in `tracing_subscriber::EnvFilter` syntax.
    pub filter: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Maximum rule nesting depth.
    pub max_depth: Option<usize>,
    /// Re-validate on every evaluation.
    pub validate_on_evaluate: Option<bool>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Column family sections.
    pub families: Option<BTreeMap<String, ConfigFileFamily>>,
}

/// Column family section in config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileFamily {
    /// GC policy text.
    pub policy: String,
}

impl Default for CellgcConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            validate_on_evaluate: false,
            logging: LoggingSettings::default(),
            families: BTreeMap::new(),
        }
    }
}

impl CellgcConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration for the CLI.
    ///
    /// Uses `path` if given, otherwise `CELLGC_CONFIG_PATH`, otherwise the
    /// default location. Environment overrides are applied in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
            if !config_path.trim().is_empty() {
                return Self::load_from_file(Path::new(&config_path));
            }
        }

        Self::load_default()
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a family
    /// policy is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_toml_str(&contents, env_lookup)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<config dir>/cellgc/config.toml` (platform-specific), then
    /// `~/.config/cellgc/config.toml`. Falls back to defaults with env
    /// overrides when neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but is invalid, or if the env
    /// overrides produce an invalid family policy.
    pub fn load_default() -> Result<Self> {
        if let Some(path) = default_config_paths().into_iter().find(|p| p.exists()) {
            return Self::load_from_file(&path);
        }
        Self::from_config_file(ConfigFile::default(), env_lookup)
    }

    /// Parses configuration from TOML text.
    ///
    /// `lookup` supplies environment overrides; pass `|_| None` to ignore
    /// the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a policy is invalid.
    pub fn from_toml_str(contents: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_config_file(file, lookup)
    }

    /// Converts a `ConfigFile` to `CellgcConfig`.
    ///
    /// Scalar settings and env overrides are resolved before any policy is
    /// parsed, so policies are checked against the effective depth limit.
    fn from_config_file(file: ConfigFile, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(max_depth) = file.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(validate) = file.validate_on_evaluate {
            config.validate_on_evaluate = validate;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config.apply_env_overrides(lookup);

        for (name, family) in file.families.unwrap_or_default() {
            let rule = parse_policy_with_limit(&family.policy, config.max_depth).map_err(|e| {
                Error::OperationFailed {
                    operation: "parse_family_policy".to_string(),
                    cause: format!("family '{name}': {e}"),
                }
            })?;
            config.families.insert(name, rule);
        }

        Ok(config)
    }

    /// Applies environment overrides through `lookup`.
    ///
    /// Reads:
    /// - `CELLGC_MAX_DEPTH`: rule depth limit
    /// - `CELLGC_VALIDATE_ON_EVALUATE`: `true`/`false`/`1`/`0`
    /// - `CELLGC_LOG_FORMAT`: log format
    /// - `CELLGC_LOG`: log filter directives
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(depth) = lookup(MAX_DEPTH_ENV).and_then(|v| v.trim().parse::<usize>().ok()) {
            self.max_depth = depth;
        }
        if let Some(validate) = lookup(VALIDATE_ON_EVALUATE_ENV).and_then(|v| parse_bool(&v)) {
            self.validate_on_evaluate = validate;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).filter(|v| !v.trim().is_empty()) {
            self.logging.format = Some(format);
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|v| !v.trim().is_empty()) {
            self.logging.filter = Some(filter);
        }
    }

    /// Returns the GC rule configured for a column family.
    #[must_use]
    pub fn family_rule(&self, family: &str) -> Option<&GcRule> {
        self.families.get(family)
    }

    /// Sets the rule depth limit.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enables or disables validation on every evaluation.
    #[must_use]
    pub const fn with_validate_on_evaluate(mut self, enabled: bool) -> Self {
        self.validate_on_evaluate = enabled;
        self
    }

    /// Sets the rule for a column family.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>, rule: GcRule) -> Self {
        self.families.insert(family.into(), rule);
        self
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let Some(base_dirs) = directories::BaseDirs::new() else {
        return Vec::new();
    };

    vec![
        base_dirs.config_dir().join("cellgc").join("config.toml"),
        base_dirs
            .home_dir()
            .join(".config")
            .join("cellgc")
            .join("config.toml"),
    ]
}
