//! Configuration loading, merging and per-call resolution.
//!
//! Precedence, lowest first: built-in defaults, the user TOML file, the
//! project TOML file, `SHELL_SAFETY_NET_*` environment variables, and explicit
//! overrides from the command line.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::decision::{Category, Decision};

/// Prefix shared by every environment variable the crate reads.
pub const ENV_PREFIX: &str = "SHELL_SAFETY_NET_";

const USER_CONFIG_FILE: &str = ".claude/shell-safety-net.toml";
const PROJECT_CONFIG_FILE: &str = ".shell-safety-net.toml";
const DEFAULT_AUDIT_FILE: &str = ".claude/shell-safety-net-audit.jsonl";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid regex pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}' must use action \"warn\" or \"deny\"")]
    InvalidAction { rule: String },
}

/// Configuration file contents.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Deny commands containing unparseable constructs.
    pub strict: Option<bool>,

    /// Escalate every warning to a denial.
    pub paranoid: Option<bool>,

    /// Downgrade denials to warnings.
    pub warn_only: Option<bool>,

    /// Extra directories where recursive deletes are allowed.
    pub safe_roots: Vec<String>,

    pub max_recursion_depth: Option<usize>,

    pub max_segments: Option<usize>,

    pub categories: CategoriesConfig,

    pub git: GitConfig,

    pub audit: AuditConfig,

    /// Custom user-defined rules.
    pub rules: Vec<CustomRule>,
}

/// Per-category switches.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CategoriesConfig {
    pub disabled: Vec<Category>,
    pub paranoid: Vec<Category>,
}

/// Git-specific configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GitConfig {
    /// Branches where a force push only warns.
    pub force_push_allowed_branches: Vec<String>,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    /// Path to the JSON-lines log file.
    pub path: Option<String>,
}

/// Custom user-defined rule.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomRule {
    /// Rule name, reported as `custom.<name>`.
    pub name: String,
    /// Regex matched against each command segment.
    pub pattern: String,
    #[serde(default = "default_action")]
    pub action: Decision,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_action() -> Decision {
    Decision::Deny
}

/// A custom rule with its regex compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub regex: Regex,
    pub action: Decision,
    pub reason: Option<String>,
}

impl CustomRule {
    pub fn compile(&self) -> Result<CompiledRule, ConfigError> {
        if self.action == Decision::Allow {
            return Err(ConfigError::InvalidAction {
                rule: self.name.clone(),
            });
        }
        let regex = Regex::new(&self.pattern).map_err(|e| ConfigError::Regex {
            pattern: self.pattern.clone(),
            source: e,
        })?;
        Ok(CompiledRule {
            name: self.name.clone(),
            regex,
            action: self.action,
            reason: self.reason.clone(),
        })
    }
}

impl Config {
    /// Load configuration, merging user and project configs.
    pub fn load(cwd: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_user_config()?.unwrap_or_default();

        if let Some(cwd) = cwd
            && let Some(project_config) = Self::load_project_config(cwd)?
        {
            config.merge(project_config);
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn load_user_config() -> Result<Option<Self>, ConfigError> {
        match Self::user_config_path() {
            Some(path) if path.exists() => Ok(Some(Self::parse(&fs::read_to_string(&path)?)?)),
            _ => Ok(None),
        }
    }

    fn load_project_config(cwd: &Path) -> Result<Option<Self>, ConfigError> {
        let path = cwd.join(PROJECT_CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            return Ok(Some(Self::parse(&content)?));
        }
        Ok(None)
    }

    /// User config path, overridable with SHELL_SAFETY_NET_CONFIG.
    fn user_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(format!("{ENV_PREFIX}CONFIG")) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|h| h.join(USER_CONFIG_FILE))
    }

    /// Merge another config into this one (other takes precedence for scalars).
    fn merge(&mut self, other: Config) {
        self.safe_roots.extend(other.safe_roots);
        self.categories.disabled.extend(other.categories.disabled);
        self.categories.paranoid.extend(other.categories.paranoid);
        self.git
            .force_push_allowed_branches
            .extend(other.git.force_push_allowed_branches);
        self.rules.extend(other.rules);

        self.strict = other.strict.or(self.strict);
        self.paranoid = other.paranoid.or(self.paranoid);
        self.warn_only = other.warn_only.or(self.warn_only);
        self.max_recursion_depth = other.max_recursion_depth.or(self.max_recursion_depth);
        self.max_segments = other.max_segments.or(self.max_segments);
        if other.audit.enabled {
            self.audit.enabled = true;
        }
        if other.audit.path.is_some() {
            self.audit.path = other.audit.path;
        }
    }
}

/// Settings given explicitly by the caller (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cwd: Option<PathBuf>,
    pub strict: bool,
    pub paranoid: bool,
    pub warn_only: bool,
    pub max_recursion_depth: Option<usize>,
    pub max_segments: Option<usize>,
}

/// Immutable configuration for one analysis call.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub cwd: Option<PathBuf>,
    pub strict: bool,
    pub paranoid: bool,
    pub warn_only: bool,
    pub bypass: bool,
    pub disabled: BTreeSet<Category>,
    pub paranoid_categories: BTreeSet<Category>,
    /// Directories under which recursive deletes are allowed.
    pub safe_roots: Vec<PathBuf>,
    pub max_recursion_depth: usize,
    pub max_segments: usize,
    pub force_push_allowed_branches: Vec<String>,
    pub custom_rules: Vec<CompiledRule>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cwd: None,
            strict: false,
            paranoid: false,
            warn_only: false,
            bypass: false,
            disabled: BTreeSet::new(),
            paranoid_categories: BTreeSet::new(),
            safe_roots: vec![PathBuf::from("/tmp"), PathBuf::from("/var/tmp")],
            max_recursion_depth: Self::DEFAULT_MAX_DEPTH,
            max_segments: Self::DEFAULT_MAX_SEGMENTS,
            force_push_allowed_branches: Vec::new(),
            custom_rules: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 4;
    pub const DEFAULT_MAX_SEGMENTS: usize = 64;

    /// Layer a config file, environment lookups and overrides over the defaults.
    pub fn resolve(
        file: &Config,
        env: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // File
        config.strict = file.strict.unwrap_or(config.strict);
        config.paranoid = file.paranoid.unwrap_or(config.paranoid);
        config.warn_only = file.warn_only.unwrap_or(config.warn_only);
        config
            .safe_roots
            .extend(file.safe_roots.iter().map(|r| expand_home(r)));
        if let Some(depth) = file.max_recursion_depth.filter(|&n| n > 0) {
            config.max_recursion_depth = depth;
        }
        if let Some(max) = file.max_segments.filter(|&n| n > 0) {
            config.max_segments = max;
        }
        config.disabled.extend(file.categories.disabled.iter().copied());
        config
            .paranoid_categories
            .extend(file.categories.paranoid.iter().copied());
        config.force_push_allowed_branches = file.git.force_push_allowed_branches.clone();
        config.custom_rules = file
            .rules
            .iter()
            .map(CustomRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        // Environment
        config.apply_env(&env);

        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Resolve from the process environment alone, ignoring config files.
    pub fn from_env(overrides: &ConfigOverrides) -> Self {
        let mut config = Self::default();
        config.apply_env(&process_env);
        config.apply_overrides(overrides);
        config
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if overrides.cwd.is_some() {
            self.cwd = overrides.cwd.clone();
        }
        self.strict |= overrides.strict;
        self.paranoid |= overrides.paranoid;
        self.warn_only |= overrides.warn_only;
        if let Some(depth) = overrides.max_recursion_depth.filter(|&n| n > 0) {
            self.max_recursion_depth = depth;
        }
        if let Some(max) = overrides.max_segments.filter(|&n| n > 0) {
            self.max_segments = max;
        }
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) {
        if let Some(v) = env_flag(env, "STRICT") {
            self.strict = v;
        }
        if let Some(v) = env_flag(env, "PARANOID") {
            self.paranoid = v;
        }
        if let Some(v) = env_flag(env, "WARN_ONLY") {
            self.warn_only = v;
        }
        if let Some(v) = env_flag(env, "BYPASS") {
            self.bypass = v;
        }
        if let Some(roots) = env_var(env, "SAFE_ROOTS") {
            self.safe_roots.extend(
                roots
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(expand_home),
            );
        }
        if let Some(depth) = env_count(env, "MAX_DEPTH") {
            self.max_recursion_depth = depth;
        }
        if let Some(max) = env_count(env, "MAX_SEGMENTS") {
            self.max_segments = max;
        }
        for &category in Category::ALL {
            let suffix = category.env_suffix();
            match env_flag(env, &format!("DISABLE_{suffix}")) {
                Some(true) => {
                    self.disabled.insert(category);
                }
                Some(false) => {
                    self.disabled.remove(&category);
                }
                None => {}
            }
            match env_flag(env, &format!("PARANOID_{suffix}")) {
                Some(true) => {
                    self.paranoid_categories.insert(category);
                }
                Some(false) => {
                    self.paranoid_categories.remove(&category);
                }
                None => {}
            }
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn is_disabled(&self, category: Category) -> bool {
        self.disabled.contains(&category)
    }

    /// Whether warnings in this category become denials.
    pub fn is_paranoid(&self, category: Category) -> bool {
        self.paranoid || self.paranoid_categories.contains(&category)
    }
}

/// Audit log destination, if auditing is on.
///
/// Bypass mode always audits so that skipped checks leave a trace.
pub fn resolve_audit_path(
    file: &Config,
    env: impl Fn(&str) -> Option<String>,
    bypass: bool,
) -> Option<PathBuf> {
    let default_path = || dirs::home_dir().map(|h| h.join(DEFAULT_AUDIT_FILE));
    if let Some(path) = env_var(&env, "AUDIT_LOG").filter(|p| !p.is_empty()) {
        return Some(expand_home(&path));
    }
    if file.audit.enabled || bypass {
        return file
            .audit
            .path
            .as_deref()
            .map(expand_home)
            .or_else(default_path);
    }
    None
}

/// Environment lookup backed by the real process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_var(env: &impl Fn(&str) -> Option<String>, suffix: &str) -> Option<String> {
    env(&format!("{ENV_PREFIX}{suffix}"))
}

fn env_flag(env: &impl Fn(&str) -> Option<String>, suffix: &str) -> Option<bool> {
    let value = env_var(env, suffix)?;
    let parsed = parse_bool(&value);
    if parsed.is_none() {
        debug!(var = %format!("{ENV_PREFIX}{suffix}"), %value, "ignoring non-boolean value");
    }
    parsed
}

fn env_count(env: &impl Fn(&str) -> Option<String>, suffix: &str) -> Option<usize> {
    let value = env_var(env, suffix)?;
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            debug!(var = %format!("{ENV_PREFIX}{suffix}"), %value, "ignoring invalid count, using default");
            None
        }
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
