//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::scalar::{TypeLadder, DEFAULT_STRING_MARKER};

/// Project config location, relative to a project root
pub const PROJECT_CONFIG: &str = ".adg/config.yaml";

/// Default store location, relative to a project root
const DEFAULT_STORE: &str = ".adg/designs.db";

const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

/// ADG configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite design store
    pub store: Option<PathBuf>,

    /// Component catalog (JSON); the embedded corpus is used when unset
    pub catalog: Option<PathBuf>,

    /// Corpus schema (JSON); the embedded schema is used when unset
    pub schema: Option<PathBuf>,

    /// Directories searched for query templates, in order
    pub template_paths: Vec<PathBuf>,

    /// Per-query timeout in milliseconds
    pub query_timeout_ms: Option<u64>,

    /// Parameter-name substrings that force string typing on parse
    pub string_markers: Option<Vec<String>>,

    /// Replace an existing design of the same name instead of failing
    pub overwrite_designs: Option<bool>,

    /// Directory holding the project config, if one was found
    #[serde(skip)]
    root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let cwd = std::env::current_dir().ok();
        Self::load_from(cwd.as_deref())
    }

    /// Load configuration, discovering the project config upward from `start`
    pub fn load_from(start: Option<&Path>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (accessors below)

        // 2. Global user config (~/.config/adg/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.adg/config.yaml), searched upward
        if let Some(root) = start.and_then(Self::discover_root) {
            if let Some(project) = Self::read_file(&root.join(PROJECT_CONFIG)) {
                config.merge(project.relative_to(&root));
            }
            config.root = Some(root);
        }

        // 4. Environment variables
        config.apply_env();

        config
    }

    /// Find the nearest directory containing `.adg/config.yaml`
    fn discover_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            if current.join(PROJECT_CONFIG).is_file() {
                return Some(current);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn read_file(path: &Path) -> Option<Config> {
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "adg")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn apply_env(&mut self) {
        if let Ok(store) = std::env::var("ADG_STORE") {
            self.store = Some(PathBuf::from(store));
        }
        if let Ok(timeout) = std::env::var("ADG_QUERY_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(ms) => self.query_timeout_ms = Some(ms),
                Err(_) => tracing::warn!(value = %timeout, "ignoring invalid ADG_QUERY_TIMEOUT_MS"),
            }
        }
        if let Ok(paths) = std::env::var("ADG_TEMPLATE_PATH") {
            let extra: Vec<PathBuf> = std::env::split_paths(&paths).collect();
            // Environment paths are searched before configured ones
            self.template_paths = extra.into_iter().chain(self.template_paths.drain(..)).collect();
        }
    }

    /// Resolve relative paths in a project config against its root
    fn relative_to(mut self, root: &Path) -> Self {
        let fix = |p: PathBuf| if p.is_relative() { root.join(p) } else { p };
        self.store = self.store.map(fix);
        self.catalog = self.catalog.map(fix);
        self.schema = self.schema.map(fix);
        self.template_paths = self.template_paths.into_iter().map(fix).collect();
        self
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.catalog.is_some() {
            self.catalog = other.catalog;
        }
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if !other.template_paths.is_empty() {
            self.template_paths = other.template_paths;
        }
        if other.query_timeout_ms.is_some() {
            self.query_timeout_ms = other.query_timeout_ms;
        }
        if other.string_markers.is_some() {
            self.string_markers = other.string_markers;
        }
        if other.overwrite_designs.is_some() {
            self.overwrite_designs = other.overwrite_designs;
        }
    }

    /// Store path, defaulting to `.adg/designs.db` under the project root
    pub fn store_path(&self) -> PathBuf {
        self.store.clone().unwrap_or_else(|| {
            self.root
                .as_deref()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_STORE)
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.unwrap_or(DEFAULT_QUERY_TIMEOUT_MS))
    }

    pub fn type_ladder(&self) -> TypeLadder {
        let markers = self
            .string_markers
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_STRING_MARKER.to_string()]);
        TypeLadder::new(markers)
    }

    pub fn overwrite_designs(&self) -> bool {
        self.overwrite_designs.unwrap_or(false)
    }
}
