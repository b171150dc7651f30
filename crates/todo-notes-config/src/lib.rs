use relative_path::RelativePathBuf;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use todo_notes_engine::metadata::{DEFAULT_METADATA_KEYS, MergePolicy, MetadataOptions};
use todo_notes_engine::todo::{DEFAULT_MIN_TODO_LEVEL, DetectionMode, DetectionOptions};
use todo_notes_engine::{AppendMode, CompletionOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Line endings of generated text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eol {
    Lf,
    Crlf,
    /// The platform's native line ending.
    #[default]
    Os,
}

impl Eol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::Crlf => "\r\n",
            Eol::Os if cfg!(windows) => "\r\n",
            Eol::Os => "\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root that note folders resolve against.
    pub workspace_root: PathBuf,
    /// Folder for notes of todos without a `FolderPath`.
    pub save_notes_path: String,
    pub todo_range_detection_mode: DetectionMode,
    pub min_todo_level: usize,
    pub inherit_parent_todo_metadata: bool,
    pub metadata_merge_policy: MergePolicy,
    pub metadata_keys: Vec<String>,
    /// chrono format string for `CreatedDate` and `CompletedDate`.
    pub date_format: String,
    pub add_completion_date: bool,
    pub append_mode: AppendMode,
    pub eol: Eol,
    pub indent_size: usize,
    pub use_spaces: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            save_notes_path: String::new(),
            todo_range_detection_mode: DetectionMode::default(),
            min_todo_level: DEFAULT_MIN_TODO_LEVEL,
            inherit_parent_todo_metadata: true,
            metadata_merge_policy: MergePolicy::default(),
            metadata_keys: DEFAULT_METADATA_KEYS.iter().map(|k| k.to_string()).collect(),
            date_format: "%Y-%m-%d".to_string(),
            add_completion_date: true,
            append_mode: AppendMode::default(),
            eol: Eol::default(),
            indent_size: 4,
            use_spaces: true,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the workspace root
        config.workspace_root =
            Self::expand_path(&config.workspace_root).unwrap_or(config.workspace_root);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/todo-notes");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    /// One indentation unit for generated todo templates.
    pub fn indent_unit(&self) -> String {
        if self.use_spaces {
            " ".repeat(self.indent_size)
        } else {
            "\t".to_string()
        }
    }

    pub fn detection_options(&self) -> DetectionOptions {
        DetectionOptions {
            mode: self.todo_range_detection_mode,
            min_todo_level: self.min_todo_level,
        }
    }

    pub fn metadata_options(&self) -> MetadataOptions {
        MetadataOptions {
            inherit_from_ancestors: self.inherit_parent_todo_metadata,
            merge_policy: self.metadata_merge_policy,
            keys: self.metadata_keys.clone(),
        }
    }

    /// Engine options for completing a todo in a document stored in `document_dir`.
    ///
    /// `completed_date` is only stamped when `add_completion_date` is set.
    pub fn completion_options(
        &self,
        document_dir: impl Into<PathBuf>,
        completed_date: Option<String>,
    ) -> CompletionOptions {
        let mut options = CompletionOptions::new(&self.workspace_root, document_dir);
        options.detection = self.detection_options();
        options.metadata = self.metadata_options();
        options.default_folder = RelativePathBuf::from(self.save_notes_path.as_str());
        options.append_mode = self.append_mode;
        options.completed_date = completed_date.filter(|_| self.add_completion_date);
        options.eol = self.eol.as_str().to_string();
        options
    }
}
