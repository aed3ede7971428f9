use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MISSING_CONFIG: &str = "No configuration file found. \
  Create one at ~/.config/boardsync/config.yaml\n\
  See boardsync.example.yaml for the format.";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Board to make active on startup (defaults to the first board listed)
  pub default_board: Option<String>,
  #[serde(default)]
  pub tasks: TasksConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the board API, e.g. https://boards.example.com/api/
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksConfig {
  /// Page size (`limit`) used in task-list queries
  #[serde(default = "default_page_size")]
  pub page_size: u32,
}

impl Default for TasksConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
    }
  }
}

fn default_page_size() -> u32 {
  20
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is unset
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Log to a file in the data directory instead of stderr
  #[serde(default = "default_log_file")]
  pub file: bool,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: default_log_file(),
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_log_file() -> bool {
  true
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./boardsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/boardsync/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(MISSING_CONFIG)),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("boardsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("boardsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the API token from environment variables.
  ///
  /// Checks BOARDSYNC_API_TOKEN first, then BOARD_API_TOKEN as fallback.
  /// The API may be unauthenticated, so a missing token is not an error.
  pub fn get_api_token() -> Option<String> {
    std::env::var("BOARDSYNC_API_TOKEN")
      .or_else(|_| std::env::var("BOARD_API_TOKEN"))
      .ok()
      .filter(|token| !token.is_empty())
  }
}
