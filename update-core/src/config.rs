use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
  pub logging: LoggingConfig,
  pub ui: UiConfig,
  pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_log_level")]
  pub level: String,

  /// Daily rolling file under `<base>\logs`.
  #[serde(default)]
  pub file: bool,

  #[serde(default)]
  pub stderr: bool,

  #[serde(default = "default_retention_days")]
  pub retention_days: u64,
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_retention_days() -> u64 {
  14
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: false,
      stderr: false,
      retention_days: default_retention_days(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UiConfig {
  /// Culture name such as `ja-JP`. Unset means use the OS UI language.
  #[serde(default)]
  pub locale: Option<String>,

  #[serde(default = "default_true")]
  pub pause_on_exit: bool,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      locale: None,
      pause_on_exit: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
  #[serde(default = "default_client_application_id")]
  pub client_application_id: String,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      client_application_id: default_client_application_id(),
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_client_application_id() -> String {
  "AutoWindowsUpdate".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
  #[serde(default)]
  pub logging: Option<LoggingConfig>,

  #[serde(default)]
  pub ui: Option<UiConfig>,

  #[serde(default)]
  pub session: Option<SessionConfig>,
}

impl ConfigFile {
  fn normalize(self) -> Config {
    let mut cfg = Config::default();
    if let Some(l) = self.logging {
      cfg.logging = l;
    }
    if let Some(u) = self.ui {
      cfg.ui = u;
    }
    if let Some(s) = self.session {
      cfg.session = s;
    }

    if cfg.session.client_application_id.trim().is_empty() {
      tracing::warn!("session.client_application_id is empty; using default");
      cfg.session.client_application_id = default_client_application_id();
    }

    cfg
  }
}

pub fn parse(raw: &str) -> anyhow::Result<Config> {
  let file: ConfigFile = toml::from_str(raw)?;
  Ok(file.normalize())
}

/// Loads the optional config file. The file is never created or rewritten;
/// a missing, unreadable or invalid file falls back to defaults.
pub fn load_or_default_readonly(path: &Path) -> anyhow::Result<Config> {
  if !path.exists() {
    return Ok(Config::default());
  }

  let raw = match fs::read_to_string(path) {
    Ok(r) => r,
    Err(e) => {
      eprintln!(
        "Auto Windows Update: cannot read config at {}; using defaults: {e}",
        path.display()
      );
      return Ok(Config::default());
    }
  };

  match parse(&raw) {
    Ok(cfg) => Ok(cfg),
    Err(e) => {
      eprintln!(
        "Auto Windows Update: invalid config at {}; using defaults: {e}",
        path.display()
      );
      Ok(Config::default())
    }
  }
}
