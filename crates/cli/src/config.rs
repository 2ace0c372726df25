use anyhow::{Context, Result};
use directories::ProjectDirs;
use qr_form_client::api::DEFAULT_BASE_URL;
use qr_form_client::{ClientOptions, ResponseOrdering};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub page: PageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: Option<u64>,
    pub connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub download_dir: PathBuf,
    pub download: bool,
    pub ordering: ResponseOrdering,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: "qr-form/0.1".to_string(),
            timeout_seconds: None,
            connect_timeout_seconds: None,
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("generated_codes"),
            download: true,
            ordering: ResponseOrdering::Arrival,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "qr-form", "qr-form") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("config/default.toml")
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// A missing file is normal; a broken one is reported and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring config: {e:#}");
            Self::default()
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            user_agent: Some(self.backend.user_agent.clone()),
            timeout: self.backend.timeout_seconds.map(Duration::from_secs),
            connect_timeout: self.backend.connect_timeout_seconds.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_have_no_timeouts() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://localhost:5000");
        let options = config.client_options();
        assert!(options.timeout.is_none());
        assert!(options.connect_timeout.is_none());
        assert_eq!(config.page.ordering, ResponseOrdering::Arrival);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "https://qr.example.com"
            timeout_seconds = 10

            [page]
            ordering = "latest"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.base_url, "https://qr.example.com");
        assert_eq!(config.backend.user_agent, "qr-form/0.1");
        assert_eq!(
            config.client_options().timeout,
            Some(Duration::from_secs(10))
        );
        assert_eq!(config.page.ordering, ResponseOrdering::Latest);
        assert_eq!(config.page.download_dir, PathBuf::from("generated_codes"));
        assert!(config.page.download);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml"));
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend").unwrap();
        assert!(Config::load(file.path()).is_err());
        let config = Config::load_or_default(file.path());
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[page]\ndownload = false\ndownload_dir = \"out\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert!(!config.page.download);
        assert_eq!(config.page.download_dir, PathBuf::from("out"));
    }
}
