use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub visual_recognition: VisualRecognitionConfig,
    pub alchemy: AlchemyConfig,
    pub classify: ClassifySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub static_dir: PathBuf,
    pub views_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualRecognitionConfig {
    pub url: String,
    pub version_date: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlchemyConfig {
    pub url: String,
    pub api_key: String,
}

/// Which remote service answers `/api/classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyMode {
    /// Configured classifier ids, results filtered to them.
    #[default]
    Fixed,
    /// Keyword extraction, normalized into classifier scores.
    Keywords,
    /// `classifier_id` from the request when given, keywords otherwise.
    Request,
}

impl FromStr for ClassifyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ClassifyMode::Fixed),
            "keywords" => Ok(ClassifyMode::Keywords),
            "request" => Ok(ClassifyMode::Request),
            _ => Err(ConfigError::InvalidValue {
                key: "CLASSIFY_MODE",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifySettings {
    pub mode: ClassifyMode,
    pub classifier_ids: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_bytes: 40 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("public"),
            views_dir: PathBuf::from("views"),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for VisualRecognitionConfig {
    fn default() -> Self {
        Self {
            url: "https://gateway.watsonplatform.net/visual-recognition-beta/api".to_string(),
            version_date: "2015-12-02".to_string(),
            username: "<username>".to_string(),
            password: "<password>".to_string(),
        }
    }
}

impl Default for AlchemyConfig {
    fn default() -> Self {
        Self {
            url: "https://gateway-a.watsonplatform.net/calls".to_string(),
            api_key: "<alchemy-key>".to_string(),
        }
    }
}

impl Default for ClassifySettings {
    fn default() -> Self {
        Self {
            mode: ClassifyMode::Fixed,
            classifier_ids: vec!["Test01_1000695352".to_string()],
        }
    }
}

impl AppConfig {
    /// Reads the YAML file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies environment-style overrides; `lookup` returns the value for a key if set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("VCAP_APP_PORT").or_else(|| lookup("PORT")) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(url) = lookup("VR_URL") {
            self.visual_recognition.url = url;
        }
        if let Some(username) = lookup("VR_USERNAME") {
            self.visual_recognition.username = username;
        }
        if let Some(password) = lookup("VR_PASSWORD") {
            self.visual_recognition.password = password;
        }
        if let Some(version_date) = lookup("VR_VERSION_DATE") {
            self.visual_recognition.version_date = version_date;
        }
        if let Some(url) = lookup("ALCHEMY_URL") {
            self.alchemy.url = url;
        }
        if let Some(api_key) = lookup("ALCHEMY_KEY") {
            self.alchemy.api_key = api_key;
        }
        if let Some(dir) = lookup("UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.storage.static_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("VIEWS_DIR") {
            self.storage.views_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup("CLASSIFY_MODE") {
            self.classify.mode = mode.parse()?;
        }
        if let Some(ids) = lookup("CLASSIFIER_IDS") {
            self.classify.classifier_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml(
            r#"
server:
  port: 8081
classify:
  mode: request
  classifier_ids: ["dogs_123"]
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.classify.mode, ClassifyMode::Request);
        assert_eq!(config.classify.classifier_ids, vec!["dogs_123".to_string()]);
        assert_eq!(config.storage.uploads_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9000"),
            ("VR_USERNAME", "user"),
            ("CLASSIFY_MODE", "Keywords"),
            ("CLASSIFIER_IDS", "a_1, b_2,,"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.visual_recognition.username, "user");
        assert_eq!(config.classify.mode, ClassifyMode::Keywords);
        assert_eq!(config.classify.classifier_ids, vec!["a_1", "b_2"]);
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| (key == "PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "PORT", .. })));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/app.yaml")).unwrap();
        assert_eq!(config.classify.mode, ClassifyMode::Fixed);
    }
}
