use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::language::Language;

pub const DEFAULT_API_URL: &str = "https://api.sensay.io";
pub const DEFAULT_API_VERSION: &str = "2025-05-01";
pub const DEFAULT_OWNER_ID: &str = "fitconnect-admin";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub api_version: String,
    pub org_secret: Option<String>,
    /// Replica that answers the public chat.
    pub replica_uuid: Option<String>,
    /// Sent as X-USER-ID on chat completions.
    pub user_id: String,
    pub owner_id: String,
    /// When unset the admin routes are open.
    pub admin_password: Option<String>,
    pub training_dir: PathBuf,
    pub bind_address: String,
    pub language: Option<String>,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            org_secret: None,
            replica_uuid: None,
            user_id: DEFAULT_OWNER_ID.to_string(),
            owner_id: DEFAULT_OWNER_ID.to_string(),
            admin_password: None,
            training_dir: PathBuf::from("training-data"),
            bind_address: "0.0.0.0:3000".to_string(),
            language: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    /// Config file (if any) with environment overrides applied on top.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Store the chat language in the config file at `path`. Environment
    /// overrides are not applied, so secrets set there stay out of the file.
    pub fn save_language_to(path: &Path, language: Language) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.language = Some(language.as_str().to_string());
        config.save_to(path)
    }

    /// Like [`Config::save_language_to`], for the user's config file. Returns its path.
    pub fn save_language(language: Language) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        Self::save_language_to(&config_path, language)?;
        Ok(config_path)
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SENSAY_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = get("SENSAY_API_VERSION") {
            self.api_version = v;
        }
        if let Some(v) = get("SENSAY_ORG_SECRET") {
            self.org_secret = Some(v);
        }
        if let Some(v) = get("REPLICA_UUID") {
            self.replica_uuid = Some(v);
        }
        if let Some(v) = get("FITCONNECT_USER_ID") {
            self.user_id = v;
        }
        if let Some(v) = get("FITCONNECT_OWNER_ID") {
            self.owner_id = v;
        }
        if let Some(v) = get("ADMIN_PASSWORD") {
            self.admin_password = Some(v);
        }
        if let Some(v) = get("FITCONNECT_TRAINING_DIR") {
            self.training_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FITCONNECT_BIND") {
            self.bind_address = v;
        }
        if let Some(v) = get("FITCONNECT_LANGUAGE") {
            self.language = Some(v);
        }
        if let Some(v) = get("FITCONNECT_LOG") {
            self.log_level = v;
        }
        if let Some(v) = get("FITCONNECT_LOG_JSON") {
            self.log_json = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }

    /// Settings that must be present before talking to the replica API.
    pub fn validate(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.org_secret.as_deref().map_or(true, |s| s.is_empty()) {
            missing.push("SENSAY_ORG_SECRET");
        }
        if self.replica_uuid.as_deref().map_or(true, |s| s.is_empty()) {
            missing.push("REPLICA_UUID");
        }
        missing
    }

    pub fn org_secret(&self) -> Result<&str> {
        self.org_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("SENSAY_ORG_SECRET is not configured"))
    }

    pub fn replica_uuid(&self) -> Result<&str> {
        self.replica_uuid
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("REPLICA_UUID is not configured"))
    }

    pub fn language(&self) -> Language {
        self.language
            .as_deref()
            .and_then(Language::from_str)
            .unwrap_or_default()
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("fitconnect").join("config.json"))
    }

    /// Where the chat session and log files live.
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("fitconnect"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_public_api() {
        let config = Config::new();
        assert_eq!(config.api_url, "https://api.sensay.io");
        assert_eq!(config.api_version, "2025-05-01");
        assert_eq!(config.user_id, "fitconnect-admin");
        assert_eq!(config.training_dir, PathBuf::from("training-data"));
        assert_eq!(config.language(), Language::English);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::new();
        config.apply_env(env(&[
            ("SENSAY_ORG_SECRET", "secret"),
            ("REPLICA_UUID", "abc-123"),
            ("FITCONNECT_LANGUAGE", "pt"),
            ("FITCONNECT_LOG_JSON", "true"),
            ("ADMIN_PASSWORD", ""),
        ]));
        assert_eq!(config.org_secret.as_deref(), Some("secret"));
        assert_eq!(config.replica_uuid.as_deref(), Some("abc-123"));
        assert_eq!(config.language(), Language::Portuguese);
        assert!(config.log_json);
        // Blank values are ignored.
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn validate_reports_missing_settings() {
        let config = Config::new();
        assert_eq!(config.validate(), vec!["SENSAY_ORG_SECRET", "REPLICA_UUID"]);

        let mut config = Config::new();
        config.apply_env(env(&[("SENSAY_ORG_SECRET", "s"), ("REPLICA_UUID", "r")]));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn load_from_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_from(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn load_from_partial_file_keeps_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"replica_uuid": "r-1", "language": "pt"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.replica_uuid.as_deref(), Some("r-1"));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.language(), Language::Portuguese);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn saved_language_keeps_other_file_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fitconnect").join("config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"replica_uuid": "r-1"}"#).unwrap();

        Config::save_language_to(&path, Language::Portuguese).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.language(), Language::Portuguese);
        assert_eq!(config.replica_uuid.as_deref(), Some("r-1"));
        assert!(config.org_secret.is_none());
    }

    #[test]
    fn saved_language_creates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.json");

        Config::save_language_to(&path, Language::English).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().language.as_deref(), Some("en"));
    }
}
