use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::core::errors::{AppError, AppResult};

/// Application-level settings (`[app]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Display name of the application
    pub name: Option<String>,

    /// Process-wide default timezone
    #[serde(default = "AppSettings::default_timezone")]
    pub timezone: String,

    /// Selects the `test_db` section instead of `db`
    #[serde(default)]
    pub testing: bool,
}

impl AppSettings {
    fn default_timezone() -> String {
        "Australia/Melbourne".to_string()
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: None,
            timezone: Self::default_timezone(),
            testing: false,
        }
    }
}

/// A service section: an optional provider name plus free-form settings.
///
/// The `class` key names an alternate provider registered for the section's
/// capability; every other key is handed to the provider untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSection {
    pub class: Option<String>,

    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl ServiceSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder helper used mostly by tests.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }

    /// Deserializes the settings into a provider-specific config type.
    pub fn parse<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(Value::Object(self.settings.clone()))
            .map_err(|e| AppError::Config(format!("invalid section settings: {}", e)))
    }
}

/// Error rendering settings (`[error]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorSettings {
    /// Render errors with their debug representation
    #[serde(default)]
    pub debug: bool,
}

/// Maintenance mode settings (`[maintenance]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "MaintenanceConfig::default_controller")]
    pub controller: String,

    #[serde(default = "MaintenanceConfig::default_action")]
    pub action: String,
}

impl MaintenanceConfig {
    fn default_controller() -> String {
        "home".to_string()
    }

    fn default_action() -> String {
        "maintain".to_string()
    }

    /// The `controller/action` route served while maintenance is on.
    pub fn route(&self) -> String {
        format!("{}/{}", self.controller, self.action)
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            controller: Self::default_controller(),
            action: Self::default_action(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppSettings,

    pub default_language: Option<String>,

    pub log: Option<ServiceSection>,
    pub mail: Option<ServiceSection>,
    pub error: Option<ErrorSettings>,
    pub request: Option<ServiceSection>,
    pub router: Option<ServiceSection>,
    pub session: Option<ServiceSection>,
    pub db: Option<ServiceSection>,
    pub test_db: Option<ServiceSection>,

    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl Config {
    pub fn from_value(value: Value) -> AppResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| AppError::Config(format!("invalid configuration: {}", e)))
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("invalid TOML: {}", e)))
    }

    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        serde_yaml::from_str(content).map_err(|e| AppError::Config(format!("invalid YAML: {}", e)))
    }

    /// Loads a configuration file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_value(serde_json::from_str(&content)?),
            other => Err(AppError::Config(format!(
                "unsupported config format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// The database section in effect, with the key it was read from.
    pub fn database_section(&self) -> Option<(&'static str, &ServiceSection)> {
        if self.app.testing {
            if let Some(section) = self.test_db.as_ref() {
                return Some(("test_db", section));
            }
        }
        self.db.as_ref().map(|section| ("db", section))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::from_value(json!({})).unwrap();
        assert!(config.app.name.is_none());
        assert_eq!(config.app.timezone, "Australia/Melbourne");
        assert!(config.router.is_none());
        assert!(config.database_section().is_none());
        assert!(!config.maintenance.enabled);
        assert_eq!(config.maintenance.route(), "home/maintain");
    }

    #[test]
    fn test_section_class_is_split_from_settings() {
        let config = Config::from_value(json!({
            "router": {
                "class": "custom.Router",
                "default_controller": "home",
                "default_action": "index"
            }
        }))
        .unwrap();

        let router = config.router.unwrap();
        assert_eq!(router.class.as_deref(), Some("custom.Router"));
        assert_eq!(router.get_str("default_controller"), Some("home"));
        assert!(router.get("class").is_none());
    }

    #[test]
    fn test_testing_flag_selects_test_db() {
        let config = Config::from_value(json!({
            "app": { "testing": true },
            "db": { "db_name": "prod" },
            "test_db": { "db_name": "test" }
        }))
        .unwrap();

        let (key, section) = config.database_section().unwrap();
        assert_eq!(key, "test_db");
        assert_eq!(section.get_str("db_name"), Some("test"));
    }

    #[test]
    fn test_testing_flag_falls_back_to_db() {
        let config = Config::from_value(json!({
            "app": { "testing": true },
            "db": { "db_name": "prod" }
        }))
        .unwrap();

        let (key, _) = config.database_section().unwrap();
        assert_eq!(key, "db");
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        #[derive(Debug, Deserialize)]
        struct Typed {
            #[allow(dead_code)]
            port: u16,
        }

        let section = ServiceSection::new().with_setting("port", "not-a-number");
        let err = section.parse::<Typed>().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_toml_and_yaml_agree() {
        let toml_cfg = Config::from_toml_str(
            r#"
default_language = "de_DE"

[app]
name = "Demo"

[session]
handler = "memory"
"#,
        )
        .unwrap();

        let yaml_cfg = Config::from_yaml_str(
            r#"
default_language: de_DE
app:
  name: Demo
session:
  handler: memory
"#,
        )
        .unwrap();

        assert_eq!(toml_cfg.app.name, yaml_cfg.app.name);
        assert_eq!(toml_cfg.default_language, yaml_cfg.default_language);
        assert_eq!(toml_cfg.session, yaml_cfg.session);
    }
}
