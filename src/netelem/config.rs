use crate::error::Result;
use crate::model::RoleId;
use crate::presentation::WindowKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "netelem.json";
const DEFAULT_CRATE_PATH: &str = "netelem";

/// Editor configuration, stored in netelem.json inside a host-chosen directory
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditorConfig {
    #[serde(default)]
    pub emit: EmitConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Naming and role restrictions handed to the code emitter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmitConfig {
    /// Subject area of the generated code (e.g. "Leader election")
    #[serde(default)]
    pub subject: String,

    /// Algorithm the generated code belongs to (e.g. "Chang Roberts")
    #[serde(default)]
    pub algorithm: String,

    /// Path the generated units import the attribute model from
    #[serde(default = "default_crate_path")]
    pub crate_path: String,

    /// Roles scanned for network, process and channel nodes
    #[serde(default = "default_class_roles")]
    pub class_roles: Vec<RoleId>,

    /// Roles scanned for message nodes
    #[serde(default = "default_message_roles")]
    pub message_roles: Vec<RoleId>,
}

/// What a reconciliation session scans and presents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default = "default_session_roles")]
    pub roles: Vec<RoleId>,

    #[serde(default)]
    pub window: WindowKind,
}

fn default_crate_path() -> String {
    DEFAULT_CRATE_PATH.to_string()
}

fn default_class_roles() -> Vec<RoleId> {
    vec![RoleId::Private, RoleId::OperationResults]
}

fn default_message_roles() -> Vec<RoleId> {
    vec![RoleId::OperationResults]
}

fn default_session_roles() -> Vec<RoleId> {
    RoleId::SCANNABLE.to_vec()
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            subject: String::new(),
            algorithm: String::new(),
            crate_path: default_crate_path(),
            class_roles: default_class_roles(),
            message_roles: default_message_roles(),
        }
    }
}

impl EmitConfig {
    pub fn new(subject: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            algorithm: algorithm.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            roles: default_session_roles(),
            window: WindowKind::default(),
        }
    }
}

impl EditorConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: EditorConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.emit.crate_path, "netelem");
        assert_eq!(
            config.emit.class_roles,
            vec![RoleId::Private, RoleId::OperationResults]
        );
        assert_eq!(config.session.roles.len(), 5);
        assert_eq!(config.session.window, WindowKind::Edit);
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = EditorConfig::load(temp_dir.path().join("absent")).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_save_creates_dir_and_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("cfg");

        let mut config = EditorConfig::default();
        config.emit = EmitConfig::new("Leader election", "Chang Roberts");
        config.session.window = WindowKind::Debug;
        config.save(&dir).unwrap();

        let loaded = EditorConfig::load(&dir).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILENAME),
            r#"{ "emit": { "subject": "Snapshots" }, "session": { "window": "read_only" } }"#,
        )
        .unwrap();

        let config = EditorConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.emit.subject, "Snapshots");
        assert_eq!(config.emit.crate_path, "netelem");
        assert_eq!(config.emit.message_roles, vec![RoleId::OperationResults]);
        assert_eq!(config.session.window, WindowKind::ReadOnly);
        assert_eq!(config.session.roles, RoleId::SCANNABLE.to_vec());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILENAME), "{ not json").unwrap();
        assert!(EditorConfig::load(temp_dir.path()).is_err());
    }
}
