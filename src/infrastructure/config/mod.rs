//! Configuration management
//!
//! The configuration file is a YAML mapping of sections. Each section maps keys
//! to strings; values in `DEFAULT` are inherited by every other section.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::application::errors::ConfigError;

pub const CONFIG_FILE: &str = "lazysusan.yaml";
pub const DEFAULT_SECTION: &str = "DEFAULT";

const REQUIRED_KEYS: [&str; 4] = ["auth_id", "user_id", "room_id", "plugins"];

type RawSections = BTreeMap<String, BTreeMap<String, serde_yaml::Value>>;

/// Flattened key/value settings of one section
#[derive(Debug, Clone, Default)]
pub struct Config {
    section: String,
    values: BTreeMap<String, String>,
}

impl Config {
    /// Locations searched, later files overriding earlier ones
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_FILE));
        }
        paths.push(PathBuf::from(CONFIG_FILE));
        paths
    }

    /// Load `section` from the standard locations
    pub fn load(section: &str) -> Result<Self, ConfigError> {
        Self::load_from(&Self::search_paths(), section)
    }

    /// Load `section` from every existing file among `paths`
    pub fn load_from(paths: &[PathBuf], section: &str) -> Result<Self, ConfigError> {
        let mut sections = RawSections::new();
        let mut found = false;

        for path in paths.iter().filter(|p| p.is_file()) {
            tracing::debug!("Reading {}", path.display());
            let content = std::fs::read_to_string(path)?;
            for (name, values) in parse_sections(&content, path)? {
                sections.entry(name).or_default().extend(values);
            }
            found = true;
        }

        if !found {
            return Err(ConfigError::NotFound(paths.to_vec()));
        }
        Self::from_sections(sections, section)
    }

    pub fn from_yaml_str(content: &str, section: &str) -> Result<Self, ConfigError> {
        Self::from_sections(parse_sections(content, Path::new("<inline>"))?, section)
    }

    fn from_sections(mut sections: RawSections, section: &str) -> Result<Self, ConfigError> {
        if section != DEFAULT_SECTION && !sections.contains_key(section) {
            return Err(ConfigError::MissingSection(section.to_string()));
        }

        let mut raw = sections.remove(DEFAULT_SECTION).unwrap_or_default();
        if let Some(own) = sections.remove(section) {
            raw.extend(own);
        }

        let mut values = BTreeMap::new();
        for (key, value) in raw {
            let text = scalar_text(&key, value)?;
            values.insert(key, text);
        }

        let config = Self {
            section: section.to_string(),
            values,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for key in REQUIRED_KEYS {
            self.require(key)?;
        }
        Ok(())
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingField(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Non-empty, trimmed lines of a newline-separated value
    pub fn lines(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Suffixes of every key starting with `prefix`, sorted
    pub fn suffixes(&self, prefix: &str) -> Vec<&str> {
        self.values
            .keys()
            .filter_map(|k| k.strip_prefix(prefix))
            .collect()
    }

    pub fn user_id(&self) -> Result<&str, ConfigError> {
        self.require("user_id")
    }

    pub fn room_id(&self) -> Result<&str, ConfigError> {
        self.require("room_id")
    }

    pub fn auth_id(&self) -> Result<&str, ConfigError> {
        self.require("auth_id")
    }

    pub fn plugins(&self) -> Vec<String> {
        self.lines("plugins")
    }

    pub fn admin_ids(&self) -> Vec<String> {
        self.lines("admin_ids")
    }

    /// Starter file written by `init-config`
    pub fn sample() -> &'static str {
        r#"DEFAULT:
  auth_id: "auth+live+0000000000000000000000000000000000000000"
  user_id: "000000000000000000000000"
  room_id: "000000000000000000000000"
  plugins: |
    botdj.Dj
    botdj.Playlist
  admin_ids: ""
  botplaylist.chill: |
    4e0a3c2b14169c5c4c000001
    4e0a3c2b14169c5c4c000002
"#
    }
}

fn parse_sections(content: &str, path: &Path) -> Result<RawSections, ConfigError> {
    serde_yaml::from_str(content)
        .map_err(|e| ConfigError::Parse(format!("Failed to parse {}: {}", path.display(), e)))
}

fn scalar_text(key: &str, value: serde_yaml::Value) -> Result<String, ConfigError> {
    use serde_yaml::Value;

    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        // Lists are accepted as an alternative to newline-separated strings
        Value::Sequence(items) => {
            let lines = items
                .into_iter()
                .map(|item| scalar_text(key, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lines.join("\n"))
        }
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "expected a string or a list of strings".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
DEFAULT:
  auth_id: auth
  user_id: bot
  room_id: room
  plugins: |
    botdj.Dj
    botdj.Playlist
  botplaylist.chill: |
    s1
    s2

party:
  room_id: party-room
  plugins:
    - botdj.Dj
  admin_ids: "boss"
  botplaylist.loud: s3
"#;

    #[test]
    fn test_default_section() {
        let config = Config::from_yaml_str(SAMPLE, DEFAULT_SECTION).unwrap();
        assert_eq!(config.room_id().unwrap(), "room");
        assert_eq!(config.plugins(), vec!["botdj.Dj", "botdj.Playlist"]);
        assert_eq!(config.lines("botplaylist.chill"), vec!["s1", "s2"]);
        assert!(config.admin_ids().is_empty());
    }

    #[test]
    fn test_section_inherits_defaults() {
        let config = Config::from_yaml_str(SAMPLE, "party").unwrap();
        assert_eq!(config.auth_id().unwrap(), "auth");
        assert_eq!(config.room_id().unwrap(), "party-room");
        assert_eq!(config.plugins(), vec!["botdj.Dj"]);
        assert_eq!(config.admin_ids(), vec!["boss"]);
        assert_eq!(config.suffixes("botplaylist."), vec!["chill", "loud"]);
    }

    #[test]
    fn test_missing_section() {
        let err = Config::from_yaml_str(SAMPLE, "nope").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection(s) if s == "nope"));
    }

    #[test]
    fn test_missing_required_key() {
        let err = Config::from_yaml_str("DEFAULT:\n  auth_id: a\n", DEFAULT_SECTION).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn test_no_file_found() {
        let paths = vec![PathBuf::from("/nonexistent/lazysusan.yaml")];
        let err = Config::load_from(&paths, DEFAULT_SECTION).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_sample_is_valid() {
        let config = Config::from_yaml_str(Config::sample(), DEFAULT_SECTION).unwrap();
        assert_eq!(config.suffixes("botplaylist."), vec!["chill"]);
    }
}
