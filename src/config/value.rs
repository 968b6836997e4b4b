//! Tagged document values shared by all fragment formats
//!
//! Fragments arrive as YAML, JSON, or TOML. They are normalized into one
//! `ConfigValue` variant so the schema setters dispatch over a single
//! representation instead of three parser ASTs.

use std::fmt;
use std::path::Path;

use crate::config::ConfigError;

/// A parsed configuration fragment value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Sequence(Vec<ConfigValue>),
    Mapping(Vec<(String, ConfigValue)>),
}

impl ConfigValue {
    /// Human-readable type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::Str(_) => "string",
            ConfigValue::Sequence(_) => "sequence",
            ConfigValue::Mapping(_) => "mapping",
        }
    }

    /// Build a nested single-entry mapping from a dotted path, so argument
    /// overrides like `train_config.num_steps=1000` reuse the same setter
    /// machinery as file-based fragments.
    pub fn from_dotted_path(path: &str, value: ConfigValue) -> ConfigValue {
        let mut result = value;
        for segment in path.rsplit('.') {
            result = ConfigValue::Mapping(vec![(segment.to_string(), result)]);
        }
        result
    }

    pub(crate) fn from_yaml(value: serde_yaml::Value, path: &Path) -> Result<ConfigValue, ConfigError> {
        Ok(match value {
            serde_yaml::Value::Null => ConfigValue::Null,
            serde_yaml::Value::Bool(b) => ConfigValue::Bool(b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ConfigValue::Int(i)
                } else {
                    ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_yaml::Value::String(s) => ConfigValue::Str(s),
            serde_yaml::Value::Sequence(items) => ConfigValue::Sequence(
                items.into_iter().map(|v| Self::from_yaml(v, path)).collect::<Result<_, _>>()?,
            ),
            serde_yaml::Value::Mapping(entries) => {
                let mut converted = Vec::with_capacity(entries.len());
                for (key, val) in entries {
                    let serde_yaml::Value::String(key) = key else {
                        return Err(ConfigError::Parse {
                            path: path.to_path_buf(),
                            message: "mapping keys must be strings".to_string(),
                        });
                    };
                    converted.push((key, Self::from_yaml(val, path)?));
                }
                ConfigValue::Mapping(converted)
            }
            serde_yaml::Value::Tagged(tagged) => Self::from_yaml(tagged.value, path)?,
        })
    }

    pub(crate) fn from_json(value: serde_json::Value, path: &Path) -> Result<ConfigValue, ConfigError> {
        Ok(match value {
            serde_json::Value::Null => ConfigValue::Null,
            serde_json::Value::Bool(b) => ConfigValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ConfigValue::Int(i)
                } else {
                    ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => ConfigValue::Str(s),
            serde_json::Value::Array(items) => ConfigValue::Sequence(
                items.into_iter().map(|v| Self::from_json(v, path)).collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(entries) => {
                let mut converted = Vec::with_capacity(entries.len());
                for (key, val) in entries {
                    converted.push((key, Self::from_json(val, path)?));
                }
                ConfigValue::Mapping(converted)
            }
        })
    }

    pub(crate) fn from_toml(value: toml::Value, path: &Path) -> Result<ConfigValue, ConfigError> {
        Ok(match value {
            toml::Value::Boolean(b) => ConfigValue::Bool(b),
            toml::Value::Integer(i) => ConfigValue::Int(i),
            toml::Value::Float(f) => ConfigValue::Float(f),
            toml::Value::String(s) => ConfigValue::Str(s),
            toml::Value::Datetime(dt) => ConfigValue::Str(dt.to_string()),
            toml::Value::Array(items) => ConfigValue::Sequence(
                items.into_iter().map(|v| Self::from_toml(v, path)).collect::<Result<_, _>>()?,
            ),
            toml::Value::Table(entries) => {
                let mut converted = Vec::with_capacity(entries.len());
                for (key, val) in entries {
                    converted.push((key, Self::from_toml(val, path)?));
                }
                ConfigValue::Mapping(converted)
            }
        })
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "null"),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Str(s) => write!(f, "{}", s),
            ConfigValue::Sequence(_) => write!(f, "<sequence>"),
            ConfigValue::Mapping(_) => write!(f, "<mapping>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dotted_path_builds_nested_mapping() {
        let value = ConfigValue::from_dotted_path("train_config.num_steps", ConfigValue::Int(1000));
        let ConfigValue::Mapping(outer) = value else { panic!("expected mapping") };
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].0, "train_config");
        let ConfigValue::Mapping(inner) = &outer[0].1 else { panic!("expected nested mapping") };
        assert_eq!(inner[0], ("num_steps".to_string(), ConfigValue::Int(1000)));
    }

    #[test]
    fn test_from_dotted_path_single_segment() {
        let value = ConfigValue::from_dotted_path("model", ConfigValue::Bool(true));
        let ConfigValue::Mapping(outer) = value else { panic!("expected mapping") };
        assert_eq!(outer[0], ("model".to_string(), ConfigValue::Bool(true)));
    }

    #[test]
    fn test_yaml_conversion_preserves_key_order() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("b: 1\na: 2\n").expect("yaml");
        let value = ConfigValue::from_yaml(yaml, std::path::Path::new("t.yml")).expect("convert");
        let ConfigValue::Mapping(entries) = value else { panic!("expected mapping") };
        assert_eq!(entries[0].0, "b");
        assert_eq!(entries[1].0, "a");
    }

    #[test]
    fn test_yaml_non_string_key_rejected() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: x\n").expect("yaml");
        let result = ConfigValue::from_yaml(yaml, std::path::Path::new("t.yml"));
        assert!(result.is_err(), "integer mapping key should be rejected");
    }

    #[test]
    fn test_json_numbers_split_int_and_float() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a": 3, "b": 0.5}"#).expect("json");
        let value = ConfigValue::from_json(json, std::path::Path::new("t.json")).expect("convert");
        let ConfigValue::Mapping(entries) = value else { panic!("expected mapping") };
        assert_eq!(entries[0].1, ConfigValue::Int(3));
        assert_eq!(entries[1].1, ConfigValue::Float(0.5));
    }
}
