//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use daedalus_router::{AttrValue, MediaType, PathPattern, RouterOptions};
use daedalus_telemetry::{LogConfig, LogFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ConfigError;

/// Router configuration section.
///
/// # Example
///
/// ```
/// use daedalus_config::RouterSection;
///
/// let section = RouterSection {
///     ignore_case: true,
///     default_produces: vec!["json".to_string()],
/// };
/// let options = section.to_options().unwrap();
/// assert_eq!(options.default_produces[0].name(), "application/json");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    /// Match literal and glob path segments case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,

    /// `produces` for routes that do not declare one. Empty means `*/*`.
    #[serde(default)]
    pub default_produces: Vec<String>,
}

impl RouterSection {
    /// Resolves the section into engine options.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a media type does not resolve.
    pub fn to_options(&self) -> Result<RouterOptions, ConfigError> {
        let default_produces = self
            .default_produces
            .iter()
            .map(|value| {
                MediaType::resolve(value)
                    .map_err(|e| ConfigError::invalid_value("router.default_produces", e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RouterOptions {
            ignore_case: self.ignore_case,
            default_produces,
        })
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. `info`, `daedalus_router=debug,info`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub file_line_info: bool,

    /// Include thread IDs in logs.
    #[serde(default)]
    pub thread_ids: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            file_line_info: false,
            thread_ids: false,
        }
    }
}

impl LoggingSection {
    /// Converts into the telemetry crate's configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            span_events: self.span_events,
            file_line_info: self.file_line_info,
            thread_ids: self.thread_ids,
            ..LogConfig::default()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "GET".to_string()
}

/// A static route declaration.
///
/// `handler` names an entry in the application's handler registry.
/// Attribute values may be strings, numbers, booleans, enum constants
/// written as `{ type = "Level", variant = "High" }`, or arrays of one of
/// those kinds.
///
/// ```toml
/// [[routes]]
/// method = "POST"
/// pattern = "/pets"
/// handler = "createPet"
/// consumes = ["json"]
/// produces = ["json"]
///
/// [routes.attributes]
/// role = "admin"
/// scopes = ["pets:write"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouteDeclaration {
    /// HTTP method, or `*` for any.
    #[serde(default = "default_method")]
    pub method: String,

    /// Path pattern.
    pub pattern: String,

    /// Registry name of the handler.
    pub handler: String,

    /// Route name for lookup and reverse routing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Accepted request body types. Empty means `*/*`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,

    /// Producible response types. Empty means the router default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,

    /// Sub-paths the route must not match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,

    /// Route attributes.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, Value>,
}

impl RouteDeclaration {
    /// Creates a declaration with no media type constraints.
    pub fn new(method: impl Into<String>, pattern: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            pattern: pattern.into(),
            handler: handler.into(),
            name: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            excludes: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    /// Converts the attribute table into engine values, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first unsupported value.
    pub fn attribute_values(&self) -> Result<Vec<(String, AttrValue)>, ConfigError> {
        self.attributes
            .iter()
            .map(|(key, value)| {
                to_attr_value(value)
                    .and_then(|attr| attr.validate().map(|()| attr).map_err(|e| e.to_string()))
                    .map(|attr| (key.clone(), attr))
                    .map_err(|reason| ConfigError::invalid_value(format!("attributes.{key}"), reason))
            })
            .collect()
    }

    /// Checks everything that can be checked without the handler registry.
    pub(crate) fn validate(&self, index: usize, ignore_case: bool) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::invalid_route(index, &self.pattern, reason);

        if self.method.trim().is_empty() {
            return Err(invalid("method cannot be empty".to_string()));
        }
        if self.pattern.trim().is_empty() {
            return Err(invalid("pattern cannot be empty".to_string()));
        }
        if self.handler.trim().is_empty() {
            return Err(invalid("handler cannot be empty".to_string()));
        }
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(invalid("name cannot be empty".to_string()));
        }

        PathPattern::compile(&self.pattern, ignore_case).map_err(|e| invalid(e.to_string()))?;
        for exclude in &self.excludes {
            PathPattern::compile(exclude, ignore_case).map_err(|e| invalid(e.to_string()))?;
        }
        for media_type in self.consumes.iter().chain(&self.produces) {
            MediaType::resolve(media_type).map_err(|e| invalid(e.to_string()))?;
        }
        self.attribute_values().map_err(|e| invalid(e.to_string()))?;

        Ok(())
    }
}

fn to_attr_value(value: &Value) -> Result<AttrValue, String> {
    match value {
        Value::String(s) => Ok(AttrValue::Str(s.clone())),
        Value::Bool(b) => Ok(AttrValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(AttrValue::Int(i)),
            None => n
                .as_f64()
                .map(AttrValue::Float)
                .ok_or_else(|| format!("number {n} is out of range")),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(_) => Err("nested arrays are not supported".to_string()),
                other => to_attr_value(other),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(AttrValue::Array),
        Value::Object(map) => match (map.get("type"), map.get("variant"), map.len()) {
            (Some(Value::String(type_name)), Some(Value::String(variant)), 2) => {
                Ok(AttrValue::enumeration(type_name.as_str(), variant.as_str()))
            }
            _ => Err("tables must be enum constants with `type` and `variant`".to_string()),
        },
        Value::Null => Err("null is not a supported attribute value".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logging_section_to_log_config() {
        let section = LoggingSection {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            file_line_info: true,
            ..LoggingSection::default()
        };
        let config = section.to_log_config();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_line_info);
        assert!(config.include_target);
    }

    #[test]
    fn test_router_section_rejects_bad_media_type() {
        let section = RouterSection {
            default_produces: vec!["*/json".to_string()],
            ..RouterSection::default()
        };
        assert!(matches!(
            section.to_options(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_route_declaration_defaults() {
        let route: RouteDeclaration =
            serde_json::from_value(json!({"pattern": "/pets", "handler": "listPets"})).unwrap();
        assert_eq!(route.method, "GET");
        assert!(route.consumes.is_empty());
        assert!(route.name.is_none());
    }

    #[test]
    fn test_route_declaration_rejects_unknown_fields() {
        let result: Result<RouteDeclaration, _> = serde_json::from_value(
            json!({"pattern": "/pets", "handler": "listPets", "verb": "GET"}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_attribute_values() {
        let mut route = RouteDeclaration::new("GET", "/", "root");
        route.attributes.insert("role".into(), json!("admin"));
        route.attributes.insert("weight".into(), json!(3));
        route.attributes.insert("ratio".into(), json!(0.5));
        route.attributes.insert("public".into(), json!(true));
        route.attributes.insert("scopes".into(), json!(["read", "write"]));
        route.attributes.insert("level".into(), json!({"type": "Level", "variant": "High"}));

        let values = route.attribute_values().unwrap();
        assert_eq!(values[0], ("role".to_string(), AttrValue::Str("admin".into())));
        assert_eq!(values[1].1, AttrValue::Int(3));
        assert_eq!(values[2].1, AttrValue::Float(0.5));
        assert_eq!(values[3].1, AttrValue::Bool(true));
        assert_eq!(values[4].1.as_array().map(<[AttrValue]>::len), Some(2));
        assert_eq!(values[5].1, AttrValue::enumeration("Level", "High"));
    }

    #[test]
    fn test_unsupported_attribute_values() {
        for bad in [json!(null), json!([[1]]), json!([1, "x"]), json!({"a": 1})] {
            let mut route = RouteDeclaration::new("GET", "/", "root");
            route.attributes.insert("bad".into(), bad);
            assert!(route.attribute_values().is_err());
        }
    }

    #[test]
    fn test_validate_route() {
        let ok = RouteDeclaration {
            consumes: vec!["json".into()],
            excludes: vec!["/pets/internal/**".into()],
            ..RouteDeclaration::new("POST", "/pets/**", "createPet")
        };
        assert!(ok.validate(0, false).is_ok());

        let bad_pattern = RouteDeclaration::new("GET", "/a/**/b", "x");
        assert!(matches!(
            bad_pattern.validate(3, false),
            Err(ConfigError::InvalidRoute { index: 3, .. })
        ));

        let bad_media = RouteDeclaration {
            produces: vec!["nonsense".into()],
            ..RouteDeclaration::new("GET", "/", "x")
        };
        assert!(bad_media.validate(0, false).is_err());

        let no_handler = RouteDeclaration::new("GET", "/", " ");
        assert!(no_handler.validate(0, false).is_err());

        let no_pattern = RouteDeclaration::new("GET", "", "x");
        assert!(no_pattern.validate(0, false).is_err());
    }
}
