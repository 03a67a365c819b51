//! Main configuration types.
//!
//! This module provides the top-level [`DaedalusConfig`] struct and its builder.

use std::collections::HashSet;

use daedalus_telemetry::{create_env_filter, LogFormat};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoggingSection, RouteDeclaration, RouterSection};

/// Complete Daedalus application configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use daedalus_config::DaedalusConfig;
///
/// let config = DaedalusConfig::default();
/// assert_eq!(config.logging.level, "info");
/// assert!(config.routes.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DaedalusConfig {
    /// Routing engine options.
    #[serde(default)]
    pub router: RouterSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Static route declarations, in registration order.
    #[serde(default)]
    pub routes: Vec<RouteDeclaration>,
}

impl DaedalusConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> DaedalusConfigBuilder {
        DaedalusConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the log level or a default
    /// media type is invalid, and `ConfigError::InvalidRoute` for the first
    /// unusable route declaration or a repeated route name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        create_env_filter(&self.logging.level)
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        self.router.to_options()?;

        let mut names = HashSet::new();
        for (index, route) in self.routes.iter().enumerate() {
            route.validate(index, self.router.ignore_case)?;
            if let Some(name) = &route.name {
                if !names.insert(name.as_str()) {
                    return Err(ConfigError::invalid_route(
                        index,
                        &route.pattern,
                        format!("route name `{name}` is declared twice"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty logs at `debug` with source locations and span events.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::DaedalusConfig;
    ///
    /// let config = DaedalusConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.file_line_info = true;
        config.logging.span_events = true;
        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON logs at `info`, no source locations.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.file_line_info = false;
        config.logging.span_events = false;
        config
    }
}

/// Builder for [`DaedalusConfig`].
#[derive(Debug, Default)]
pub struct DaedalusConfigBuilder {
    router: Option<RouterSection>,
    logging: Option<LoggingSection>,
    routes: Vec<RouteDeclaration>,
}

impl DaedalusConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the router section.
    #[must_use]
    pub fn router(mut self, router: RouterSection) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingSection) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Append a route declaration.
    #[must_use]
    pub fn route(mut self, route: RouteDeclaration) -> Self {
        self.routes.push(route);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> DaedalusConfig {
        DaedalusConfig {
            router: self.router.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            routes: self.routes,
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<DaedalusConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
