//! Building an [`Application`] from configuration.
//!
//! Route declarations name their handler; the registry passed to
//! [`from_config`] supplies the code behind each name.
//!
//! ```rust,no_run
//! use daedalus::{bootstrap, handler, ConfigLoader, HandlerRegistry};
//!
//! # fn main() -> Result<(), daedalus::DaedalusError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("daedalus.toml")?
//!     .with_env_prefix("DAEDALUS")
//!     .load()?;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.insert("listPets".to_string(), handler::constant(|| "[]"));
//!
//! let app = bootstrap::from_config(&config, &registry)?;
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use daedalus_config::{DaedalusConfig, RouteDeclaration};
use daedalus_telemetry::{init_logging, TelemetryError};
use tracing::{debug, info};

use crate::app::{Application, ApplicationBuilder};
use crate::error::{DaedalusError, DaedalusResult};
use crate::handler::BoxedHandler;

/// Handlers by the name route declarations refer to them with.
pub type HandlerRegistry = HashMap<String, BoxedHandler>;

/// Builds an application from a loaded configuration.
///
/// Logging is initialised first so route registration is already logged.
/// A subscriber installed earlier by the host is kept.
///
/// # Errors
///
/// Fails on an invalid configuration, an invalid log filter, a declaration
/// naming a handler missing from `registry`, or a route the engine rejects.
pub fn from_config(config: &DaedalusConfig, registry: &HandlerRegistry) -> DaedalusResult<Application> {
    config.validate()?;

    match init_logging(&config.logging.to_log_config()) {
        Ok(()) | Err(TelemetryError::LoggingInit(_)) => {}
        Err(err) => return Err(err.into()),
    }

    let mut builder = ApplicationBuilder::with_options(config.router.to_options()?);
    for declaration in &config.routes {
        register(&mut builder, declaration, registry)?;
    }

    let app = builder.build()?;
    info!(routes = app.router().len(), "application bootstrapped from configuration");
    Ok(app)
}

fn register(
    builder: &mut ApplicationBuilder,
    declaration: &RouteDeclaration,
    registry: &HandlerRegistry,
) -> DaedalusResult<()> {
    let handler = registry
        .get(&declaration.handler)
        .ok_or_else(|| DaedalusError::unknown_handler(&declaration.handler, &declaration.pattern))?;
    let attributes = declaration.attribute_values()?;

    debug!(
        method = %declaration.method,
        pattern = %declaration.pattern,
        handler = %declaration.handler,
        "registering declared route"
    );

    let mut route = builder.route(&declaration.method, &declaration.pattern, Arc::clone(handler));
    if !declaration.consumes.is_empty() {
        route = route.consumes(&declaration.consumes);
    }
    if !declaration.produces.is_empty() {
        route = route.produces(&declaration.produces);
    }
    if let Some(name) = &declaration.name {
        route = route.name(name.as_str());
    }
    route = route.excludes(&declaration.excludes);
    for (key, value) in attributes {
        route = route.attr(key, value);
    }
    Ok(())
}
