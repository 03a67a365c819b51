//! Typed configuration for Daedalus applications.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → files → env)
//! - Static route declarations bound to handlers by name
//!
//! # Example
//!
//! ```no_run
//! use daedalus_config::ConfigLoader;
//!
//! # fn main() -> Result<(), daedalus_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_dotenv()?
//!     .with_optional_file("daedalus.toml")?
//!     .with_env_prefix("DAEDALUS")
//!     .load()?;
//!
//! println!("{} static routes", config.routes.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [router]
//! ignore_case = false
//! default_produces = ["json"]
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [[routes]]
//! method = "GET"
//! pattern = "/pets/{id:[0-9]+}"
//! handler = "getPet"
//! name = "pet"
//! produces = ["json", "html"]
//!
//! [[routes]]
//! method = "POST"
//! pattern = "/pets"
//! handler = "createPet"
//! consumes = ["json"]
//! attributes = { role = "admin" }
//! ```
//!
//! # Environment Variable Overrides
//!
//! Scalar settings can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `DAEDALUS__ROUTER__IGNORE_CASE=true`
//! - `DAEDALUS__ROUTER__DEFAULT_PRODUCES=json,html`
//! - `DAEDALUS__LOGGING__FORMAT=pretty`

mod config;
mod error;
mod loader;
mod schema;

pub use config::{DaedalusConfig, DaedalusConfigBuilder};
pub use daedalus_telemetry::LogFormat;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LoggingSection, RouteDeclaration, RouterSection};
