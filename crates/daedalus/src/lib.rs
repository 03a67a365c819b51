//! # Daedalus
//!
//! **Content-negotiating request routing for HTTP services**
//!
//! Daedalus selects the handler for a request from a sealed route table,
//! taking the method, the path, the request body type and the client's
//! `Accept` preferences into account, and answers the cases where nothing
//! fits with the right status: `404`, `405`, `415` or `406`.
//!
//! ## Quick Start
//!
//! ```rust
//! use bytes::Bytes;
//! use daedalus::prelude::*;
//!
//! let mut builder = Application::builder();
//! builder
//!     .get("/pets/{id:[0-9]+}", handler::with_request(|req| {
//!         Ok(format!(r#"{{"id":{}}}"#, req.param("id").unwrap_or("0")))
//!     }))
//!     .produces(["json"])
//!     .name("pet");
//! let app = builder.build()?;
//!
//! let request = http::Request::builder()
//!     .uri("/pets/7")
//!     .header("accept", "text/html;q=0.5, application/json")
//!     .body(Bytes::new())?;
//! let response = app.dispatch(request);
//!
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.headers()["content-type"], "application/json");
//! assert_eq!(app.url_for("pet", &[7])?, "/pets/7");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! http::Request
//!      │
//!      ├─ parse Content-Type / Accept
//!      ├─ Router::select ──── NotFound / MethodNotAllowed / 415 / 406
//!      ├─ negotiate response type
//!      └─ filters → route handler ──── HandlerError → error status
//!                        │
//!                 http::Response
//! ```
//!
//! ## Crates
//!
//! - [`router`]: media types, path patterns and route selection
//! - [`config`]: layered TOML/JSON configuration with route declarations
//! - [`telemetry`]: logging setup

#![doc(html_root_url = "https://docs.rs/daedalus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
pub mod bootstrap;
mod error;
pub mod handler;

pub use daedalus_config as config;
pub use daedalus_router as router;
pub use daedalus_telemetry as telemetry;

pub use app::{Application, ApplicationBuilder};
pub use bootstrap::HandlerRegistry;
pub use daedalus_config::{ConfigLoader, DaedalusConfig};
pub use daedalus_router::{MatchResult, MediaType, Params, Route, Router, RouterOptions};
pub use error::{DaedalusError, DaedalusResult, HandlerError, HandlerResult};
pub use handler::{BoxedHandler, Chain, Handler, Request, Response};

/// Prelude module for convenient imports.
///
/// ```rust
/// use daedalus::prelude::*;
/// ```
pub mod prelude {
    pub use crate::handler;
    pub use crate::{
        Application, ApplicationBuilder, BoxedHandler, Chain, DaedalusError, Handler, HandlerError,
        HandlerRegistry, HandlerResult, MediaType, Request, Response,
    };
}
