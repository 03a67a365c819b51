//! Route matching and content negotiation for Daedalus.
//!
//! Given a request's method, path, `Content-Type` and `Accept` list, this
//! crate decides which registered route runs and which media type its
//! response is serialised with.
//!
//! # Features
//!
//! - **Path patterns**: literals, `*`, `**`, `:name`, `{name}`,
//!   `{name:regex}` and glob segments such as `*.html` or `t?st`
//! - **Media types**: parsing, wildcard and suffix matching (`*+xml`),
//!   precedence ordering and lenient `Accept` header parsing
//! - **Deterministic selection**: first registered route wins, and misses
//!   report the most specific reason (404, 405, 415 or 406)
//! - **Reverse routing**: build concrete paths from patterns or route names
//!
//! # Example
//!
//! ```rust
//! use daedalus_router::{MatchResult, MediaType, Router};
//!
//! let mut builder = Router::builder();
//! builder.get("/pets/:id", "getPet").produces(["json", "html"]);
//! builder.post("/pets", "createPet").consumes(["json"]).name("createPet");
//! let router = builder.build().unwrap();
//!
//! let accept = MediaType::parse_list("text/html;q=0.9, application/json");
//! let found = router.select("GET", "/pets/7", None, &accept).into_match().unwrap();
//! assert_eq!(*found.route.handler(), "getPet");
//! assert_eq!(found.params.get("id"), Some("7"));
//! assert_eq!(
//!     router.choose_response_type(found.route, &accept),
//!     Some(MediaType::json())
//! );
//!
//! let xml = MediaType::parse("text/xml").unwrap();
//! assert!(matches!(
//!     router.select("POST", "/pets", Some(&xml), &accept),
//!     MatchResult::UnsupportedMediaType
//! ));
//! ```
//!
//! # Selection
//!
//! ```text
//!   for each route, in registration order:
//!     path (and excludes) ──no──▶ skip
//!     method ─────────────no──▶ remember 405
//!     consumes ───────────no──▶ remember 415
//!     produces ───────────no──▶ remember 406
//!     ──▶ matched
//!   none matched: report the furthest stage reached, or 404
//! ```

mod error;
mod matcher;
mod media_type;
mod params;
mod pattern;
mod route;
mod router;

pub use error::{RouterError, RouterResult};
pub use matcher::MediaTypeMatcher;
pub use media_type::MediaType;
pub use params::Params;
pub use pattern::{PathMatch, PathPattern};
pub use route::{AttrValue, IntoMediaType, Route, RouteBuilder, ANY_METHOD};
pub use router::{MatchResult, RouteMatch, Router, RouterBuilder, RouterOptions};
