//! The application: a sealed route table plus filters, driven by `dispatch`.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use daedalus_router::{MatchResult, MediaType, RouteBuilder, Router, RouterBuilder, RouterOptions};
use daedalus_telemetry::fields;
use http::header::{ACCEPT, ALLOW, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::{debug, info, warn};

use crate::error::DaedalusResult;
use crate::handler::{BoxedHandler, Chain, Handler, Request, Response};

/// Collects routes and filters for an [`Application`].
///
/// # Example
///
/// ```rust
/// use daedalus::{handler, Application};
///
/// let mut builder = Application::builder();
/// builder
///     .get("/pets/{id}", handler::with_request(|req| Ok(format!("pet {}", req.param("id").unwrap_or("?")))))
///     .produces(["json"]);
/// let app = builder.build().unwrap();
/// assert_eq!(app.router().len(), 1);
/// ```
pub struct ApplicationBuilder {
    routes: RouterBuilder<BoxedHandler>,
    filters: Vec<BoxedHandler>,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Creates an empty builder with default router options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    /// Creates an empty builder with the given router options.
    #[must_use]
    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            routes: RouterBuilder::with_options(options),
            filters: Vec::new(),
        }
    }

    /// Registers a route. The returned builder refines its media types,
    /// name, excludes and attributes.
    pub fn route(&mut self, method: &str, pattern: &str, handler: BoxedHandler) -> RouteBuilder<'_, BoxedHandler> {
        self.routes.add_route(method, pattern, handler)
    }

    /// Registers a `GET` route.
    pub fn get(&mut self, pattern: &str, handler: BoxedHandler) -> RouteBuilder<'_, BoxedHandler> {
        self.route("GET", pattern, handler)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, pattern: &str, handler: BoxedHandler) -> RouteBuilder<'_, BoxedHandler> {
        self.route("POST", pattern, handler)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, pattern: &str, handler: BoxedHandler) -> RouteBuilder<'_, BoxedHandler> {
        self.route("PUT", pattern, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, pattern: &str, handler: BoxedHandler) -> RouteBuilder<'_, BoxedHandler> {
        self.route("DELETE", pattern, handler)
    }

    /// Appends a filter. Filters run in registration order before the
    /// route handler, and only for requests that selected a route.
    pub fn filter(&mut self, filter: impl Handler) -> &mut Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Appends an already shared filter.
    pub fn filter_boxed(&mut self, filter: BoxedHandler) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Seals the route table.
    ///
    /// # Errors
    ///
    /// Returns the first route registration error.
    pub fn build(self) -> DaedalusResult<Application> {
        let router = self.routes.build()?;
        info!(
            routes = router.len(),
            filters = self.filters.len(),
            "application built"
        );
        Ok(Application {
            router,
            filters: self.filters,
        })
    }
}

/// A built application.
///
/// `dispatch` takes `&self`, so one application serves any number of
/// threads once wrapped in an `Arc`.
pub struct Application {
    router: Router<BoxedHandler>,
    filters: Vec<BoxedHandler>,
}

impl Application {
    /// Starts a new application.
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// The sealed route table.
    #[must_use]
    pub fn router(&self) -> &Router<BoxedHandler> {
        &self.router
    }

    /// Builds the path of the route named `name`.
    ///
    /// # Errors
    ///
    /// Fails if no route has that name or the values do not fit its pattern.
    pub fn url_for<V: fmt::Display>(&self, name: &str, values: &[V]) -> DaedalusResult<String> {
        Ok(self.router.reverse(name, values)?)
    }

    /// Serves one request.
    ///
    /// Non-matching requests are answered with `404`, `405` (with `Allow`),
    /// `415` or `406`. A malformed `Content-Type` is treated as absent and
    /// malformed `Accept` entries are skipped. Handler errors become error
    /// responses with the error's status.
    pub fn dispatch(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        let method = request.method().as_str().to_string();
        let path = request.uri().path().to_string();

        let span = tracing::debug_span!("dispatch", "http.method" = %method, "http.path" = %path);
        let _guard = span.enter();

        let content_type = request_content_type(request.headers()).unwrap_or_else(|value| {
            debug!(content_type = %value, "ignoring malformed content type");
            None
        });
        let accept = request_accept(request.headers());

        let found = match self.router.select(&method, &path, content_type.as_ref(), &accept) {
            MatchResult::Matched(found) => found,
            MatchResult::NotFound => return status_response(StatusCode::NOT_FOUND),
            MatchResult::MethodNotAllowed { allowed } => {
                let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED);
                if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                    response.headers_mut().insert(ALLOW, value);
                }
                return response;
            }
            MatchResult::UnsupportedMediaType => {
                return status_response(StatusCode::UNSUPPORTED_MEDIA_TYPE)
            }
            MatchResult::NotAcceptable => return status_response(StatusCode::NOT_ACCEPTABLE),
        };

        let route = found.route;
        let mut response = Response::new();
        if let Some(media_type) = self
            .router
            .choose_response_type(route, &accept)
            .filter(|media_type| !media_type.is_wildcard())
        {
            debug!({ fields::RESPONSE_TYPE } = %media_type, "negotiated response type");
            response.set_media_type(media_type);
        }

        let request = Request::new(request, route, found.params, content_type, accept);
        let chain = Chain::new(&self.filters, route.handler().as_ref());

        match chain.proceed(&request, &mut response) {
            Ok(()) => {
                debug!({ fields::HTTP_STATUS } = response.status().as_u16(), "request served");
                response.into_http()
            }
            Err(err) => {
                warn!(
                    { fields::ROUTE_PATTERN } = %route.pattern(),
                    { fields::HTTP_STATUS } = err.status().as_u16(),
                    { fields::ERROR } = %err,
                    "handler failed"
                );
                status_response(err.status())
            }
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.router.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Parses `Content-Type`. `Err` carries the offending value.
fn request_content_type(headers: &HeaderMap) -> Result<Option<MediaType>, String> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(None);
    };
    let text = value
        .to_str()
        .map_err(|_| String::from_utf8_lossy(value.as_bytes()).into_owned())?;
    MediaType::parse(text).map(Some).map_err(|_| text.to_string())
}

/// Parses every `Accept` header into one precedence-ordered list.
/// No header at all means `*/*`.
fn request_accept(headers: &HeaderMap) -> Vec<MediaType> {
    let values: Vec<&str> = headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    if values.is_empty() {
        return vec![MediaType::all()];
    }
    MediaType::parse_list(&values.join(","))
}

fn status_response(status: StatusCode) -> http::Response<Bytes> {
    let mut response = http::Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}
