//! Handlers, filters and the dispatch chain.
//!
//! Every piece of request processing implements one trait, [`Handler`].
//! A route's handler sits at the end of a [`Chain`]; application filters
//! are handlers too, placed in front of it, and decide whether to continue
//! by calling [`Chain::proceed`].
//!
//! ```text
//! dispatch → filter 1 → filter 2 → … → route handler
//!               │           │
//!               └ may stop  └ may stop
//! ```
//!
//! Closures are adapted with [`from_fn`], [`with_request`] and [`constant`],
//! depending on how much of the exchange they need to see.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use daedalus_router::{AttrValue, MediaType, Params, Route};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};

use crate::error::{HandlerError, HandlerResult};

/// A shared, type-erased handler as stored in the route table.
pub type BoxedHandler = Arc<dyn Handler>;

/// Processes a request.
///
/// Implementations write into `response` and either finish or hand the
/// exchange to the rest of `chain`. The chain is consumed on use, so it can
/// be continued at most once.
///
/// # Example
///
/// ```rust
/// use daedalus::{Chain, Handler, HandlerResult, Request, Response};
///
/// struct Hello;
///
/// impl Handler for Hello {
///     fn invoke(&self, _: &Request<'_>, response: &mut Response, _: Chain<'_>) -> HandlerResult {
///         response.set_body("hello");
///         Ok(())
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles the exchange.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the request cannot be served; the
    /// dispatcher answers with the error's status.
    fn invoke(&self, request: &Request<'_>, response: &mut Response, chain: Chain<'_>) -> HandlerResult;
}

/// The rest of the processing pipeline.
pub struct Chain<'a> {
    filters: &'a [BoxedHandler],
    terminal: Option<&'a dyn Handler>,
}

impl<'a> Chain<'a> {
    pub(crate) fn new(filters: &'a [BoxedHandler], terminal: &'a dyn Handler) -> Self {
        Self {
            filters,
            terminal: Some(terminal),
        }
    }

    /// A chain with nothing left to run.
    #[must_use]
    pub fn end() -> Self {
        Self {
            filters: &[],
            terminal: None,
        }
    }

    /// Returns true if proceeding would do nothing.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.filters.is_empty() && self.terminal.is_none()
    }

    /// Runs the next filter, or the route handler once filters are exhausted.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised downstream.
    pub fn proceed(self, request: &Request<'_>, response: &mut Response) -> HandlerResult {
        if let Some((first, rest)) = self.filters.split_first() {
            let next = Chain {
                filters: rest,
                terminal: self.terminal,
            };
            return first.invoke(request, response, next);
        }
        match self.terminal {
            Some(handler) => handler.invoke(request, response, Chain::end()),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("filters", &self.filters.len())
            .field("terminal", &self.terminal.is_some())
            .finish()
    }
}

/// An incoming request bound to the route that was selected for it.
pub struct Request<'r> {
    inner: http::Request<Bytes>,
    route: &'r Route<BoxedHandler>,
    params: Params,
    content_type: Option<MediaType>,
    accept: Vec<MediaType>,
}

impl<'r> Request<'r> {
    pub(crate) fn new(
        inner: http::Request<Bytes>,
        route: &'r Route<BoxedHandler>,
        params: Params,
        content_type: Option<MediaType>,
        accept: Vec<MediaType>,
    ) -> Self {
        Self {
            inner,
            route,
            params,
            content_type,
            accept,
        }
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// The request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// The request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// A header value, if present and valid visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// The request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// A captured path variable.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// All captured path variables.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The selected route.
    #[must_use]
    pub fn route(&self) -> &'r Route<BoxedHandler> {
        self.route
    }

    /// An attribute of the selected route.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&'r AttrValue> {
        self.route.attribute(key)
    }

    /// The parsed `Content-Type`, if the request carried one.
    #[must_use]
    pub fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// The parsed `Accept` list, in precedence order.
    #[must_use]
    pub fn accept(&self) -> &[MediaType] {
        &self.accept
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", self.method())
            .field("uri", self.uri())
            .field("route", &self.route.to_string())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// The response being produced.
///
/// The dispatcher pre-sets the negotiated media type; handlers may replace
/// it. An explicit `Content-Type` header always wins over the media type.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    media_type: Option<MediaType>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// An empty `200 OK` response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            media_type: None,
        }
    }

    /// The status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the response body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// The media type the body will be labelled with.
    #[must_use]
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// Sets the media type the body will be labelled with.
    pub fn set_media_type(&mut self, media_type: MediaType) -> &mut Self {
        self.media_type = Some(media_type);
        self
    }

    /// Converts into an `http` response.
    #[must_use]
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut headers = self.headers;
        if let Some(media_type) = &self.media_type {
            if !headers.contains_key(CONTENT_TYPE) {
                if let Ok(value) = HeaderValue::from_str(&media_type.to_string()) {
                    headers.insert(CONTENT_TYPE, value);
                }
            }
        }

        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

/// Adapter for closures taking the full `(request, response, chain)` triple.
pub struct FnHandler<F> {
    func: F,
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Request<'_>, &mut Response, Chain<'_>) -> HandlerResult + Send + Sync + 'static,
{
    fn invoke(&self, request: &Request<'_>, response: &mut Response, chain: Chain<'_>) -> HandlerResult {
        (self.func)(request, response, chain)
    }
}

/// Adapter for closures that read the request and return a body.
pub struct RequestHandler<F, B> {
    func: F,
    _body: PhantomData<fn() -> B>,
}

impl<F, B> Handler for RequestHandler<F, B>
where
    F: Fn(&Request<'_>) -> Result<B, HandlerError> + Send + Sync + 'static,
    B: Into<Bytes> + 'static,
{
    fn invoke(&self, request: &Request<'_>, response: &mut Response, _chain: Chain<'_>) -> HandlerResult {
        let body = (self.func)(request)?;
        response.set_body(body);
        Ok(())
    }
}

/// Adapter for closures that ignore the request entirely.
pub struct ConstantHandler<F, B> {
    func: F,
    _body: PhantomData<fn() -> B>,
}

impl<F, B> Handler for ConstantHandler<F, B>
where
    F: Fn() -> B + Send + Sync + 'static,
    B: Into<Bytes> + 'static,
{
    fn invoke(&self, _request: &Request<'_>, response: &mut Response, _chain: Chain<'_>) -> HandlerResult {
        response.set_body((self.func)());
        Ok(())
    }
}

/// Wraps a closure with the full handler signature.
///
/// ```rust
/// use daedalus::handler;
///
/// let audit = handler::from_fn(|request, response, chain| {
///     tracing::info!(path = request.path(), "audit");
///     chain.proceed(request, response)
/// });
/// # let _ = audit;
/// ```
pub fn from_fn<F>(func: F) -> BoxedHandler
where
    F: Fn(&Request<'_>, &mut Response, Chain<'_>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(FnHandler { func })
}

/// Wraps a closure that computes the body from the request.
///
/// ```rust
/// use daedalus::handler;
///
/// let pet = handler::with_request(|request| {
///     Ok(format!("pet {}", request.param("id").unwrap_or_default()))
/// });
/// # let _ = pet;
/// ```
pub fn with_request<F, B>(func: F) -> BoxedHandler
where
    F: Fn(&Request<'_>) -> Result<B, HandlerError> + Send + Sync + 'static,
    B: Into<Bytes> + 'static,
{
    Arc::new(RequestHandler {
        func,
        _body: PhantomData,
    })
}

/// Wraps a closure that produces the body on its own.
pub fn constant<F, B>(func: F) -> BoxedHandler
where
    F: Fn() -> B + Send + Sync + 'static,
    B: Into<Bytes> + 'static,
{
    Arc::new(ConstantHandler {
        func,
        _body: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_router::{MatchResult, Router};
    use std::sync::Mutex;

    fn with_request_for<T>(handler: BoxedHandler, path: &str, f: impl FnOnce(Request<'_>) -> T) -> T {
        let mut builder = Router::builder();
        builder.get("/pets/{id}", handler).attr("role", "reader");
        let router = builder.build().unwrap();

        let accept = MediaType::parse_list("*/*");
        let MatchResult::Matched(found) = router.select("GET", path, None, &accept) else {
            panic!("route should match");
        };
        let inner = http::Request::builder().uri(path).body(Bytes::new()).unwrap();
        f(Request::new(inner, found.route, found.params, None, accept))
    }

    #[test]
    fn test_request_accessors() {
        with_request_for(constant(|| "x"), "/pets/7", |request| {
            assert_eq!(request.path(), "/pets/7");
            assert_eq!(request.param("id"), Some("7"));
            assert_eq!(request.method(), Method::GET);
            assert_eq!(request.attribute("role").and_then(AttrValue::as_str), Some("reader"));
            assert!(request.content_type().is_none());
            assert_eq!(request.accept(), &[MediaType::all()]);
        });
    }

    #[test]
    fn test_chain_runs_filters_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tag = |name: &'static str| {
            let seen = Arc::clone(&seen);
            from_fn(move |request, response, chain| {
                seen.lock().unwrap().push(name);
                chain.proceed(request, response)
            })
        };
        let filters = vec![tag("first"), tag("second")];
        let terminal = tag("handler");

        with_request_for(constant(|| ""), "/pets/1", |request| {
            let mut response = Response::new();
            Chain::new(&filters, terminal.as_ref())
                .proceed(&request, &mut response)
                .unwrap();
        });
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "handler"]);
    }

    #[test]
    fn test_filter_can_stop_the_chain() {
        let stop = from_fn(|_, response, _| {
            response.set_status(StatusCode::FORBIDDEN);
            Ok(())
        });
        let filters = vec![stop];
        let terminal = constant(|| "unreachable");

        let response = with_request_for(constant(|| ""), "/pets/1", |request| {
            let mut response = Response::new();
            Chain::new(&filters, terminal.as_ref())
                .proceed(&request, &mut response)
                .unwrap();
            response
        });
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_with_request_sets_body_and_propagates_errors() {
        let echo = with_request(|request| match request.param("id") {
            Some("0") => Err(HandlerError::bad_request("zero")),
            Some(id) => Ok(format!("pet {id}")),
            None => Ok(String::new()),
        });

        let body = with_request_for(constant(|| ""), "/pets/5", |request| {
            let mut response = Response::new();
            echo.invoke(&request, &mut response, Chain::end()).unwrap();
            response.body().clone()
        });
        assert_eq!(body, Bytes::from("pet 5"));

        let err = with_request_for(constant(|| ""), "/pets/0", |request| {
            echo.invoke(&request, &mut Response::new(), Chain::end()).unwrap_err()
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_end_chain_is_noop() {
        let chain = Chain::end();
        assert!(chain.is_end());
        with_request_for(constant(|| ""), "/pets/1", |request| {
            let mut response = Response::new();
            Chain::end().proceed(&request, &mut response).unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        });
    }

    #[test]
    fn test_into_http_sets_content_type() {
        let mut response = Response::new();
        response.set_body("{}").set_media_type(MediaType::json());
        let http = response.into_http();
        assert_eq!(http.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(http.body(), &Bytes::from("{}"));
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let mut response = Response::new();
        response.set_media_type(MediaType::json());
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
        assert_eq!(response.into_http().headers()[CONTENT_TYPE], "text/csv");
    }
}
