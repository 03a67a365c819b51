//! Route registration and per-request selection.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use crate::error::{RouterError, RouterResult};
use crate::media_type::MediaType;
use crate::params::Params;
use crate::route::{Draft, Route, RouteBuilder};

/// Options applied to every route when the router is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterOptions {
    /// Match literal and glob segments case-insensitively.
    pub ignore_case: bool,
    /// `produces` for routes that never call the setter. Empty means `*/*`.
    pub default_produces: Vec<MediaType>,
}

/// Collects route declarations during bootstrap.
///
/// Registration problems are deferred to [`build`](Self::build), which
/// fails on the first one.
pub struct RouterBuilder<H> {
    options: RouterOptions,
    drafts: Vec<Draft<H>>,
}

impl<H> Default for RouterBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouterBuilder<H> {
    /// Creates a builder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    /// Creates a builder with the given options.
    #[must_use]
    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            options,
            drafts: Vec::new(),
        }
    }

    /// Mutable access to the options, before any route is compiled.
    pub fn options_mut(&mut self) -> &mut RouterOptions {
        &mut self.options
    }

    /// Registers a route. Use `*` as the method to match any method.
    pub fn add_route(&mut self, method: &str, pattern: &str, handler: H) -> RouteBuilder<'_, H> {
        self.drafts.push(Draft::new(method, pattern, handler));
        let index = self.drafts.len() - 1;
        RouteBuilder::new(&mut self.drafts[index])
    }

    /// Registers a `GET` route.
    pub fn get(&mut self, pattern: &str, handler: H) -> RouteBuilder<'_, H> {
        self.add_route("GET", pattern, handler)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, pattern: &str, handler: H) -> RouteBuilder<'_, H> {
        self.add_route("POST", pattern, handler)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, pattern: &str, handler: H) -> RouteBuilder<'_, H> {
        self.add_route("PUT", pattern, handler)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&mut self, pattern: &str, handler: H) -> RouteBuilder<'_, H> {
        self.add_route("PATCH", pattern, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, pattern: &str, handler: H) -> RouteBuilder<'_, H> {
        self.add_route("DELETE", pattern, handler)
    }

    /// Number of routes declared so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    /// Returns true if no route has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Compiles every declaration and seals the router.
    ///
    /// # Errors
    ///
    /// Returns the first registration error: a malformed media type, an
    /// invalid method, pattern or attribute, or two routes sharing a name.
    pub fn build(self) -> RouterResult<Router<H>> {
        let mut names: HashMap<String, usize> = HashMap::new();
        for (index, draft) in self.drafts.iter().enumerate() {
            if let Some(name) = draft.name() {
                if names.insert(name.to_string(), index).is_some() {
                    return Err(RouterError::invalid_argument(format!(
                        "route name `{name}` is already registered"
                    )));
                }
            }
        }

        let routes = self
            .drafts
            .into_iter()
            .map(|draft| draft.compile(&self.options))
            .collect::<RouterResult<Vec<_>>>()?;

        tracing::info!(
            routes = routes.len(),
            ignore_case = self.options.ignore_case,
            "router sealed"
        );

        Ok(Router {
            routes,
            names,
            options: self.options,
        })
    }
}

/// A successful selection.
#[derive(Debug)]
pub struct RouteMatch<'r, H> {
    /// The selected route.
    pub route: &'r Route<H>,
    /// Captured path variables.
    pub params: Params,
    /// Structural specificity of the path match.
    pub specificity: usize,
}

/// Outcome of [`Router::select`].
///
/// The non-matched arms are ordinary results; the caller maps them to
/// 404, 405, 415 and 406 respectively.
#[derive(Debug)]
pub enum MatchResult<'r, H> {
    /// A route passed every filter.
    Matched(RouteMatch<'r, H>),
    /// No route matched the path.
    NotFound,
    /// Routes passed the path and media filters but not the method.
    MethodNotAllowed {
        /// Methods of those routes, in registration order.
        allowed: Vec<String>,
    },
    /// Routes matched method and path but not the request body type.
    UnsupportedMediaType,
    /// Routes matched everything except the `Accept` list.
    NotAcceptable,
}

impl<'r, H> MatchResult<'r, H> {
    /// Returns true for [`MatchResult::Matched`].
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// Converts into the match, if any.
    #[must_use]
    pub fn into_match(self) -> Option<RouteMatch<'r, H>> {
        match self {
            Self::Matched(found) => Some(found),
            _ => None,
        }
    }

    /// A short label for logs.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Matched(_) => "matched",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::NotAcceptable => "not_acceptable",
        }
    }
}

/// How far a non-matching route got. Later stages win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Method,
    Consumes,
    Produces,
}

/// An immutable, sealed route table.
///
/// Selection is a pure function of its inputs, so a `Router` can be shared
/// between threads behind an `Arc` without locking.
///
/// # Example
///
/// ```rust
/// use daedalus_router::{MatchResult, MediaType, Router};
///
/// let mut builder = Router::builder();
/// builder.get("/users/me", "me");
/// builder.get("/users/:id", "user");
/// let router = builder.build().unwrap();
///
/// let accept = MediaType::parse_list("*/*");
/// match router.select("GET", "/users/42", None, &accept) {
///     MatchResult::Matched(found) => {
///         assert_eq!(*found.route.handler(), "user");
///         assert_eq!(found.params.get("id"), Some("42"));
///     }
///     other => panic!("unexpected {}", other.outcome()),
/// }
/// ```
#[derive(Debug)]
pub struct Router<H> {
    routes: Vec<Route<H>>,
    names: HashMap<String, usize>,
    options: RouterOptions,
}

impl<H> Router<H> {
    /// Starts a new route table.
    #[must_use]
    pub fn builder() -> RouterBuilder<H> {
        RouterBuilder::new()
    }

    /// Selects the route for a request.
    ///
    /// Routes are tried in registration order and the first one passing the
    /// method, path, consumes and produces filters wins. When none does, the
    /// reported reason is the one from the route that got furthest.
    ///
    /// `accept` is expected in precedence order, as returned by
    /// [`MediaType::parse_list`]; an empty slice accepts anything.
    pub fn select(
        &self,
        method: &str,
        path: &str,
        content_type: Option<&MediaType>,
        accept: &[MediaType],
    ) -> MatchResult<'_, H> {
        let mut furthest: Option<Stage> = None;
        let mut allowed: Vec<String> = Vec::new();

        for route in &self.routes {
            let Some(found) = route.match_path(path) else {
                continue;
            };

            let consumable = content_type.map_or(true, |ct| route.can_consume(ct));
            let acceptable = route.is_acceptable(accept);

            let stage = if !route.matches_method(method) {
                // Only a route that would otherwise serve the request makes it a 405.
                if !(consumable && acceptable) {
                    continue;
                }
                if !allowed.iter().any(|m| m == route.method()) {
                    allowed.push(route.method().to_string());
                }
                Stage::Method
            } else if !consumable {
                Stage::Consumes
            } else if !acceptable {
                Stage::Produces
            } else {
                let result = MatchResult::Matched(RouteMatch {
                    route,
                    params: found.params,
                    specificity: found.specificity,
                });
                log_outcome(method, path, &result, Some(route));
                return result;
            };
            furthest = furthest.max(Some(stage));
        }

        let result = match furthest {
            None => MatchResult::NotFound,
            Some(Stage::Method) => MatchResult::MethodNotAllowed { allowed },
            Some(Stage::Consumes) => MatchResult::UnsupportedMediaType,
            Some(Stage::Produces) => MatchResult::NotAcceptable,
        };
        log_outcome(method, path, &result, None);
        result
    }

    /// Chooses the media type to serialise a response of `route` with.
    ///
    /// Returns `None` when nothing in `accept` is producible, which callers
    /// normally prevent by selecting through [`select`](Self::select) first.
    #[must_use]
    pub fn choose_response_type(&self, route: &Route<H>, accept: &[MediaType]) -> Option<MediaType> {
        route.negotiate(accept)
    }

    /// All routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    /// Looks a route up by name.
    #[must_use]
    pub fn route(&self, name: &str) -> Option<&Route<H>> {
        self.names.get(name).map(|&index| &self.routes[index])
    }

    /// Builds a path for the named route from positional values.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnknownRoute`] for an unknown name and
    /// [`RouterError::ReverseArgumentMismatch`] for a wrong value count.
    pub fn reverse<V: fmt::Display>(&self, name: &str, values: &[V]) -> RouterResult<String> {
        self.named(name)?.pattern().reverse(values)
    }

    /// Builds a path for the named route from a name to value map.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnknownRoute`] for an unknown name and
    /// [`RouterError::ReverseArgumentMismatch`] if a variable has no value.
    pub fn reverse_named<K, V, S>(&self, name: &str, values: &HashMap<K, V, S>) -> RouterResult<String>
    where
        K: Borrow<str> + Eq + Hash,
        V: fmt::Display,
        S: BuildHasher,
    {
        self.named(name)?.pattern().reverse_named(values)
    }

    /// The options the routes were compiled with.
    #[must_use]
    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if the router has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn named(&self, name: &str) -> RouterResult<&Route<H>> {
        self.route(name).ok_or_else(|| RouterError::UnknownRoute {
            name: name.to_string(),
        })
    }
}

fn log_outcome<H>(method: &str, path: &str, result: &MatchResult<'_, H>, route: Option<&Route<H>>) {
    match route {
        Some(route) => tracing::debug!(
            http.method = method,
            http.path = path,
            route.pattern = route.pattern().as_str(),
            route.name = route.name().unwrap_or("anonymous"),
            "match.outcome" = result.outcome(),
            "route selected"
        ),
        None => tracing::debug!(
            http.method = method,
            http.path = path,
            "match.outcome" = result.outcome(),
            "no route selected"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(header: &str) -> Vec<MediaType> {
        MediaType::parse_list(header)
    }

    fn handler_of(result: MatchResult<'_, &'static str>) -> &'static str {
        match result {
            MatchResult::Matched(found) => *found.route.handler(),
            other => panic!("expected a match, got {}", other.outcome()),
        }
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let mut builder = Router::builder();
        builder.get("/users/me", "me");
        builder.get("/users/:id", "user");
        let router = builder.build().unwrap();

        assert_eq!(handler_of(router.select("GET", "/users/me", None, &accept("*/*"))), "me");
        assert_eq!(handler_of(router.select("GET", "/users/7", None, &accept("*/*"))), "user");
    }

    #[test]
    fn test_params_and_specificity() {
        let mut builder = Router::builder();
        builder.get("/:type/:id", "pet");
        let router = builder.build().unwrap();

        let found = router.select("GET", "/cat/1", None, &[]).into_match().unwrap();
        assert_eq!(found.params.get("type"), Some("cat"));
        assert_eq!(found.params.get("id"), Some("1"));
        assert_eq!(found.specificity, 2);
    }

    #[test]
    fn test_not_found() {
        let mut builder = Router::builder();
        builder.get("/users", "users");
        let router = builder.build().unwrap();

        assert!(matches!(
            router.select("GET", "/posts", None, &[]),
            MatchResult::NotFound
        ));

        let empty: Router<&str> = Router::builder().build().unwrap();
        assert!(empty.is_empty());
        assert!(matches!(empty.select("GET", "/", None, &[]), MatchResult::NotFound));
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let mut builder = Router::builder();
        builder.get("/users", "list");
        builder.post("/users", "create");
        builder.get("/users", "duplicate");
        let router = builder.build().unwrap();

        match router.select("DELETE", "/users", None, &[]) {
            MatchResult::MethodNotAllowed { allowed } => assert_eq!(allowed, vec!["GET", "POST"]),
            other => panic!("unexpected {}", other.outcome()),
        }
    }

    #[test]
    fn test_wrong_method_failing_media_filters_is_skipped() {
        let mut builder = Router::builder();
        builder.get("/pets", "list").produces(["json"]);
        builder.put("/pets", "replace").consumes(["xml"]);
        let router = builder.build().unwrap();

        match router.select("POST", "/pets", None, &accept("text/xml")) {
            MatchResult::MethodNotAllowed { allowed } => assert_eq!(allowed, vec!["PUT"]),
            other => panic!("unexpected {}", other.outcome()),
        }

        let json = MediaType::json();
        match router.select("POST", "/pets", Some(&json), &accept("application/json")) {
            MatchResult::MethodNotAllowed { allowed } => assert_eq!(allowed, vec!["GET"]),
            other => panic!("unexpected {}", other.outcome()),
        }

        let mut builder = Router::builder();
        builder.get("/pets", "list").produces(["json"]);
        let router = builder.build().unwrap();
        assert!(matches!(
            router.select("POST", "/pets", None, &accept("text/xml")),
            MatchResult::NotFound
        ));
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let mut builder = Router::builder();
        builder.add_route("get", "/", "root");
        let router = builder.build().unwrap();
        assert_eq!(handler_of(router.select("GET", "/", None, &[])), "root");
        assert_eq!(handler_of(router.select("get", "/", None, &[])), "root");
    }

    #[test]
    fn test_any_method_route() {
        let mut builder = Router::builder();
        builder.add_route("*", "/**", "fallback");
        let router = builder.build().unwrap();
        assert_eq!(handler_of(router.select("OPTIONS", "/a/b", None, &[])), "fallback");
    }

    #[test]
    fn test_consumes_filter() {
        let mut builder = Router::builder();
        builder.post("/pets", "create").consumes(["json"]);
        let router = builder.build().unwrap();

        let xml = MediaType::parse("text/xml").unwrap();
        assert!(matches!(
            router.select("POST", "/pets", Some(&xml), &[]),
            MatchResult::UnsupportedMediaType
        ));
        let json = MediaType::json();
        assert_eq!(handler_of(router.select("POST", "/pets", Some(&json), &[])), "create");
        // No body type declared means the filter does not apply.
        assert_eq!(handler_of(router.select("POST", "/pets", None, &[])), "create");
    }

    #[test]
    fn test_produces_filter() {
        let mut builder = Router::builder();
        builder.get("/pets", "list").produces(["json", "html"]);
        let router = builder.build().unwrap();

        assert!(matches!(
            router.select("GET", "/pets", None, &accept("text/xml")),
            MatchResult::NotAcceptable
        ));
        assert_eq!(handler_of(router.select("GET", "/pets", None, &accept("text/*"))), "list");
        assert!(matches!(
            router.select("GET", "/pets", None, &accept("application/json;q=0, text/html;q=0")),
            MatchResult::NotAcceptable
        ));
    }

    #[test]
    fn test_later_route_rescues_media_failure() {
        let mut builder = Router::builder();
        builder.get("/pets", "json").produces(["json"]);
        builder.get("/pets", "html").produces(["html"]);
        let router = builder.build().unwrap();

        assert_eq!(handler_of(router.select("GET", "/pets", None, &accept("text/html"))), "html");
        assert_eq!(handler_of(router.select("GET", "/pets", None, &accept("*/*"))), "json");
    }

    #[test]
    fn test_furthest_failure_wins() {
        let mut builder = Router::builder();
        builder.post("/pets", "create").consumes(["json"]);
        builder.put("/pets", "replace").consumes(["json"]).produces(["json"]);
        let router = builder.build().unwrap();

        let json = MediaType::json();
        let xml = MediaType::parse("text/xml").unwrap();

        // Method mismatch everywhere.
        assert!(matches!(
            router.select("GET", "/pets", None, &[]),
            MatchResult::MethodNotAllowed { .. }
        ));
        // PUT passes the body filter but fails accept.
        assert!(matches!(
            router.select("PUT", "/pets", Some(&json), &accept("text/html")),
            MatchResult::NotAcceptable
        ));
        // POST fails the body filter, PUT fails the method.
        assert!(matches!(
            router.select("POST", "/pets", Some(&xml), &[]),
            MatchResult::UnsupportedMediaType
        ));
    }

    #[test]
    fn test_excluded_path_is_not_found() {
        let mut builder = Router::builder();
        builder.get("/api/**", "api").excludes(["/api/private/**"]);
        let router = builder.build().unwrap();

        assert!(router.select("GET", "/api/users", None, &[]).is_matched());
        assert!(matches!(
            router.select("GET", "/api/private/keys", None, &[]),
            MatchResult::NotFound
        ));
    }

    #[test]
    fn test_ignore_case_option() {
        let mut builder = RouterBuilder::with_options(RouterOptions {
            ignore_case: true,
            ..RouterOptions::default()
        });
        builder.get("/Users/me", "me");
        let router = builder.build().unwrap();
        assert!(router.options().ignore_case);
        assert_eq!(handler_of(router.select("GET", "/users/ME", None, &[])), "me");
    }

    #[test]
    fn test_default_produces_option() {
        let mut builder = RouterBuilder::with_options(RouterOptions {
            default_produces: vec![MediaType::json()],
            ..RouterOptions::default()
        });
        builder.get("/a", "a");
        builder.get("/b", "b").produces(["html"]);
        let router = builder.build().unwrap();

        assert_eq!(router.routes()[0].produces(), &[MediaType::json()]);
        assert_eq!(router.routes()[1].produces(), &[MediaType::html()]);
    }

    #[test]
    fn test_build_fails_on_first_error() {
        let mut builder = Router::builder();
        builder.get("/ok", "ok");
        builder.get("/bad", "bad").consumes(["*/json"]);
        builder.get("/a/**/b", "worse");
        assert!(matches!(
            builder.build().unwrap_err(),
            RouterError::MalformedMediaType { .. }
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut builder = Router::builder();
        builder.get("/a", "a").name("same");
        builder.get("/b", "b").name("same");
        assert!(matches!(
            builder.build().unwrap_err(),
            RouterError::InvalidRouteArgument { .. }
        ));
    }

    #[test]
    fn test_choose_response_type() {
        let mut builder = Router::builder();
        builder.get("/pets", "list").produces(["json", "html"]);
        builder.get("/any", "any");
        let router = builder.build().unwrap();
        let pets = &router.routes()[0];
        let any = &router.routes()[1];

        assert_eq!(router.choose_response_type(pets, &accept("*/*")), Some(MediaType::json()));
        assert_eq!(router.choose_response_type(pets, &accept("text/*")), Some(MediaType::html()));
        assert_eq!(
            router.choose_response_type(pets, &accept("text/html, application/json;q=0.5")),
            Some(MediaType::html())
        );
        assert_eq!(router.choose_response_type(pets, &accept("image/png")), None);
        assert_eq!(
            router.choose_response_type(any, &accept("text/plain")),
            Some(MediaType::text())
        );
    }

    #[test]
    fn test_reverse_by_name() {
        let mut builder = Router::builder();
        builder.get("/{type}/{id}", "pet").name("pet");
        let router = builder.build().unwrap();

        assert_eq!(router.reverse("pet", &["cat", "5"]).unwrap(), "/cat/5");
        let values = HashMap::from([("type", "dog"), ("id", "2")]);
        assert_eq!(router.reverse_named("pet", &values).unwrap(), "/dog/2");
        assert!(matches!(
            router.reverse::<&str>("missing", &[]).unwrap_err(),
            RouterError::UnknownRoute { .. }
        ));
        assert!(router.route("pet").is_some());
    }

    #[test]
    fn test_concurrent_selection() {
        let mut builder = Router::builder();
        for i in 0..32 {
            builder.get(&format!("/r{i}/:id"), i);
        }
        let router = builder.build().unwrap();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let router = &router;
                scope.spawn(move || {
                    for i in 0..32 {
                        let path = format!("/r{i}/{t}");
                        let found = router.select("GET", &path, None, &[]).into_match().unwrap();
                        assert_eq!(*found.route.handler(), i);
                        assert_eq!(found.params.get("id"), Some(t.to_string().as_str()));
                    }
                });
            }
        });
    }
}
