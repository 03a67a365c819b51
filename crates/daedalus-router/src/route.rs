//! Route definitions and their registration builder.
//!
//! A [`Route`] ties an HTTP method and a [`PathPattern`] to a handler, plus
//! the media types it consumes and produces, an optional name, exclusion
//! patterns and a small attribute store. Routes are assembled through
//! [`RouteBuilder`] and become immutable once the router is built.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{RouterError, RouterResult};
use crate::matcher::MediaTypeMatcher;
use crate::media_type::MediaType;
use crate::pattern::{PathMatch, PathPattern};
use crate::router::RouterOptions;

/// Method value matching every request method.
pub const ANY_METHOD: &str = "*";

/// Conversion into a [`MediaType`] for the `consumes`/`produces` setters.
///
/// Strings are resolved with [`MediaType::resolve`], so both
/// `"application/json"` and the shorthand `"json"` are accepted.
pub trait IntoMediaType {
    /// Performs the conversion.
    fn into_media_type(self) -> RouterResult<MediaType>;
}

impl IntoMediaType for MediaType {
    fn into_media_type(self) -> RouterResult<MediaType> {
        Ok(self)
    }
}

impl IntoMediaType for &MediaType {
    fn into_media_type(self) -> RouterResult<MediaType> {
        Ok(self.clone())
    }
}

impl IntoMediaType for &str {
    fn into_media_type(self) -> RouterResult<MediaType> {
        MediaType::resolve(self)
    }
}

impl IntoMediaType for String {
    fn into_media_type(self) -> RouterResult<MediaType> {
        MediaType::resolve(&self)
    }
}

impl IntoMediaType for &String {
    fn into_media_type(self) -> RouterResult<MediaType> {
        MediaType::resolve(self)
    }
}

/// A route attribute value.
///
/// Only scalars (string, number, boolean, enum constant, type name) and
/// homogeneous arrays of one scalar kind may be stored.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A string.
    Str(String),
    /// An integer.
    Int(i64),
    /// A finite floating point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// An enum constant, recorded as its type and variant names.
    Enum {
        /// The enum type name.
        type_name: String,
        /// The variant name.
        variant: String,
    },
    /// A type reference.
    Type(&'static str),
    /// An array of scalars of one kind.
    Array(Vec<AttrValue>),
}

impl AttrValue {
    /// Creates an enum constant value.
    #[must_use]
    pub fn enumeration(type_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self::Enum {
            type_name: type_name.into(),
            variant: variant.into(),
        }
    }

    /// Creates a type reference value for `T`.
    #[must_use]
    pub fn type_of<T: ?Sized + 'static>() -> Self {
        Self::Type(std::any::type_name::<T>())
    }

    /// Creates an array value.
    #[must_use]
    pub fn array<T: Into<Self>>(values: impl IntoIterator<Item = T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }

    /// The kind name, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Enum { .. } => "enum",
            Self::Type(_) => "type",
            Self::Array(_) => "array",
        }
    }

    /// Checks the value is storable.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidRouteArgument`] for non-finite floats,
    /// nested arrays, and arrays mixing kinds.
    pub fn validate(&self) -> RouterResult<()> {
        match self {
            Self::Float(value) if !value.is_finite() => Err(RouterError::invalid_argument(
                "attribute floats must be finite",
            )),
            Self::Array(values) => {
                let mut kind = None;
                for value in values {
                    if matches!(value, Self::Array(_)) {
                        return Err(RouterError::invalid_argument(
                            "attribute arrays cannot be nested",
                        ));
                    }
                    value.validate()?;
                    match kind {
                        None => kind = Some(value.kind()),
                        Some(k) if k != value.kind() => {
                            return Err(RouterError::invalid_argument(format!(
                                "attribute array mixes {k} and {}",
                                value.kind()
                            )))
                        }
                        Some(_) => {}
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the number as a float, for integers and floats.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[AttrValue]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(values: Vec<T>) -> Self {
        Self::array(values)
    }
}

/// A registered route.
pub struct Route<H> {
    method: String,
    pattern: PathPattern,
    handler: H,
    consumes: MediaTypeMatcher,
    produces: MediaTypeMatcher,
    name: Option<String>,
    excludes: Vec<PathPattern>,
    attributes: IndexMap<String, AttrValue>,
}

impl<H> Route<H> {
    /// The upper-cased method, or `*` for any method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The compiled path pattern.
    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The handler registered for this route.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Accepted request body types, most specific first.
    #[must_use]
    pub fn consumes(&self) -> &[MediaType] {
        self.consumes.supported()
    }

    /// Producible response types, most specific first.
    #[must_use]
    pub fn produces(&self) -> &[MediaType] {
        self.produces.supported()
    }

    /// The route name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Exclusion patterns.
    #[must_use]
    pub fn excludes(&self) -> &[PathPattern] {
        &self.excludes
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A single attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// True if a request body of `content_type` is accepted.
    #[must_use]
    pub fn can_consume(&self, content_type: &MediaType) -> bool {
        self.consumes
            .supported()
            .iter()
            .any(|supported| supported.matches(content_type))
    }

    /// True if the route can produce something compatible with `media_type`.
    #[must_use]
    pub fn can_produce(&self, media_type: &MediaType) -> bool {
        self.produces.matches(media_type)
    }

    /// True if the route produces something the `accept` list allows.
    ///
    /// Entries with `q=0` are refusals and never match. An empty list
    /// accepts anything.
    #[must_use]
    pub fn is_acceptable(&self, accept: &[MediaType]) -> bool {
        accept.is_empty()
            || accept
                .iter()
                .filter(|candidate| candidate.quality() > 0.0)
                .any(|candidate| self.produces.matches(candidate))
    }

    /// The concrete response type for an `accept` list, if any.
    #[must_use]
    pub fn negotiate(&self, accept: &[MediaType]) -> Option<MediaType> {
        if accept.is_empty() {
            return self.produces.negotiate(&[MediaType::all()]);
        }
        let acceptable: Vec<MediaType> = accept
            .iter()
            .filter(|candidate| candidate.quality() > 0.0)
            .cloned()
            .collect();
        self.produces.negotiate(&acceptable)
    }

    /// True if the route handles `method` (case-insensitive).
    #[must_use]
    pub fn matches_method(&self, method: &str) -> bool {
        self.method == ANY_METHOD || self.method.eq_ignore_ascii_case(method)
    }

    /// Matches the path, honouring exclusions.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        let matched = self.pattern.matches(path)?;
        if self
            .excludes
            .iter()
            .any(|exclude| exclude.matches(path).is_some())
        {
            return None;
        }
        Some(matched)
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("name", &self.name)
            .field("consumes", &self.consumes())
            .field("produces", &self.produces())
            .finish_non_exhaustive()
    }
}

impl<H> fmt::Display for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.pattern)
    }
}

/// A route that has been declared but not yet compiled.
pub(crate) struct Draft<H> {
    method: String,
    pattern: String,
    handler: H,
    consumes: Option<Vec<MediaType>>,
    produces: Option<Vec<MediaType>>,
    name: Option<String>,
    excludes: Vec<String>,
    attributes: IndexMap<String, AttrValue>,
    errors: Vec<RouterError>,
}

impl<H> Draft<H> {
    pub(crate) fn new(method: &str, pattern: &str, handler: H) -> Self {
        Self {
            method: method.trim().to_string(),
            pattern: pattern.to_string(),
            handler,
            consumes: None,
            produces: None,
            name: None,
            excludes: Vec::new(),
            attributes: IndexMap::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Compiles the draft, reporting the first recorded problem.
    pub(crate) fn compile(self, options: &RouterOptions) -> RouterResult<Route<H>> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let method = normalize_method(&self.method)?;
        if self.pattern.trim().is_empty() {
            return Err(RouterError::invalid_argument("route pattern cannot be empty"));
        }
        let pattern = PathPattern::compile(&self.pattern, options.ignore_case)?;
        let excludes = self
            .excludes
            .iter()
            .map(|exclude| PathPattern::compile(exclude, options.ignore_case))
            .collect::<RouterResult<Vec<_>>>()?;

        let consumes = MediaTypeMatcher::new(self.consumes.unwrap_or_else(|| vec![MediaType::all()]))?;
        let produces = match self.produces {
            Some(produces) => MediaTypeMatcher::new(produces)?,
            None if options.default_produces.is_empty() => MediaTypeMatcher::new([MediaType::all()])?,
            None => MediaTypeMatcher::new(options.default_produces.iter().cloned())?,
        };

        Ok(Route {
            method,
            pattern,
            handler: self.handler,
            consumes,
            produces,
            name: self.name,
            excludes,
            attributes: self.attributes,
        })
    }
}

fn normalize_method(method: &str) -> RouterResult<String> {
    if method.is_empty() {
        return Err(RouterError::invalid_argument("route method cannot be empty"));
    }
    if method == ANY_METHOD {
        return Ok(ANY_METHOD.to_string());
    }
    let upper = method.to_ascii_uppercase();
    http::Method::from_bytes(upper.as_bytes())
        .map_err(|_| RouterError::invalid_argument(format!("invalid HTTP method `{method}`")))?;
    Ok(upper)
}

fn collect_media_types<I>(what: &str, types: I) -> RouterResult<Vec<MediaType>>
where
    I: IntoIterator,
    I::Item: IntoMediaType,
{
    let types = types
        .into_iter()
        .map(IntoMediaType::into_media_type)
        .collect::<RouterResult<Vec<_>>>()?;
    if types.is_empty() {
        return Err(RouterError::invalid_argument(format!(
            "{what} requires at least one media type"
        )));
    }
    Ok(types)
}

/// Chainable configuration for a route being registered.
///
/// Problems are recorded and reported when the router is built, so a broken
/// declaration aborts bootstrap instead of installing a half-configured route.
///
/// # Example
///
/// ```rust
/// use daedalus_router::Router;
///
/// let mut builder = Router::builder();
/// builder
///     .add_route("POST", "/pets", "createPet")
///     .consumes(["json"])
///     .produces(["json", "xml"])
///     .name("createPet")
///     .attr("role", "admin");
///
/// let router = builder.build().unwrap();
/// let route = router.route("createPet").unwrap();
/// assert_eq!(route.consumes()[0].name(), "application/json");
/// assert_eq!(route.attribute("role").and_then(|v| v.as_str()), Some("admin"));
/// ```
pub struct RouteBuilder<'a, H> {
    draft: &'a mut Draft<H>,
}

impl<'a, H> RouteBuilder<'a, H> {
    pub(crate) fn new(draft: &'a mut Draft<H>) -> Self {
        Self { draft }
    }

    /// Sets the accepted request body types, replacing the default `*/*`.
    pub fn consumes<I>(self, types: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoMediaType,
    {
        match collect_media_types("consumes", types) {
            Ok(types) => self.draft.consumes = Some(types),
            Err(err) => self.draft.errors.push(err),
        }
        self
    }

    /// Sets the producible response types, replacing the default `*/*`.
    pub fn produces<I>(self, types: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoMediaType,
    {
        match collect_media_types("produces", types) {
            Ok(types) => self.draft.produces = Some(types),
            Err(err) => self.draft.errors.push(err),
        }
        self
    }

    /// Names the route, for lookup and reverse routing.
    pub fn name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            self.draft
                .errors
                .push(RouterError::invalid_argument("route name cannot be empty"));
        } else {
            self.draft.name = Some(name);
        }
        self
    }

    /// Adds sub-path patterns the route must not match.
    pub fn excludes<I>(self, patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.draft.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Stores an attribute.
    pub fn attr(self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let key = key.into();
        let value = value.into();
        if key.trim().is_empty() {
            self.draft
                .errors
                .push(RouterError::invalid_argument("attribute key cannot be empty"));
        } else if let Err(err) = value.validate() {
            self.draft.errors.push(err);
        } else {
            self.draft.attributes.insert(key, value);
        }
        self
    }
}
