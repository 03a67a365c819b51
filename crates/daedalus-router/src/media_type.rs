//! Media types and their precedence rules.
//!
//! A [`MediaType`] is an immutable `type/subtype` pair plus ordered
//! parameters. It is parsed once (per header token or per route declaration)
//! and then shared freely between threads.
//!
//! # Precedence
//!
//! Lists of media types are ordered most-preferred first by
//! [`MediaType::cmp_precedence`]:
//!
//! 1. specificity class: `type/subtype` > `type/*+suffix` > `type/*` > `*/*`
//! 2. quality (`q`, default `1`), descending
//! 3. number of non-`q` parameters, descending
//!
//! Ties keep their original order.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::error::{RouterError, RouterResult};

const WILDCARD: &str = "*";
const QUALITY: &str = "q";
const CHARSET: &str = "charset";

/// A parsed `type/subtype[;key=value]*` value.
///
/// # Example
///
/// ```rust
/// use daedalus_router::MediaType;
///
/// let json = MediaType::parse("application/json; charset=UTF-8").unwrap();
/// assert_eq!(json.name(), "application/json");
/// assert_eq!(json.charset(), Some("UTF-8"));
/// assert!(MediaType::all().matches(&json));
/// ```
#[derive(Debug, Clone)]
pub struct MediaType {
    kind: String,
    subtype: String,
    params: IndexMap<String, String>,
    name: String,
}

impl MediaType {
    /// `*/*`
    #[must_use]
    pub fn all() -> Self {
        Self::from_static(WILDCARD, WILDCARD)
    }

    /// `application/json`
    #[must_use]
    pub fn json() -> Self {
        Self::from_static("application", "json")
    }

    /// `application/xml`
    #[must_use]
    pub fn xml() -> Self {
        Self::from_static("application", "xml")
    }

    /// `text/html`
    #[must_use]
    pub fn html() -> Self {
        Self::from_static("text", "html")
    }

    /// `text/plain`
    #[must_use]
    pub fn text() -> Self {
        Self::from_static("text", "plain")
    }

    /// `application/octet-stream`
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::from_static("application", "octet-stream")
    }

    /// `application/x-www-form-urlencoded`
    #[must_use]
    pub fn form() -> Self {
        Self::from_static("application", "x-www-form-urlencoded")
    }

    /// `multipart/form-data`
    #[must_use]
    pub fn multipart() -> Self {
        Self::from_static("multipart", "form-data")
    }

    // Callers guarantee both parts are valid lower-case tokens.
    fn from_static(kind: &str, subtype: &str) -> Self {
        Self {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            params: IndexMap::new(),
            name: format!("{kind}/{subtype}"),
        }
    }

    /// Creates a media type from its two parts, validating both.
    pub fn new(kind: &str, subtype: &str) -> RouterResult<Self> {
        Self::parse(&format!("{kind}/{subtype}"))
    }

    /// Parses a single media type.
    ///
    /// Type and subtype are lower-cased. Parameter keys are lower-cased and
    /// values trimmed; a parameter without `=value` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MalformedMediaType`] when the type or subtype is
    /// empty or contains invalid characters, when there is not exactly one
    /// `/`, for `*/subtype`, or when `q` is not a number in `0..=1`.
    pub fn parse(text: &str) -> RouterResult<Self> {
        let text = text.trim();
        let (essence, raw_params) = match text.split_once(';') {
            Some((essence, params)) => (essence, params),
            None => (text, ""),
        };

        let Some((kind, subtype)) = essence.split_once('/') else {
            return Err(RouterError::malformed(text, "missing `/`"));
        };
        if subtype.contains('/') {
            return Err(RouterError::malformed(text, "more than one `/`"));
        }

        let kind = kind.trim().to_ascii_lowercase();
        let subtype = subtype.trim().to_ascii_lowercase();
        validate_token(text, &kind, "type")?;
        validate_token(text, &subtype, "subtype")?;

        if kind.contains('*') && kind != WILDCARD {
            return Err(RouterError::malformed(text, "a wildcard type must be exactly `*`"));
        }
        if kind == WILDCARD && subtype != WILDCARD {
            return Err(RouterError::malformed(
                text,
                "a wildcard type requires a wildcard subtype",
            ));
        }
        if subtype[1..].contains('*') {
            return Err(RouterError::malformed(
                text,
                "`*` is only allowed at the start of a subtype",
            ));
        }

        let mut params = IndexMap::new();
        for raw in raw_params.split(';') {
            let Some((key, value)) = raw.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                continue;
            }
            params.insert(key, unquote(value.trim()).to_string());
        }

        let name = format!("{kind}/{subtype}");
        Ok(Self {
            kind,
            subtype,
            params,
            name,
        })
    }

    /// Parses a comma separated `Accept`-style header.
    ///
    /// Malformed entries are dropped. A header with no usable entry yields
    /// `[*/*]`. The result is sorted by precedence.
    ///
    /// ```rust
    /// use daedalus_router::MediaType;
    ///
    /// let accept = MediaType::parse_list("*/*;q=0.8, text/html, bogus");
    /// assert_eq!(accept[0].name(), "text/html");
    /// assert_eq!(accept[1].name(), "*/*");
    /// assert_eq!(MediaType::parse_list(""), vec![MediaType::all()]);
    /// ```
    #[must_use]
    pub fn parse_list(header: &str) -> Vec<Self> {
        let mut types: Vec<Self> = header
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter_map(|token| match Self::parse(token) {
                Ok(media_type) => Some(media_type),
                Err(err) => {
                    tracing::debug!(token, error = %err, "dropping malformed media type");
                    None
                }
            })
            .collect();

        if types.is_empty() {
            return vec![Self::all()];
        }
        Self::sort(&mut types);
        types
    }

    /// Resolves either a full media type or a shorthand such as `json`.
    ///
    /// Shorthands go through the extension table, so `html` becomes
    /// `text/html`. A lone `*` is `*/*`.
    pub fn resolve(text: &str) -> RouterResult<Self> {
        let text = text.trim();
        if text.contains('/') {
            return Self::parse(text);
        }
        if text == WILDCARD {
            return Ok(Self::all());
        }
        Self::by_extension(text)
            .ok_or_else(|| RouterError::malformed(text, "unknown media type shorthand"))
    }

    /// Looks up the media type for a file extension (with or without the dot).
    #[must_use]
    pub fn by_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        let (kind, subtype) = match ext.as_str() {
            // Text
            "html" | "htm" => ("text", "html"),
            "css" => ("text", "css"),
            "txt" | "text" => ("text", "plain"),
            "csv" => ("text", "csv"),
            "md" => ("text", "markdown"),
            "js" | "mjs" => ("application", "javascript"),
            "json" | "map" => ("application", "json"),
            "xml" => ("application", "xml"),
            "yaml" | "yml" => ("application", "yaml"),
            "toml" => ("application", "toml"),

            // Images
            "png" => ("image", "png"),
            "jpg" | "jpeg" => ("image", "jpeg"),
            "gif" => ("image", "gif"),
            "svg" => ("image", "svg+xml"),
            "webp" => ("image", "webp"),
            "ico" => ("image", "x-icon"),

            // Fonts
            "woff" => ("font", "woff"),
            "woff2" => ("font", "woff2"),
            "ttf" => ("font", "ttf"),

            // Documents and archives
            "pdf" => ("application", "pdf"),
            "zip" => ("application", "zip"),
            "gz" | "gzip" => ("application", "gzip"),
            "tar" => ("application", "x-tar"),
            "bin" => ("application", "octet-stream"),

            // Media
            "mp3" => ("audio", "mpeg"),
            "wav" => ("audio", "wav"),
            "mp4" => ("video", "mp4"),
            "webm" => ("video", "webm"),

            "wasm" => ("application", "wasm"),
            "form" => ("application", "x-www-form-urlencoded"),
            "multipart" => ("multipart", "form-data"),
            _ => return None,
        };
        Some(Self::from_static(kind, subtype))
    }

    /// Looks up the media type for the extension of the last path segment.
    ///
    /// ```rust
    /// use daedalus_router::MediaType;
    ///
    /// assert_eq!(MediaType::by_path("/assets/app.js"), Some(MediaType::parse("application/javascript").unwrap()));
    /// assert_eq!(MediaType::by_path("/assets/README"), None);
    /// ```
    #[must_use]
    pub fn by_path(path: &str) -> Option<Self> {
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file.rsplit_once('.')?;
        Self::by_extension(ext)
    }

    /// Sorts media types most-preferred first. The sort is stable.
    pub fn sort(types: &mut [Self]) {
        types.sort_by(Self::cmp_precedence);
    }

    /// Compares by precedence; `Less` means `self` is preferred.
    #[must_use]
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        other
            .specificity()
            .cmp(&self.specificity())
            .then_with(|| other.quality().total_cmp(&self.quality()))
            .then_with(|| other.extra_param_count().cmp(&self.extra_param_count()))
    }

    fn specificity(&self) -> u8 {
        if self.kind == WILDCARD {
            0
        } else if self.subtype == WILDCARD {
            1
        } else if self.subtype.starts_with('*') {
            2
        } else {
            3
        }
    }

    fn extra_param_count(&self) -> usize {
        self.params.keys().filter(|key| *key != QUALITY).count()
    }

    /// Returns true if `self`, used as a pattern, covers `other`.
    ///
    /// `*/*` covers everything, `type/*` covers every subtype of `type`, and a
    /// subtype starting with `*` covers subtypes ending with the rest of it
    /// (`*+xml` covers `atom+xml`). Parameters are not compared.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        if self.kind == WILDCARD {
            return true;
        }
        if self.kind != other.kind {
            return false;
        }
        if self.subtype == WILDCARD || self.subtype == other.subtype {
            return true;
        }
        match self.subtype.strip_prefix('*') {
            Some(suffix) => other.subtype.ends_with(suffix),
            None => false,
        }
    }

    /// Returns true if either side covers the other.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.matches(other) || other.matches(self)
    }

    /// The top-level type (`application` in `application/json`).
    #[must_use]
    pub fn main_type(&self) -> &str {
        &self.kind
    }

    /// The subtype (`json` in `application/json`).
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// The canonical `type/subtype` name, without parameters.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a parameter value by (case-insensitive) key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    /// Iterates over parameters in declaration order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `charset` parameter, if any.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.param(CHARSET)
    }

    /// The `q` parameter, `1.0` when absent.
    #[must_use]
    pub fn quality(&self) -> f32 {
        self.params
            .get(QUALITY)
            .and_then(|q| parse_quality(q))
            .unwrap_or(1.0)
    }

    /// Returns a copy with one parameter added or replaced.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        let key = key.trim().to_ascii_lowercase();
        if !key.is_empty() {
            self.params.insert(key, value.into());
        }
        self
    }

    /// Returns a copy without the `q` parameter.
    #[must_use]
    pub fn without_quality(&self) -> Self {
        let mut copy = self.clone();
        copy.params.shift_remove(QUALITY);
        copy
    }

    /// True for `*/*` and `type/*` (including suffix wildcards).
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.kind == WILDCARD || self.subtype.starts_with('*')
    }

    /// True for `application/json` and any `+json` subtype.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.kind == "application" && (self.subtype == "json" || self.subtype.ends_with("+json"))
    }

    /// True if bodies of this type are textual.
    ///
    /// Covers `text/*`, JSON and XML flavours, and a fixed set of textual
    /// application subtypes. Everything else is binary.
    #[must_use]
    pub fn is_text(&self) -> bool {
        if self.kind == "text" {
            return true;
        }
        if self.kind != "application" {
            return false;
        }
        matches!(
            self.subtype.as_str(),
            "json"
                | "javascript"
                | "x-javascript"
                | "ecmascript"
                | "yaml"
                | "x-yaml"
                | "toml"
                | "graphql"
        ) || self.subtype.ends_with("xml")
            || self.subtype.ends_with("+json")
            || self.subtype.ends_with("+yaml")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.params {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for MediaType {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap equality ignores insertion order; an absent q equals q=1.
        self.kind == other.kind
            && self.subtype == other.subtype
            && self.quality().to_bits() == other.quality().to_bits()
            && self.extra_param_count() == other.extra_param_count()
            && self
                .params
                .iter()
                .filter(|(key, _)| *key != QUALITY)
                .all(|(key, value)| other.params.get(key) == Some(value))
    }
}

impl Eq for MediaType {}

impl Hash for MediaType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.subtype.hash(state);
        self.quality().to_bits().hash(state);
        let mut params: Vec<_> = self
            .params
            .iter()
            .filter(|(key, _)| *key != QUALITY)
            .collect();
        params.sort();
        params.hash(state);
    }
}

fn validate_token(text: &str, token: &str, what: &str) -> RouterResult<()> {
    if token.is_empty() {
        return Err(RouterError::malformed(text, format!("empty {what}")));
    }
    if let Some(c) = token.chars().find(|c| !is_token_char(*c)) {
        return Err(RouterError::malformed(
            text,
            format!("invalid character `{c}` in {what}"),
        ));
    }
    Ok(())
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$&.+-^_*".contains(c)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_quality(value: &str) -> Option<f32> {
    value
        .parse::<f32>()
        .ok()
        .filter(|q| q.is_finite() && (0.0..=1.0).contains(q))
}
