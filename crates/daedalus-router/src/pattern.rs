//! Path pattern compilation, matching and reverse generation.
//!
//! A pattern is split on `/` and every non-empty segment is classified:
//!
//! | Segment | Kind | Matches |
//! |---|---|---|
//! | `users` | literal | exactly `users` |
//! | `*` | single wildcard | any one segment |
//! | `**` | multi wildcard | zero or more remaining segments (last only) |
//! | `:id`, `{id}` | variable | any one segment, captured as `id` |
//! | `{id:[0-9]+}` | constrained variable | one segment matching the regex |
//! | `t?st`, `*.html`, `c{type}` | glob | one segment, via an anchored regex |
//!
//! Empty segments are ignored on both sides, so `/users/` and `/users`
//! are the same path.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use regex::Regex;

use crate::error::{RouterError, RouterResult};
use crate::params::Params;

/// One compiled segment of a pattern.
#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Wildcard,
    CatchAll,
    Variable(String),
    Glob(Glob),
}

impl Segment {
    fn rank(&self) -> usize {
        match self {
            Self::Literal(_) => 3,
            Self::Glob(_) => 2,
            Self::Variable(_) | Self::Wildcard => 1,
            Self::CatchAll => 0,
        }
    }
}

/// A segment mixing text, `*`, `?` and variables.
#[derive(Debug, Clone)]
struct Glob {
    regex: Regex,
    tokens: Vec<Token>,
    /// `(variable name, regex group name)` in declaration order.
    groups: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Star,
    Question,
    Var { name: String, regex: Option<String> },
}

/// The result of matching a path against a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Captured variables, in pattern order.
    pub params: Params,
    /// Static specificity of the pattern that matched.
    pub specificity: usize,
}

/// A compiled route path pattern.
///
/// Patterns are compiled once at registration and are immutable afterwards.
///
/// # Example
///
/// ```rust
/// use daedalus_router::PathPattern;
///
/// let pattern = PathPattern::parse("/{type}/{id}").unwrap();
/// assert!(pattern.is_glob());
///
/// let matched = pattern.matches("/cat/1").unwrap();
/// assert_eq!(matched.params.get("type"), Some("cat"));
///
/// assert_eq!(pattern.reverse(&["dog", "2"]).unwrap(), "/dog/2");
/// ```
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
    specificity: usize,
    ignore_case: bool,
}

impl PathPattern {
    /// Compiles a case-sensitive pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] if `**` is not the last
    /// segment, a variable name is empty or repeated, braces are unbalanced,
    /// or a variable regex does not compile.
    pub fn parse(pattern: &str) -> RouterResult<Self> {
        Self::compile(pattern, false)
    }

    /// Compiles a pattern, optionally matching literal text case-insensitively.
    pub fn compile(pattern: &str, ignore_case: bool) -> RouterResult<Self> {
        let raw = normalize(pattern);
        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();

        let mut segments = Vec::with_capacity(parts.len());
        let mut variables: Vec<String> = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            let segment = match *part {
                "**" if index + 1 == parts.len() => Segment::CatchAll,
                "**" => {
                    return Err(RouterError::invalid_pattern(
                        &raw,
                        "`**` must be the last segment",
                    ))
                }
                "*" => Segment::Wildcard,
                _ => {
                    if let Some(name) = part.strip_prefix(':') {
                        let name = name.trim();
                        validate_name(&raw, name)?;
                        Segment::Variable(name.to_string())
                    } else {
                        classify(&raw, tokenize(&raw, part)?, ignore_case)?
                    }
                }
            };

            match &segment {
                Segment::Variable(name) => declare(&raw, &mut variables, name)?,
                Segment::Glob(glob) => {
                    for (name, _) in &glob.groups {
                        declare(&raw, &mut variables, name)?;
                    }
                }
                _ => {}
            }
            segments.push(segment);
        }

        let specificity = segments.iter().map(Segment::rank).sum();
        Ok(Self {
            raw,
            segments,
            variables,
            specificity,
            ignore_case,
        })
    }

    /// The normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Variable names in declaration order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// True if any segment is not a plain literal.
    #[must_use]
    pub fn is_glob(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| !matches!(segment, Segment::Literal(_)))
    }

    /// A static score, higher for patterns with more literal text.
    ///
    /// Reported with every match for diagnostics; route selection itself is
    /// decided by registration order.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.specificity
    }

    /// Matches a request path, capturing variables.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let mut actual = path.split('/').filter(|s| !s.is_empty());
        let mut params = Params::new();

        for segment in &self.segments {
            if matches!(segment, Segment::CatchAll) {
                return Some(self.matched(params));
            }
            let value = actual.next()?;
            match segment {
                Segment::Literal(text) => {
                    let same = if self.ignore_case {
                        text.eq_ignore_ascii_case(value)
                    } else {
                        text == value
                    };
                    if !same {
                        return None;
                    }
                }
                Segment::Wildcard | Segment::CatchAll => {}
                Segment::Variable(name) => params.push(name.as_str(), value),
                Segment::Glob(glob) => {
                    let captures = glob.regex.captures(value)?;
                    for (name, group) in &glob.groups {
                        let captured = captures.name(group).map_or("", |m| m.as_str());
                        params.push(name.as_str(), captured);
                    }
                }
            }
        }

        if actual.next().is_some() {
            return None;
        }
        Some(self.matched(params))
    }

    fn matched(&self, params: Params) -> PathMatch {
        PathMatch {
            params,
            specificity: self.specificity,
        }
    }

    /// Builds a concrete path from positional values.
    ///
    /// Values fill variables strictly in declaration order. Literal and
    /// wildcard text is copied as written.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ReverseArgumentMismatch`] unless exactly one
    /// value per variable is supplied.
    pub fn reverse<V: fmt::Display>(&self, values: &[V]) -> RouterResult<String> {
        if values.len() != self.variables.len() {
            return Err(RouterError::reverse_mismatch(
                &self.raw,
                format!(
                    "expected {} value(s), got {}",
                    self.variables.len(),
                    values.len()
                ),
            ));
        }
        let mut values = values.iter().map(ToString::to_string);
        self.render(|_| values.next())
    }

    /// Builds a concrete path from values keyed by variable name.
    ///
    /// Keys that are not variables of this pattern are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ReverseArgumentMismatch`] if a variable has no
    /// value in `values`.
    pub fn reverse_named<K, V, S>(&self, values: &HashMap<K, V, S>) -> RouterResult<String>
    where
        K: Borrow<str> + Eq + Hash,
        V: fmt::Display,
        S: BuildHasher,
    {
        self.render(|name| values.get(name).map(ToString::to_string))
    }

    fn render(&self, mut value_of: impl FnMut(&str) -> Option<String>) -> RouterResult<String> {
        let mut lookup = |name: &str| {
            value_of(name).ok_or_else(|| {
                RouterError::reverse_mismatch(&self.raw, format!("missing value for `{name}`"))
            })
        };

        let mut path = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Wildcard => path.push('*'),
                Segment::CatchAll => path.push_str("**"),
                Segment::Variable(name) => path.push_str(&lookup(name)?),
                Segment::Glob(glob) => {
                    for token in &glob.tokens {
                        match token {
                            Token::Text(text) => path.push_str(text),
                            Token::Star => path.push('*'),
                            Token::Question => path.push('?'),
                            Token::Var { name, .. } => path.push_str(&lookup(name)?),
                        }
                    }
                }
            }
        }

        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn normalize(pattern: &str) -> String {
    let trimmed = pattern.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn validate_name(pattern: &str, name: &str) -> RouterResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RouterError::invalid_pattern(pattern, "empty variable name"));
    }
    if name.contains(['{', '}', '*', '?', ':']) {
        return Err(RouterError::invalid_pattern(
            pattern,
            format!("invalid variable name `{name}`"),
        ));
    }
    Ok(())
}

fn declare(pattern: &str, variables: &mut Vec<String>, name: &str) -> RouterResult<()> {
    if variables.iter().any(|existing| existing == name) {
        return Err(RouterError::invalid_pattern(
            pattern,
            format!("variable `{name}` declared twice"),
        ));
    }
    variables.push(name.to_string());
    Ok(())
}

fn tokenize(pattern: &str, segment: &str) -> RouterResult<Vec<Token>> {
    let chars: Vec<char> = segment.chars().collect();
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    let flush = |text: &mut String, tokens: &mut Vec<Token>| {
        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(text)));
        }
    };

    while i < chars.len() {
        match chars[i] {
            '*' => {
                flush(&mut text, &mut tokens);
                tokens.push(Token::Star);
            }
            '?' => {
                flush(&mut text, &mut tokens);
                tokens.push(Token::Question);
            }
            '{' => {
                let start = i + 1;
                let mut depth = 1;
                let mut end = start;
                while end < chars.len() {
                    match chars[end] {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    end += 1;
                }
                if depth != 0 {
                    return Err(RouterError::invalid_pattern(pattern, "unbalanced `{`"));
                }

                let inner: String = chars[start..end].iter().collect();
                let (name, regex) = match inner.split_once(':') {
                    Some((name, regex)) if regex.trim().is_empty() => {
                        return Err(RouterError::invalid_pattern(
                            pattern,
                            format!("empty regex for `{}`", name.trim()),
                        ))
                    }
                    Some((name, regex)) => (name.trim(), Some(regex.to_string())),
                    None => (inner.trim(), None),
                };
                validate_name(pattern, name)?;

                flush(&mut text, &mut tokens);
                tokens.push(Token::Var {
                    name: name.to_string(),
                    regex,
                });
                i = end;
            }
            '}' => return Err(RouterError::invalid_pattern(pattern, "unbalanced `}`")),
            c => text.push(c),
        }
        i += 1;
    }
    flush(&mut text, &mut tokens);
    Ok(tokens)
}

fn classify(pattern: &str, tokens: Vec<Token>, ignore_case: bool) -> RouterResult<Segment> {
    match tokens.as_slice() {
        [Token::Text(text)] => return Ok(Segment::Literal(text.clone())),
        [Token::Var { name, regex: None }] => return Ok(Segment::Variable(name.clone())),
        _ => {}
    }

    let mut source = String::from(if ignore_case { "(?i)^" } else { "^" });
    let mut groups = Vec::new();
    for token in &tokens {
        match token {
            Token::Text(text) => source.push_str(&regex::escape(text)),
            Token::Star => source.push_str("[^/]*"),
            Token::Question => source.push_str("[^/]"),
            Token::Var { name, regex } => {
                let group = format!("v{}", groups.len());
                let body = regex.as_deref().unwrap_or("[^/]+");
                source.push_str(&format!("(?P<{group}>(?:{body}))"));
                groups.push((name.clone(), group));
            }
        }
    }
    source.push('$');

    let regex = Regex::new(&source)
        .map_err(|e| RouterError::invalid_pattern(pattern, format!("bad segment regex: {e}")))?;
    Ok(Segment::Glob(Glob {
        regex,
        tokens,
        groups,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(text: &str) -> PathPattern {
        PathPattern::parse(text).unwrap()
    }

    fn capture(p: &PathPattern, path: &str) -> Vec<(String, String)> {
        p.matches(path)
            .unwrap()
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_literal_pattern() {
        let p = pattern("/users/me");
        assert!(!p.is_glob());
        assert!(p.matches("/users/me").is_some());
        assert!(p.matches("/users/me/").is_some());
        assert!(p.matches("/users").is_none());
        assert!(p.matches("/users/me/too").is_none());
        assert!(p.matches("/users/ME").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let p = pattern("/");
        assert!(p.matches("/").is_some());
        assert!(p.matches("").is_some());
        assert!(p.matches("/x").is_none());
    }

    #[test]
    fn test_pattern_without_leading_slash() {
        assert_eq!(pattern("users/:id").as_str(), "/users/:id");
    }

    #[test]
    fn test_colon_variables() {
        let p = pattern("/:type/:id");
        assert!(p.is_glob());
        assert_eq!(p.variables(), &["type".to_string(), "id".to_string()]);
        assert_eq!(
            capture(&p, "/cat/1"),
            vec![
                ("type".to_string(), "cat".to_string()),
                ("id".to_string(), "1".to_string())
            ]
        );
        assert!(p.matches("/cat").is_none());
        assert!(p.matches("/cat/1/2").is_none());
    }

    #[test]
    fn test_brace_variables() {
        let p = pattern("/orgs/{org}/users/{user}");
        let params = p.matches("/orgs/acme/users/42").unwrap().params;
        assert_eq!(params.get("org"), Some("acme"));
        assert_eq!(params.get("user"), Some("42"));
    }

    #[test]
    fn test_variable_names_are_trimmed() {
        for raw in ["/pets/: id", "/pets/{ id }"] {
            let compiled = PathPattern::parse(raw).unwrap();
            assert_eq!(compiled.variables(), ["id"]);
            let params = compiled.matches("/pets/7").unwrap().params;
            assert_eq!(params.get("id"), Some("7"));
        }
    }

    #[test]
    fn test_single_wildcard() {
        let p = pattern("/users/*");
        assert!(p.matches("/users/1").is_some());
        assert!(p.matches("/users").is_none());
        assert!(p.matches("/users/1/2").is_none());
    }

    #[test]
    fn test_multi_wildcard() {
        let p = pattern("/public/**");
        assert!(p.matches("/public/a/b/c").is_some());
        assert!(p.matches("/public/a").is_some());
        assert!(p.matches("/public").is_some());
        assert!(p.matches("/private/a").is_none());
    }

    #[test]
    fn test_multi_wildcard_must_be_last() {
        let err = PathPattern::parse("/a/**/b").unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern { .. }));
    }

    #[test]
    fn test_question_glob() {
        let p = pattern("/t?st");
        assert!(p.is_glob());
        assert!(p.matches("/test").is_some());
        assert!(p.matches("/tast").is_some());
        assert!(p.matches("/toast").is_none());
        assert!(p.matches("/tst").is_none());
    }

    #[test]
    fn test_star_glob_stays_in_segment() {
        let p = pattern("/assets/*.css");
        assert!(p.matches("/assets/site.css").is_some());
        assert!(p.matches("/assets/site.js").is_none());
        assert!(p.matches("/assets/css/site.css").is_none());
    }

    #[test]
    fn test_glob_escapes_regex_text() {
        let p = pattern("/v1.0/*");
        assert!(p.matches("/v1.0/x").is_some());
        let g = pattern("/v1.?");
        assert!(g.matches("/v1.2").is_some());
        assert!(g.matches("/v1x2").is_none());
    }

    #[test]
    fn test_mixed_segment_variable() {
        let p = pattern("/c{type}/{id}");
        let params = p.matches("/cat/1").unwrap().params;
        assert_eq!(params.get("type"), Some("at"));
        assert_eq!(params.get("id"), Some("1"));

        let file = pattern("/files/{name}.json");
        assert_eq!(file.matches("/files/report.json").unwrap().params.get("name"), Some("report"));
        assert!(file.matches("/files/report.xml").is_none());
    }

    #[test]
    fn test_regex_variable() {
        let p = pattern("/items/{id:[0-9]+}");
        assert_eq!(p.matches("/items/123").unwrap().params.get("id"), Some("123"));
        assert!(p.matches("/items/abc").is_none());

        let nested = pattern("/codes/{code:[A-Z]{3}}");
        assert!(nested.matches("/codes/ABC").is_some());
        assert!(nested.matches("/codes/ABCD").is_none());
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        assert!(PathPattern::parse("/{id}/{id}").is_err());
        assert!(PathPattern::parse("/:id/x{id}").is_err());
    }

    #[test]
    fn test_bad_variables_rejected() {
        for bad in ["/{}", "/:", "/{id", "/id}", "/{id:}", "/{a:[}"] {
            assert!(PathPattern::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_ignore_case() {
        let p = PathPattern::compile("/Users/*.HTML", true).unwrap();
        assert!(p.matches("/users/INDEX.html").is_some());
        assert!(pattern("/Users").matches("/users").is_none());
    }

    #[test]
    fn test_specificity() {
        assert!(pattern("/users/me").specificity() > pattern("/users/:id").specificity());
        assert!(pattern("/users/:id").specificity() > pattern("/users/**").specificity());
        let matched = pattern("/users/me").matches("/users/me").unwrap();
        assert_eq!(matched.specificity, 6);
    }

    #[test]
    fn test_reverse_named() {
        let p = pattern("/{type}/{id}");
        let values = HashMap::from([("type", "cat".to_string()), ("id", 5.to_string())]);
        assert_eq!(p.reverse_named(&values).unwrap(), "/cat/5");

        let mixed = pattern("/c{type}/{id}");
        let values = HashMap::from([("type", "at".to_string()), ("id", 1.to_string())]);
        assert_eq!(mixed.reverse_named(&values).unwrap(), "/cat/1");
    }

    #[test]
    fn test_reverse_positional() {
        let p = pattern("/:type/:id/cat.html");
        assert_eq!(p.reverse(&["cat", "1"]).unwrap(), "/cat/1/cat.html");
        assert_eq!(pattern("/static/*.css").reverse::<&str>(&[]).unwrap(), "/static/*.css");
        assert_eq!(pattern("/").reverse::<&str>(&[]).unwrap(), "/");
    }

    #[test]
    fn test_reverse_arity_mismatch() {
        let p = pattern("/{type}/{id}");
        let err = p.reverse(&["cat"]).unwrap_err();
        assert!(matches!(err, RouterError::ReverseArgumentMismatch { .. }));
        assert!(p.reverse(&["a", "b", "c"]).is_err());
    }

    #[test]
    fn test_reverse_missing_name() {
        let p = pattern("/{type}/{id}");
        let values = HashMap::from([("type", "cat")]);
        let err = p.reverse_named(&values).unwrap_err();
        assert!(err.to_string().contains("`id`"));
    }
}
