//! Matching a supported media type list against candidates.

use crate::error::{RouterError, RouterResult};
use crate::media_type::MediaType;

/// Finds mutually acceptable media types.
///
/// The supported list is either a route's `consumes`/`produces` declaration
/// or a parsed `Accept` header. It is kept in precedence order.
///
/// # Example
///
/// ```rust
/// use daedalus_router::{MediaType, MediaTypeMatcher};
///
/// let accept = MediaType::parse_list("text/html, application/*;q=0.5");
/// let matcher = MediaTypeMatcher::new(accept).unwrap();
///
/// let produced = [MediaType::json()];
/// assert_eq!(matcher.first(&produced).unwrap().name(), "application/*");
/// assert_eq!(matcher.negotiate(&produced).unwrap(), MediaType::json());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTypeMatcher {
    supported: Vec<MediaType>,
}

impl MediaTypeMatcher {
    /// Creates a matcher over a non-empty supported list.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidRouteArgument`] if `supported` is empty.
    pub fn new(supported: impl IntoIterator<Item = MediaType>) -> RouterResult<Self> {
        let mut supported: Vec<MediaType> = supported.into_iter().collect();
        if supported.is_empty() {
            return Err(RouterError::invalid_argument(
                "media type matcher needs at least one supported type",
            ));
        }
        MediaType::sort(&mut supported);
        Ok(Self { supported })
    }

    /// The supported types, most preferred first.
    #[must_use]
    pub fn supported(&self) -> &[MediaType] {
        &self.supported
    }

    /// Returns true if any supported type is compatible with `candidate`.
    #[must_use]
    pub fn matches(&self, candidate: &MediaType) -> bool {
        self.supported
            .iter()
            .any(|supported| supported.is_compatible(candidate))
    }

    /// Returns the supported entry matching the earliest candidate.
    ///
    /// Candidates are tried in the order given; for each one the supported
    /// list is scanned in precedence order.
    #[must_use]
    pub fn first(&self, candidates: &[MediaType]) -> Option<&MediaType> {
        candidates.iter().find_map(|candidate| {
            self.supported
                .iter()
                .find(|supported| supported.is_compatible(candidate))
        })
    }

    /// Like [`first`](Self::first), but returns the more specific side of the
    /// matching pair, so a concrete type wins over a wildcard.
    #[must_use]
    pub fn negotiate(&self, candidates: &[MediaType]) -> Option<MediaType> {
        candidates.iter().find_map(|candidate| {
            self.supported
                .iter()
                .find(|supported| supported.is_compatible(candidate))
                .map(|supported| {
                    if supported.is_wildcard() && !candidate.is_wildcard() {
                        candidate.without_quality()
                    } else {
                        supported.clone()
                    }
                })
        })
    }

    /// Restricts the supported set to entries compatible with `allowed`.
    ///
    /// Used to intersect a route's `produces` with the set of types the
    /// application can actually render. The result may be empty, in which
    /// case nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidRouteArgument`] if `allowed` is empty.
    pub fn filter(&self, allowed: &[MediaType]) -> RouterResult<Self> {
        if allowed.is_empty() {
            return Err(RouterError::invalid_argument(
                "media type filter needs at least one allowed type",
            ));
        }
        Ok(self.retain(|supported| allowed.iter().any(|a| a.is_compatible(supported))))
    }

    /// Restricts the supported set with an arbitrary predicate.
    #[must_use]
    pub fn retain(&self, predicate: impl Fn(&MediaType) -> bool) -> Self {
        Self {
            supported: self
                .supported
                .iter()
                .filter(|supported| predicate(supported))
                .cloned()
                .collect(),
        }
    }
}
