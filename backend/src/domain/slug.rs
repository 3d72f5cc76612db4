//! Human-readable trip slugs.
//!
//! Slugs are trimmed, non-empty identifiers composed of lowercase ASCII
//! letters, digits, and hyphens. They appear in share links, so a slug that
//! fails validation can never match a stored trip.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors raised by [`TripSlug::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugValidationError {
    Empty,
    InvalidCharacters,
}

impl fmt::Display for SlugValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "trip slug must not be empty"),
            Self::InvalidCharacters => write!(
                f,
                "trip slug may only contain lowercase letters, digits, and hyphens"
            ),
        }
    }
}

impl std::error::Error for SlugValidationError {}

/// Globally unique, human-readable trip handle (e.g. `lisbon-long-weekend`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TripSlug(String);

impl TripSlug {
    /// Validate and construct a slug.
    ///
    /// # Examples
    /// ```
    /// use tripboard::domain::TripSlug;
    ///
    /// assert!(TripSlug::new("porto-2025").is_ok());
    /// assert!(TripSlug::new("Porto 2025").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, SlugValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(SlugValidationError::Empty);
        }
        if !is_valid_slug(&value) {
            return Err(SlugValidationError::InvalidCharacters);
        }
        Ok(Self(value))
    }

    /// Borrow the raw slug.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TripSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<TripSlug> for String {
    fn from(value: TripSlug) -> Self {
        value.0
    }
}

impl TryFrom<String> for TripSlug {
    type Error = SlugValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Return `true` when `value` is a valid slug.
fn is_valid_slug(value: &str) -> bool {
    is_trimmed_non_empty(value) && has_allowed_slug_chars(value)
}

fn is_trimmed_non_empty(value: &str) -> bool {
    !value.is_empty() && value.trim() == value
}

fn has_allowed_slug_chars(value: &str) -> bool {
    value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}
