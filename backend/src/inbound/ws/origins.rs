//! Origin allow-list for WebSocket upgrades.

use std::fmt;
use std::str::FromStr;

use url::{Origin, Url};

/// Error raised when an allow-list entry is not an absolute HTTP(S) origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOrigin(String);

impl fmt::Display for InvalidOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not an http(s) origin", self.0)
    }
}

impl std::error::Error for InvalidOrigin {}

/// Origins allowed to open trip feed sockets.
///
/// Entries are compared as RFC 6454 tuples (scheme, host, port), so
/// `https://trips.example` also matches `https://trips.example:443`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins(Vec<Origin>);

impl AllowedOrigins {
    /// Parse a list of origins.
    pub fn new<I, S>(entries: I) -> Result<Self, InvalidOrigin>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        entries
            .into_iter()
            .map(|entry| parse_entry(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Return `true` when `origin` matches an entry.
    #[must_use]
    pub fn allows(&self, origin: &Url) -> bool {
        let origin = origin.origin();
        self.0.iter().any(|allowed| allowed == &origin)
    }
}

impl FromStr for AllowedOrigins {
    type Err = InvalidOrigin;

    /// Parse a comma-separated list; blank entries are skipped.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value.split(',').map(str::trim).filter(|e| !e.is_empty()))
    }
}

fn parse_entry(entry: &str) -> Result<Origin, InvalidOrigin> {
    let url = Url::parse(entry).map_err(|_| InvalidOrigin(entry.to_owned()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(InvalidOrigin(entry.to_owned()));
    }
    Ok(url.origin())
}
