use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::{Error, Result};

/// An absolute `http` or `https` URL that a request can be sent to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Target {
    url: Url,
}

impl Target {
    /// Parses a target URL. Text without a scheme is taken to be an `https` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if the text is not a URL, uses a scheme other than
    /// `http` or `https`, or has no host.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();

        let parsed = if text.contains("://") {
            Url::parse(text)
        } else {
            Url::parse(&format!("https://{text}"))
        };

        let url = parsed.map_err(|error| invalid(text, error.to_string()))?;

        Self::from_url(url)
    }

    fn from_url(url: Url) -> Result<Self> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                url.as_str(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(url.as_str(), "no host"));
        }

        Ok(Self { url })
    }

    /// The host name.
    #[must_use]
    pub fn host(&self) -> &str {
        self.url
            .host_str()
            .expect("we reject URLs without a host at construction")
    }

    /// The port, explicit or the default for the scheme.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.url
            .port_or_known_default()
            .expect("http and https always have a default port")
    }

    /// Whether the target uses `https`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// The value for the `Host` request header: the host, plus the port if it is not the
    /// default for the scheme.
    #[must_use]
    pub fn host_header(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{port}", self.host()),
            None => self.host().to_owned(),
        }
    }

    /// The page part of the URL: the path and query.
    #[must_use]
    pub fn page(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_owned(),
        }
    }

    /// The same target with its scheme switched to `https` or `http`.
    #[must_use]
    pub fn with_scheme(&self, secure: bool) -> Self {
        let mut url = self.url.clone();

        // Switching between two special schemes cannot fail.
        _ = url.set_scheme(if secure { "https" } else { "http" });

        Self { url }
    }

    /// Resolves a `Location` header value against this target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if the location does not resolve to a usable target.
    pub fn join(&self, location: &str) -> Result<Self> {
        let url = self
            .url
            .join(location.trim())
            .map_err(|error| invalid(location, error.to_string()))?;

        Self::from_url(url)
    }

    /// The full URL as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Whether requests to `other` can go over a connection opened for this target.
    #[must_use]
    pub fn same_origin(&self, other: &Self) -> bool {
        self.host().eq_ignore_ascii_case(other.host())
            && self.port() == other.port()
            && self.is_secure() == other.is_secure()
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

fn invalid(url: &str, problem: impl Into<String>) -> Error {
    Error::InvalidTarget {
        url: url.to_owned(),
        problem: problem.into(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn bare_host_becomes_https() {
        let target = Target::parse("en.wikipedia.org/wiki/Rust").unwrap();

        assert!(target.is_secure());
        assert_eq!(target.host(), "en.wikipedia.org");
        assert_eq!(target.port(), 443);
        assert_eq!(target.page(), "/wiki/Rust");
        assert_eq!(target.host_header(), "en.wikipedia.org");
    }

    #[test]
    fn page_defaults_to_root_and_keeps_query() {
        assert_eq!(Target::parse("http://example.org").unwrap().page(), "/");
        assert_eq!(
            Target::parse("http://example.org/w/index.php?title=X")
                .unwrap()
                .page(),
            "/w/index.php?title=X"
        );
    }

    #[test]
    fn explicit_port_goes_into_host_header() {
        let target = Target::parse("http://localhost:8080/x").unwrap();

        assert_eq!(target.port(), 8080);
        assert_eq!(target.host_header(), "localhost:8080");
    }

    #[test]
    fn scheme_rewrite() {
        let target = Target::parse("https://en.wikipedia.org/wiki/Rust").unwrap();
        let plain = target.with_scheme(false);

        assert_eq!(plain.as_str(), "http://en.wikipedia.org/wiki/Rust");
        assert_eq!(plain.port(), 80);
        assert_eq!(plain.with_scheme(true), target);
    }

    #[test]
    fn join_relative_and_absolute_locations() {
        let target = Target::parse("https://en.wikipedia.org/wiki/Rust").unwrap();

        assert_eq!(
            target.join("/wiki/Rust_(language)").unwrap().as_str(),
            "https://en.wikipedia.org/wiki/Rust_(language)"
        );

        let moved = target.join("https://de.wikipedia.org/wiki/Rost").unwrap();
        assert_eq!(moved.host(), "de.wikipedia.org");
        assert!(!moved.same_origin(&target));
        assert!(target.join("/other").unwrap().same_origin(&target));
    }

    #[test]
    fn rejects_unusable_targets() {
        assert!(matches!(
            Target::parse("ftp://example.org/file"),
            Err(Error::InvalidTarget { .. })
        ));
        assert!(matches!(
            Target::parse("http://"),
            Err(Error::InvalidTarget { .. })
        ));
        assert!(matches!(
            Target::parse("https://example.org")
                .unwrap()
                .join("mailto:someone@example.org"),
            Err(Error::InvalidTarget { .. })
        ));
    }
}
