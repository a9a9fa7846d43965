use std::fmt;

use slot_pool::{Handle, SlotPool};
use tracing::debug;

use crate::{CookieRecord, ResponseHeaders, Result, parse_http_date};

/// The cookies set by the most recent response that carried any `Set-Cookie` headers.
///
/// A response with `Set-Cookie` headers replaces the whole batch: every stored cookie goes back
/// to the pool and the new ones are acquired in its place. A response without any leaves the
/// stored cookies alone, so they keep being sent with later requests.
pub struct CookieJar {
    records: SlotPool<CookieRecord>,
    stored: Vec<Handle>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: SlotPool::new(),
            stored: Vec::new(),
        }
    }

    /// Replaces the stored cookies with those in the `Set-Cookie` headers of a response.
    ///
    /// Returns the number of cookies now stored. If the response has no `Set-Cookie` headers,
    /// nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationExhausted`][crate::Error::AllocationExhausted] if the record
    /// pool cannot grow. The jar is left empty in that case.
    pub fn replace_from(&mut self, headers: &ResponseHeaders) -> Result<usize> {
        let mut set_cookies = headers.get_all("set-cookie").peekable();

        if set_cookies.peek().is_none() {
            return Ok(self.stored.len());
        }

        self.clear();

        for line in set_cookies {
            let handle = self.records.acquire()?;
            parse_set_cookie(line, self.records.get_mut(handle));
            self.stored.push(handle);
        }

        debug!(count = self.stored.len(), "cookies replaced");

        Ok(self.stored.len())
    }

    /// The `name=value` pairs of the stored cookies that have not expired at `now` (Unix
    /// seconds), in the order they were received.
    pub fn active_pairs(&self, now: i64) -> impl Iterator<Item = &str> + '_ {
        self.iter()
            .filter(move |cookie| cookie.expires.is_none_or(|expires| expires > now))
            .map(|cookie| cookie.pair.as_str())
    }

    /// Every stored cookie, in the order they were received.
    pub fn iter(&self) -> impl Iterator<Item = &CookieRecord> + '_ {
        self.stored.iter().map(|handle| self.records.get(*handle))
    }

    /// The number of stored cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stored.len()
    }

    /// Whether no cookies are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Forgets every stored cookie.
    pub fn clear(&mut self) {
        self.stored.clear();
        self.records.release_all();
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CookieJar {
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    #[cfg_attr(coverage_nightly, coverage(off))] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Fills `cookie` from one `Set-Cookie` header value.
///
/// The first `;`-separated part is the `name=value` pair. Of the attributes, `expires`,
/// `domain` and `path` are kept and the rest are skipped.
fn parse_set_cookie(line: &str, cookie: &mut CookieRecord) {
    let mut parts = line.split(';').map(str::trim);

    if let Some(pair) = parts.next() {
        cookie.pair.push_str(pair);
    }

    for attribute in parts {
        let (key, value) = attribute.split_once('=').unwrap_or((attribute, ""));
        let value = value.trim();

        match key.trim().to_ascii_lowercase().as_str() {
            "expires" => cookie.expires = parse_http_date(value),
            "domain" => cookie.domain = Some(value.to_owned()),
            "path" => cookie.path = Some(value.to_owned()),
            _ => {}
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn headers_with(lines: &[(&str, &str)]) -> ResponseHeaders {
        let mut headers = ResponseHeaders::new();

        for (name, value) in lines {
            headers.put(name, value).unwrap();
        }

        headers
    }

    #[test]
    fn parses_attributes() {
        let mut jar = CookieJar::new();
        let headers = headers_with(&[(
            "Set-Cookie",
            "WMF-Last-Access=16-Oct-2026; Path=/; HttpOnly; secure; \
             Expires=Tue, 17 Nov 2026 12:00:00 GMT; Domain=.wikipedia.org",
        )]);

        assert_eq!(jar.replace_from(&headers).unwrap(), 1);

        let cookie = jar.iter().next().unwrap();
        assert_eq!(cookie.pair, "WMF-Last-Access=16-Oct-2026");
        assert_eq!(cookie.name(), "WMF-Last-Access");
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert_eq!(cookie.domain.as_deref(), Some(".wikipedia.org"));
        assert_eq!(cookie.expires, Some(1_794_916_800));
    }

    #[test]
    fn new_batch_replaces_old() {
        let mut jar = CookieJar::new();

        jar.replace_from(&headers_with(&[("Set-Cookie", "a=1"), ("Set-Cookie", "b=2")]))
            .unwrap();
        assert_eq!(jar.active_pairs(0).collect::<Vec<_>>(), ["a=1", "b=2"]);

        jar.replace_from(&headers_with(&[("Set-Cookie", "c=3")])).unwrap();
        assert_eq!(jar.active_pairs(0).collect::<Vec<_>>(), ["c=3"]);
    }

    #[test]
    fn response_without_cookies_keeps_batch() {
        let mut jar = CookieJar::new();

        jar.replace_from(&headers_with(&[("Set-Cookie", "a=1")])).unwrap();
        jar.replace_from(&headers_with(&[("Server", "mw")])).unwrap();

        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn expired_cookies_are_not_active() {
        let mut jar = CookieJar::new();

        jar.replace_from(&headers_with(&[
            ("Set-Cookie", "old=1; Expires=Thu, 01 Jan 1970 00:00:10 GMT"),
            ("Set-Cookie", "new=2"),
        ]))
        .unwrap();

        assert_eq!(jar.active_pairs(5).collect::<Vec<_>>(), ["old=1", "new=2"]);
        assert_eq!(jar.active_pairs(10).collect::<Vec<_>>(), ["new=2"]);
    }

    #[test]
    fn clear_releases_records() {
        let mut jar = CookieJar::new();
        jar.replace_from(&headers_with(&[("Set-Cookie", "a=1")])).unwrap();

        jar.clear();

        assert!(jar.is_empty());
        assert_eq!(jar.records.used_count(), 0);
    }
}
