use foldhash::{HashMap, HashMapExt};

/// What the redirect cache knows about a URL.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution<'a> {
    /// No redirect from this URL has been seen.
    NotCached,

    /// A request to this URL was redirected to the given URL before.
    Redirect(&'a str),

    /// A request to this URL was redirected back to itself. Resending it cannot succeed.
    DoNotResend,
}

/// Remembers where URLs redirected to, so a repeated visit skips the round trip.
#[derive(Debug, Default)]
pub struct RedirectCache {
    // None marks a URL that redirected to itself.
    targets: HashMap<String, Option<String>>,
}

impl RedirectCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
        }
    }

    /// Records that a request to `from` was redirected to `to`.
    pub fn record(&mut self, from: &str, to: &str) {
        let target = (from != to).then(|| to.to_owned());
        self.targets.insert(from.to_owned(), target);
    }

    /// Looks up where a request to `url` would end up.
    ///
    /// Redirects recorded in a chain are followed to the last known URL. A chain that leads
    /// back to a URL already visited resolves to [`Resolution::DoNotResend`].
    #[must_use]
    pub fn resolve(&self, url: &str) -> Resolution<'_> {
        let mut current = match self.targets.get(url) {
            None => return Resolution::NotCached,
            Some(None) => return Resolution::DoNotResend,
            Some(Some(target)) => target.as_str(),
        };

        // Each hop visits a distinct key, so a chain longer than the cache has a cycle.
        for _ in 0..self.targets.len() {
            match self.targets.get(current) {
                None => return Resolution::Redirect(current),
                Some(None) => return Resolution::DoNotResend,
                Some(Some(next)) if next == url => return Resolution::DoNotResend,
                Some(Some(next)) => current = next.as_str(),
            }
        }

        Resolution::DoNotResend
    }

    /// The number of recorded redirects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no redirects are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn unknown_url_is_not_cached() {
        assert_eq!(
            RedirectCache::new().resolve("http://a/"),
            Resolution::NotCached
        );
    }

    #[test]
    fn repeated_lookups_resolve_to_the_same_target() {
        let mut cache = RedirectCache::new();
        cache.record("http://a/", "https://a/");

        assert_eq!(cache.resolve("http://a/"), Resolution::Redirect("https://a/"));
        assert_eq!(cache.resolve("http://a/"), Resolution::Redirect("https://a/"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn self_redirect_is_do_not_resend() {
        let mut cache = RedirectCache::new();
        cache.record("http://a/", "http://a/");

        assert_eq!(cache.resolve("http://a/"), Resolution::DoNotResend);
    }

    #[test]
    fn chains_resolve_to_the_end() {
        let mut cache = RedirectCache::new();
        cache.record("http://a/", "http://b/");
        cache.record("http://b/", "http://c/");

        assert_eq!(cache.resolve("http://a/"), Resolution::Redirect("http://c/"));
    }

    #[test]
    fn cycles_are_do_not_resend() {
        let mut cache = RedirectCache::new();
        cache.record("http://a/", "http://b/");
        cache.record("http://b/", "http://c/");
        cache.record("http://c/", "http://b/");

        assert_eq!(cache.resolve("http://a/"), Resolution::DoNotResend);
        assert_eq!(cache.resolve("http://b/"), Resolution::DoNotResend);
    }
}
