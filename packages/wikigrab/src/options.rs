use std::fmt;
use std::time::Duration;

/// The request method.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Verb {
    /// Fetch the document.
    #[default]
    Get,

    /// Fetch only the response head. No body is read and redirects are not followed.
    Head,
}

impl Verb {
    /// The method name as sent on the request line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default size of a single transport read, in bytes.
pub const DEFAULT_READ_BLOCK: usize = 256;

/// Default number of consecutive stalled reads tolerated before a read times out.
pub const DEFAULT_MAX_STALLS: usize = 64;

/// Default number of redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default limit on the size of a response head, in bytes.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8192;

/// Default time a single transport read waits for data.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(6);

/// Settings for an [`HttpClient`][crate::HttpClient].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use wikigrab::{ClientOptions, Verb};
///
/// let options = ClientOptions::builder()
///     .secure(false)
///     .max_redirects(3)
///     .read_timeout(Duration::from_secs(2))
///     .verb(Verb::Head)
///     .build();
///
/// assert!(!options.secure());
/// assert_eq!(options.max_redirects(), 3);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    secure: bool,
    follow_redirects: bool,
    max_redirects: usize,
    max_stalls: usize,
    read_block: usize,
    read_timeout: Duration,
    max_header_bytes: usize,
    verb: Verb,
    user_agent: String,
}

impl ClientOptions {
    /// Starts building a set of options from the defaults.
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Whether connections use TLS. Request targets are rewritten to the matching scheme.
    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Whether redirect responses are followed to the final response.
    #[must_use]
    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// How many redirects are followed before giving up with a redirect loop error.
    #[must_use]
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// How many consecutive stalled reads are tolerated before a read times out.
    #[must_use]
    pub fn max_stalls(&self) -> usize {
        self.max_stalls
    }

    /// How many bytes a single transport read asks for.
    #[must_use]
    pub fn read_block(&self) -> usize {
        self.read_block
    }

    /// How long a single transport read waits for data.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// The largest response head accepted, in bytes.
    #[must_use]
    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    /// The request method.
    #[must_use]
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// The `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            secure: cfg!(feature = "tls"),
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_stalls: DEFAULT_MAX_STALLS,
            read_block: DEFAULT_READ_BLOCK,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            verb: Verb::default(),
            user_agent: concat!("wikigrab/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// Builds [`ClientOptions`]. Created by [`ClientOptions::builder()`].
#[derive(Clone, Debug)]
#[must_use]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Sets whether connections use TLS.
    ///
    /// The default is to use TLS if the crate is built with the `tls` feature.
    pub fn secure(mut self, secure: bool) -> Self {
        self.options.secure = secure;
        self
    }

    /// Sets whether redirect responses are followed. The default is to follow them.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.options.follow_redirects = follow;
        self
    }

    /// Sets how many redirects are followed before giving up.
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.options.max_redirects = max_redirects;
        self
    }

    /// Sets how many consecutive stalled reads are tolerated before a read times out.
    pub fn max_stalls(mut self, max_stalls: usize) -> Self {
        self.options.max_stalls = max_stalls;
        self
    }

    /// Sets how many bytes a single transport read asks for.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is zero.
    pub fn read_block(mut self, bytes: usize) -> Self {
        assert!(bytes > 0, "read block size must be at least one byte");

        self.options.read_block = bytes;
        self
    }

    /// Sets how long a single transport read waits for data.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = timeout;
        self
    }

    /// Sets the largest response head accepted, in bytes.
    pub fn max_header_bytes(mut self, bytes: usize) -> Self {
        self.options.max_header_bytes = bytes;
        self
    }

    /// Sets the request method.
    pub fn verb(mut self, verb: Verb) -> Self {
        self.options.verb = verb;
        self
    }

    /// Sets the `User-Agent` header value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    /// Finishes building the options.
    #[must_use]
    pub fn build(self) -> ClientOptions {
        self.options
    }
}
