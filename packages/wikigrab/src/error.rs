use std::io;

use slot_pool::PoolError;
use thiserror::Error;

/// Errors that can occur while fetching and processing a document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A record pool could not grow to hold another header, cookie or fragment.
    ///
    /// This is fatal for the in-flight request.
    #[error("record storage exhausted")]
    AllocationExhausted(#[from] PoolError),

    /// The response violated HTTP/1.1 framing: an unterminated or colon-less header line, an
    /// oversized header block, a bad chunk size or a body with no usable length.
    #[error("malformed response: {problem}")]
    ProtocolMalformed {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// Reads kept returning no data until the stall budget ran out.
    #[error("no data after {stalls} consecutive stalled reads")]
    Timeout {
        /// The number of consecutive reads that made no progress.
        stalls: usize,
    },

    /// The socket or TLS session failed.
    #[error("transport failure")]
    Transport(#[from] io::Error),

    /// Following redirects did not reach a final response.
    ///
    /// Either a redirect pointed back at the URL that produced it, or the redirect limit was
    /// reached.
    #[error("redirect loop detected at '{url}'")]
    RedirectLoop {
        /// The URL at which following stopped.
        url: String,
    },

    /// A redirect response had no `Location` header.
    #[error("{status} redirect without a Location header")]
    MissingLocation {
        /// The redirect status code.
        status: u16,
    },

    /// A URL could not be used as a request target.
    #[error("invalid target '{url}': {problem}")]
    InvalidTarget {
        /// The URL as given.
        url: String,

        /// A human-readable description of the problem.
        problem: String,
    },
}

impl Error {
    pub(crate) fn malformed(problem: impl Into<String>) -> Self {
        Self::ProtocolMalformed {
            problem: problem.into(),
        }
    }

    /// Whether the connection must be closed and reopened before another request is sent.
    #[must_use]
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
    }
}

/// A specialized `Result` type for fetch operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
