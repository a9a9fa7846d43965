use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use http::StatusCode;
use tracing::{debug, warn};

use crate::{
    ClientOptions, Connection, Connector, CookieJar, Error, RedirectCache, Resolution,
    ResponseHeaders, Result, Target, Verb, build_request, has_no_body, is_followable_redirect,
    parse_status_line,
};

/// A response whose head and body have been read completely.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    status: StatusCode,
    body: Vec<u8>,
    target: Target,
}

impl Response {
    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The decoded body. Empty for `HEAD` requests and statuses that never have a body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Takes the body out of the response.
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// The target the request was actually sent to, after scheme rewriting and redirect
    /// cache lookups.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }
}

/// A blocking HTTP/1.1 client that keeps one connection open across requests.
///
/// Each request goes through the same cycle: the request is written, the response head is read
/// in small blocks until the blank line that ends it, its headers are staged in the header
/// pool, and the body is read by `Content-Length` or decoded from chunked framing. Bytes read
/// past the end of one response are kept for the next.
///
/// The connection is reused while requests go to the same host, port and scheme. It is
/// reopened when a redirect moves to another origin, when a response says
/// `Connection: close`, and after any failure, since the position in the byte stream is then
/// unknown.
///
/// The headers of the most recent response stay available through
/// [`headers()`][Self::headers] until the next response is received.
#[derive(Debug)]
pub struct HttpClient<C: Connector> {
    connector: C,
    options: ClientOptions,

    connection: Option<Connection>,

    headers: ResponseHeaders,
    cookies: CookieJar,
    redirects: RedirectCache,

    // The target and head of the request in flight or most recently sent.
    current: Option<Target>,
    last_request: String,
}

impl<C: Connector> HttpClient<C> {
    /// Creates a client that opens its connections through `connector`.
    #[must_use]
    pub fn new(connector: C, options: ClientOptions) -> Self {
        Self {
            connector,
            options,
            connection: None,
            headers: ResponseHeaders::new(),
            cookies: CookieJar::new(),
            redirects: RedirectCache::new(),
            current: None,
            last_request: String::new(),
        }
    }

    /// The options the client was created with.
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The headers of the most recently received response.
    #[must_use]
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// The cookies that are sent with every request.
    #[must_use]
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// The redirects seen so far.
    #[must_use]
    pub fn redirects(&self) -> &RedirectCache {
        &self.redirects
    }

    /// The head of the most recently sent request.
    #[must_use]
    pub fn last_request_header(&self) -> &str {
        &self.last_request
    }

    /// Whether a connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Sends a request for `target`.
    ///
    /// The scheme of the target is first rewritten to match the TLS setting. If the redirect
    /// cache knows the target redirects elsewhere, the request goes straight to the cached
    /// destination. The connection is reopened if it is for a different origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RedirectLoop`] if the cache says the target redirects to itself and
    /// [`Error::Transport`] if the connection cannot be opened or written to.
    pub fn send_request(&mut self, target: &Target) -> Result<()> {
        let secure = self.options.secure();
        let mut target = target.with_scheme(secure);

        if self.options.follow_redirects() {
            match self.redirects.resolve(target.as_str()) {
                Resolution::NotCached => {}
                Resolution::Redirect(cached) => {
                    debug!(from = target.as_str(), to = cached, "redirect cache hit");
                    target = Target::parse(cached)?.with_scheme(secure);
                }
                Resolution::DoNotResend => {
                    return Err(Error::RedirectLoop {
                        url: target.as_str().to_owned(),
                    });
                }
            }
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX));

        let request = build_request(
            self.options.verb(),
            &target,
            self.options.user_agent(),
            self.cookies.active_pairs(now),
        );

        debug!(verb = %self.options.verb(), target = target.as_str(), "sending request");

        let connection = self.ensure_connection(&target)?;

        if let Err(error) = connection.write_all(request.as_bytes()) {
            self.drop_connection(&error);
            return Err(error);
        }

        self.current = Some(target);
        self.last_request = request;

        Ok(())
    }

    /// Reads the response to the request sent last.
    ///
    /// The headers of the previous response are released first. `Set-Cookie` headers replace
    /// the stored cookies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMalformed`] if the response framing is invalid,
    /// [`Error::Timeout`] if the server stops sending, [`Error::Transport`] if the connection
    /// fails or no request was sent, and [`Error::AllocationExhausted`] if a record pool cannot
    /// grow. The connection is closed after any error.
    pub fn receive_response(&mut self) -> Result<Response> {
        let result = self.read_response();

        if let Err(error) = &result {
            self.drop_connection(error);
        }

        result
    }

    fn read_response(&mut self) -> Result<Response> {
        self.headers.reset_all();

        let Some(connection) = self.connection.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no request in flight").into());
        };

        let head = connection.read_head(self.options.max_header_bytes())?;
        let status = parse_status_line(&head)?;

        self.headers.parse_block(&head)?;
        self.cookies.replace_from(&self.headers)?;

        let body = if self.options.verb() == Verb::Head || has_no_body(status) {
            Vec::new()
        } else if self
            .headers
            .get_all("transfer-encoding")
            .any(|value| value.to_ascii_lowercase().contains("chunked"))
        {
            connection.read_chunked_body()?
        } else if let Some(length) = self.headers.get("content-length") {
            let length = length.parse().map_err(|error| {
                Error::malformed(format!("invalid content length '{length}': {error}"))
            })?;

            connection.read_sized_body(length)?
        } else {
            return Err(Error::malformed(
                "response has neither a content length nor chunked framing",
            ));
        };

        debug!(
            status = status.as_u16(),
            headers = self.headers.len(),
            body = body.len(),
            "response received"
        );

        if self.headers.has_value("connection", "close") {
            debug!("server closed the connection");
            self.connection = None;
        }

        let target = self
            .current
            .clone()
            .expect("a connection only exists once a request has been sent");

        Ok(Response {
            status,
            body,
            target,
        })
    }

    /// Sends a request for `target` and follows redirects until a final response arrives.
    ///
    /// Every redirect is recorded in the redirect cache. `HEAD` requests, and all requests when
    /// redirect following is disabled, return the first response as is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingLocation`] for a redirect without a `Location` header and
    /// [`Error::RedirectLoop`] if a redirect points back at the URL that produced it or the
    /// redirect limit is reached. Any error from sending or receiving is returned as is.
    pub fn follow_redirects_until_final(&mut self, target: &Target) -> Result<Response> {
        let mut current = target.clone();
        let mut followed = 0_usize;

        loop {
            self.send_request(&current)?;
            let response = self.receive_response()?;

            if self.options.verb() == Verb::Head
                || !self.options.follow_redirects()
                || !is_followable_redirect(response.status())
            {
                return Ok(response);
            }

            let location = self
                .headers
                .get("location")
                .ok_or_else(|| Error::MissingLocation {
                    status: response.status().as_u16(),
                })?;

            let sent = response.target();
            let next = sent.join(location)?;

            self.redirects.record(sent.as_str(), next.as_str());

            followed = followed.saturating_add(1);

            if next.with_scheme(self.options.secure()) == *sent
                || followed > self.options.max_redirects()
            {
                return Err(Error::RedirectLoop {
                    url: next.as_str().to_owned(),
                });
            }

            debug!(
                status = response.status().as_u16(),
                from = sent.as_str(),
                to = next.as_str(),
                "following redirect"
            );

            self.headers.reset_all();
            current = next;
        }
    }

    fn ensure_connection(&mut self, target: &Target) -> Result<&mut Connection> {
        if self
            .connection
            .as_ref()
            .is_some_and(|connection| !connection.origin().same_origin(target))
        {
            debug!(host = target.host(), "origin changed, reconnecting");
            self.connection = None;
        }

        if self.connection.is_none() {
            let transport = self.connector.connect(
                target.host(),
                target.port(),
                target.is_secure(),
                self.options.read_timeout(),
            )?;

            self.connection = Some(Connection::new(
                transport,
                target.clone(),
                self.options.read_block(),
                self.options.max_stalls(),
            ));
        }

        Ok(self
            .connection
            .as_mut()
            .expect("we just ensured a connection exists"))
    }

    fn drop_connection(&mut self, error: &Error) {
        if self.connection.take().is_some() {
            warn!(%error, reconnect = error.requires_reconnect(), "closing connection after error");
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;
    use crate::{MockConnector, Transport};

    /// Replays canned server replies, one per read, and swallows everything written.
    #[derive(Debug)]
    struct Canned {
        replies: VecDeque<Vec<u8>>,
    }

    impl Canned {
        fn boxed(replies: &[&[u8]]) -> Box<dyn Transport> {
            Box::new(Self {
                replies: replies.iter().map(|reply| reply.to_vec()).collect(),
            })
        }
    }

    impl Transport for Canned {
        fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            let Some(reply) = self.replies.front_mut() else {
                return Ok(0);
            };

            let count = reply.len().min(buffer.len());
            buffer[..count].copy_from_slice(&reply[..count]);
            reply.drain(..count);

            if reply.is_empty() {
                self.replies.pop_front();
            }

            Ok(count)
        }

        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            Ok(bytes.len())
        }
    }

    fn options() -> ClientOptions {
        ClientOptions::builder().secure(false).max_stalls(2).build()
    }

    #[test]
    fn connect_failure_is_transport_error() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_, _, _, _| Err(io::ErrorKind::ConnectionRefused.into()));

        let mut client = HttpClient::new(connector, options());
        let target = Target::parse("http://example.org/").unwrap();

        let error = client.send_request(&target).unwrap_err();

        assert!(matches!(error, Error::Transport(_)));
        assert!(error.requires_reconnect());
        assert!(!client.is_connected());
    }

    #[test]
    fn connects_with_rewritten_scheme_and_timeout() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .withf(|host, port, secure, timeout| {
                host == "example.org" && *port == 80 && !*secure && *timeout == Duration::from_secs(1)
            })
            .times(1)
            .return_once(|_, _, _, _| {
                Ok(Canned::boxed(&[b"HTTP/1.1 204 No Content\r\n\r\n"]))
            });

        let options = ClientOptions::builder()
            .secure(false)
            .read_timeout(Duration::from_secs(1))
            .build();
        let mut client = HttpClient::new(connector, options);
        let target = Target::parse("https://example.org/").unwrap();

        let response = client.follow_redirects_until_final(&target).unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.target().as_str(), "http://example.org/");
        assert!(client.last_request_header().starts_with("GET / HTTP/1.1\r\n"));
    }

    #[test]
    fn reconnects_when_redirect_changes_host() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .withf(|host, _, _, _| host == "a.example")
            .times(1)
            .return_once(|_, _, _, _| {
                Ok(Canned::boxed(&[
                    b"HTTP/1.1 301 Moved Permanently\r\nLocation: http://b.example/x\r\nContent-Length: 0\r\n\r\n",
                ]))
            });
        connector
            .expect_connect()
            .withf(|host, _, _, _| host == "b.example")
            .times(1)
            .return_once(|_, _, _, _| {
                Ok(Canned::boxed(&[
                    b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok",
                ]))
            });

        let mut client = HttpClient::new(connector, options());
        let target = Target::parse("http://a.example/").unwrap();

        let response = client.follow_redirects_until_final(&target).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"ok");
        assert_eq!(response.target().host(), "b.example");
        assert_eq!(client.redirects().len(), 1);
    }

    #[test]
    fn malformed_response_drops_connection() {
        let mut connector = MockConnector::new();
        connector.expect_connect().times(1).return_once(|_, _, _, _| {
            Ok(Canned::boxed(&[b"HTTP/1.1 200 OK\r\nNoColon\r\n\r\n"]))
        });

        let mut client = HttpClient::new(connector, options());
        let target = Target::parse("http://example.org/").unwrap();

        client.send_request(&target).unwrap();
        assert!(client.is_connected());

        let error = client.receive_response().unwrap_err();

        assert!(matches!(error, Error::ProtocolMalformed { .. }));
        assert!(!client.is_connected());
    }

    #[test]
    fn receive_without_request_is_transport_error() {
        let mut client = HttpClient::new(MockConnector::new(), options());

        assert!(matches!(
            client.receive_response(),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn redirect_without_location() {
        let mut connector = MockConnector::new();
        connector.expect_connect().times(1).return_once(|_, _, _, _| {
            Ok(Canned::boxed(&[b"HTTP/1.1 302 Found\r\nContent-Length: 0\r\n\r\n"]))
        });

        let mut client = HttpClient::new(connector, options());
        let target = Target::parse("http://example.org/").unwrap();

        assert!(matches!(
            client.follow_redirects_until_final(&target),
            Err(Error::MissingLocation { status: 302 })
        ));
    }
}
