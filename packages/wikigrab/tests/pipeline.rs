//! End-to-end request and response cycles against a scripted server.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::StatusCode;
use wikigrab::{
    ArticleExtractor, ClientOptions, ClientOptionsBuilder, Connector, Error, HttpClient, Target,
    Transport, Verb, WikiGrabber,
};

#[derive(Debug)]
enum Reply {
    Bytes(Vec<u8>),
    Stall,
}

#[derive(Debug, Default)]
struct ServerState {
    replies: VecDeque<Reply>,
    requests: Vec<String>,
    connects: Vec<(String, u16, bool)>,
}

/// Hands out transports that all read from one reply script and record every request.
#[derive(Clone, Debug, Default)]
struct ScriptedServer {
    state: Arc<Mutex<ServerState>>,
}

impl ScriptedServer {
    fn reply(&self, bytes: impl AsRef<[u8]>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .push_back(Reply::Bytes(bytes.as_ref().to_vec()));
        self
    }

    fn stall(&self, times: usize) -> &Self {
        let mut state = self.state.lock().unwrap();

        for _ in 0..times {
            state.replies.push_back(Reply::Stall);
        }

        self
    }

    fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| request.lines().next().unwrap().to_owned())
            .collect()
    }

    fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects.len()
    }
}

#[derive(Debug)]
struct ScriptedTransport {
    state: Arc<Mutex<ServerState>>,
}

impl Transport for ScriptedTransport {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();

        match state.replies.front_mut() {
            None | Some(Reply::Stall) => {
                state.replies.pop_front();
                Err(io::ErrorKind::WouldBlock.into())
            }
            Some(Reply::Bytes(bytes)) => {
                let count = bytes.len().min(buffer.len());
                buffer[..count].copy_from_slice(&bytes[..count]);
                bytes.drain(..count);

                if bytes.is_empty() {
                    state.replies.pop_front();
                }

                Ok(count)
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.state
            .lock()
            .unwrap()
            .requests
            .push(String::from_utf8_lossy(bytes).into_owned());
        Ok(bytes.len())
    }
}

impl Connector for ScriptedServer {
    fn connect(
        &self,
        host: &str,
        port: u16,
        secure: bool,
        _read_timeout: Duration,
    ) -> io::Result<Box<dyn Transport>> {
        self.state
            .lock()
            .unwrap()
            .connects
            .push((host.to_owned(), port, secure));

        Ok(Box::new(ScriptedTransport {
            state: Arc::clone(&self.state),
        }))
    }
}

fn plain() -> ClientOptionsBuilder {
    ClientOptions::builder().secure(false).max_stalls(3)
}

fn client(server: &ScriptedServer, options: ClientOptions) -> HttpClient<ScriptedServer> {
    HttpClient::new(server.clone(), options)
}

fn target(url: &str) -> Target {
    Target::parse(url).unwrap()
}

#[test]
fn content_length_response() {
    let server = ScriptedServer::default();
    server.reply("HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\nWikiGrab!");

    let mut client = client(&server, plain().build());

    client.send_request(&target("http://wiki.test/")).unwrap();
    let response = client.receive_response().unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().len(), 9);
    assert_eq!(response.body(), b"WikiGrab!");

    let headers = client.headers().iter().collect::<Vec<_>>();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].name, "content-length");
    assert_eq!(headers[0].value, "9");
}

#[test]
fn chunked_response_in_small_reads() {
    let server = ScriptedServer::default();
    server
        .reply("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWi")
        .reply("ki\r\n5\r\nGrab!\r\n0\r\n\r\n");

    let mut client = client(&server, plain().read_block(4).build());

    let response = client
        .follow_redirects_until_final(&target("http://wiki.test/"))
        .unwrap();

    assert_eq!(response.body(), b"WikiGrab!");
}

#[test]
fn pipelined_responses_use_overread() {
    let server = ScriptedServer::default();
    server.reply(
        "HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\none\
         HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\ntwo\r\n0\r\n\r\n",
    );

    let mut client = client(&server, plain().read_block(1024).build());
    let page = target("http://wiki.test/");

    let first = client.follow_redirects_until_final(&page).unwrap();
    let second = client.follow_redirects_until_final(&page).unwrap();

    assert_eq!(first.body(), b"one");
    assert_eq!(second.body(), b"two");
    assert_eq!(server.connect_count(), 1);
}

#[test]
fn redirect_cache_skips_round_trip() {
    let server = ScriptedServer::default();
    server
        .reply("HTTP/1.1 301 Moved Permanently\r\nLocation: /wiki/B\r\nContent-Length: 0\r\n\r\n")
        .reply("HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb")
        .reply("HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb");

    let mut client = client(&server, plain().build());
    let original = target("http://wiki.test/wiki/A");

    let first = client.follow_redirects_until_final(&original).unwrap();
    let second = client.follow_redirects_until_final(&original).unwrap();

    assert_eq!(first.target(), second.target());
    assert_eq!(second.target().as_str(), "http://wiki.test/wiki/B");
    assert_eq!(
        server.request_lines(),
        [
            "GET /wiki/A HTTP/1.1",
            "GET /wiki/B HTTP/1.1",
            "GET /wiki/B HTTP/1.1"
        ]
    );
    assert_eq!(server.connect_count(), 1);
}

#[test]
fn self_redirect_is_a_loop_and_is_not_resent() {
    let server = ScriptedServer::default();
    server.reply("HTTP/1.1 302 Found\r\nLocation: /same\r\nContent-Length: 0\r\n\r\n");

    let mut client = client(&server, plain().build());
    let page = target("http://wiki.test/same");

    assert!(matches!(
        client.follow_redirects_until_final(&page),
        Err(Error::RedirectLoop { .. })
    ));

    // The cache now says "do not resend", so nothing goes out.
    assert!(matches!(
        client.follow_redirects_until_final(&page),
        Err(Error::RedirectLoop { .. })
    ));
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn redirect_limit() {
    let server = ScriptedServer::default();

    for hop in 1..=3 {
        server.reply(format!(
            "HTTP/1.1 302 Found\r\nLocation: /{}\r\nContent-Length: 0\r\n\r\n",
            hop + 1
        ));
    }

    let mut client = client(&server, plain().max_redirects(2).build());

    let error = client
        .follow_redirects_until_final(&target("http://wiki.test/1"))
        .unwrap_err();

    assert!(matches!(error, Error::RedirectLoop { url } if url == "http://wiki.test/4"));
    assert_eq!(server.requests().len(), 3);
}

#[test]
fn redirects_not_followed_when_disabled() {
    let server = ScriptedServer::default();
    server.reply("HTTP/1.1 301 Moved Permanently\r\nLocation: /b\r\nContent-Length: 0\r\n\r\n");

    let mut client = client(&server, plain().follow_redirects(false).build());

    let response = client
        .follow_redirects_until_final(&target("http://wiki.test/a"))
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(client.headers().get("location"), Some("/b"));
}

#[test]
fn stalled_server_times_out_and_forces_reconnect() {
    let server = ScriptedServer::default();
    server.reply("HTTP/1.1 200 OK\r\n").stall(4);
    server.reply("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");

    let mut client = client(&server, plain().build());
    let page = target("http://wiki.test/");

    let error = client.follow_redirects_until_final(&page).unwrap_err();

    assert!(matches!(error, Error::Timeout { stalls: 4 }));
    assert!(error.requires_reconnect());
    assert!(!client.is_connected());

    let response = client.follow_redirects_until_final(&page).unwrap();

    assert_eq!(response.body(), b"ok");
    assert_eq!(server.connect_count(), 2);
}

#[test]
fn connection_close_reconnects_for_next_request() {
    let server = ScriptedServer::default();
    server
        .reply("HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 1\r\n\r\na")
        .reply("HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb");

    let mut client = client(&server, plain().build());
    let page = target("http://wiki.test/");

    client.follow_redirects_until_final(&page).unwrap();
    assert!(!client.is_connected());

    client.follow_redirects_until_final(&page).unwrap();
    assert!(client.is_connected());
    assert_eq!(server.connect_count(), 2);
}

#[test]
fn cookies_are_sent_back() {
    let server = ScriptedServer::default();
    server
        .reply(
            "HTTP/1.1 200 OK\r\nSet-Cookie: session=abc; Path=/; HttpOnly\r\n\
             Set-Cookie: lang=en\r\nContent-Length: 0\r\n\r\n",
        )
        .reply("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

    let mut client = client(&server, plain().build());
    let page = target("http://wiki.test/");

    client.follow_redirects_until_final(&page).unwrap();
    client.follow_redirects_until_final(&page).unwrap();

    let requests = server.requests();
    assert!(!requests[0].contains("Cookie:"));
    assert!(requests[1].contains("Cookie: session=abc\r\nCookie: lang=en\r\n\r\n"));
    assert_eq!(client.cookies().len(), 2);
}

#[test]
fn head_request_reads_no_body() {
    let server = ScriptedServer::default();
    server.reply("HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n");

    let mut client = client(&server, plain().verb(Verb::Head).build());

    let response = client
        .follow_redirects_until_final(&target("http://wiki.test/"))
        .unwrap();

    assert!(response.body().is_empty());
    assert_eq!(client.headers().get("content-length"), Some("100"));
    assert!(server.requests()[0].starts_with("HEAD / HTTP/1.1\r\n"));
}

#[test]
fn body_without_length_is_malformed() {
    let server = ScriptedServer::default();
    server.reply("HTTP/1.1 200 OK\r\nServer: x\r\n\r\nbody");

    let mut client = client(&server, plain().build());

    assert!(matches!(
        client.follow_redirects_until_final(&target("http://wiki.test/")),
        Err(Error::ProtocolMalformed { .. })
    ));
    assert!(!client.is_connected());
}

#[test]
fn header_records_are_released_between_responses() {
    let server = ScriptedServer::default();
    server
        .reply("HTTP/1.1 200 OK\r\nA: 1\r\nB: 2\r\nC: 3\r\nContent-Length: 0\r\n\r\n")
        .reply("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

    let mut client = client(&server, plain().build());
    let page = target("http://wiki.test/");

    client.follow_redirects_until_final(&page).unwrap();
    assert_eq!(client.headers().len(), 4);

    client.follow_redirects_until_final(&page).unwrap();
    assert_eq!(client.headers().len(), 1);
    assert_eq!(client.headers().pool().used_count(), 1);
    assert_eq!(client.headers().get("a"), None);
}

#[test]
fn grabber_extracts_article() {
    let page = r#"<html><head><title>Rust (programming language) - Wikipedia</title></head>
<body><div id="mw-content-text"><p><b>Rust</b> is a general-purpose programming language.</p>
<div class="mw-heading"><h2>History</h2></div><p>It was designed by Graydon Hoare.</p></div></body></html>"#;

    let server = ScriptedServer::default();
    server.reply(format!(
        "HTTP/1.1 200 OK\r\nLast-Modified: Thu, 15 Oct 2026 08:00:00 GMT\r\nContent-Length: {}\r\n\r\n{page}",
        page.len()
    ));

    let mut grabber = WikiGrabber::new(client(&server, plain().build()));

    let article = grabber
        .fetch(&target("http://en.wikipedia.test/wiki/Rust"))
        .unwrap();

    assert_eq!(article.status, StatusCode::OK);
    assert_eq!(article.title.as_deref(), Some("Rust (programming language)"));
    assert_eq!(
        article.last_modified.as_deref(),
        Some("Thu, 15 Oct 2026 08:00:00 GMT")
    );
    assert_eq!(
        article.text,
        "Rust is a general-purpose programming language.\n\nHistory\n\nIt was designed by Graydon Hoare.\n"
    );
}

#[test]
fn grabber_renders_formulas_and_justifies() {
    let page = r#"<html><head><title>Pythagoras - Wikipedia</title></head>
<body><div id="mw-content-text"><p>For a right triangle <math><semantics><mrow><mi>c</mi></mrow><annotation encoding="application/x-tex">{\displaystyle c=\sqrt{a^2+b^2}}</annotation></semantics></math> holds.</p></div></body></html>"#;

    let server = ScriptedServer::default();
    server.reply(format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{page}",
        page.len()
    ));

    let mut grabber = WikiGrabber::with_extractor(
        client(&server, plain().build()),
        ArticleExtractor::new().with_line_width(30),
    );

    let article = grabber
        .fetch(&target("http://en.wikipedia.test/wiki/Pythagoras"))
        .unwrap();

    assert_eq!(article.title.as_deref(), Some("Pythagoras"));
    assert_eq!(
        article.text,
        "For     a    right    triangle\nc=\u{221a}(a^2+b^2) holds.\n"
    );
}
