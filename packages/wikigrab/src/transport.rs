#![cfg_attr(test, expect(
    clippy::struct_field_names,
    reason = "false positive from automock generated code"
))]

use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::debug;

/// A blocking byte stream to a server, over a plain socket or a TLS session.
///
/// Both operations block the calling thread. A read that returns zero bytes or fails with
/// [`io::ErrorKind::WouldBlock`] or [`io::ErrorKind::TimedOut`] made no progress; the caller
/// decides how many of those it tolerates before giving up.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Debug + Send {
    /// Reads up to `buffer.len()` bytes into `buffer`, returning how many were read.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Writes some prefix of `bytes`, returning how many bytes were written.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;
}

/// Opens transports to servers.
///
/// This is the seam at which tests substitute scripted servers for real sockets.
#[cfg_attr(test, mockall::automock)]
pub trait Connector: Debug {
    /// Opens a transport to `host:port`, over TLS if `secure` is set.
    ///
    /// Reads on the returned transport give up after `read_timeout` without data.
    fn connect(
        &self,
        host: &str,
        port: u16,
        secure: bool,
        read_timeout: Duration,
    ) -> io::Result<Box<dyn Transport>>;
}

/// Adapts any blocking [`Read`] + [`Write`] stream to a [`Transport`].
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl<S> StreamTransport<S> {
    /// Wraps `stream`.
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S: Read + Write + Debug + Send> Transport for StreamTransport<S> {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buffer)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let written = self.stream.write(bytes)?;
        self.stream.flush()?;
        Ok(written)
    }
}

/// Connects over TCP, wrapping the socket in TLS for secure connections.
///
/// TLS is only available when the crate is built with the `tls` feature. Without it, secure
/// connections fail with [`io::ErrorKind::Unsupported`].
#[derive(Debug, Default)]
pub struct TcpConnector;

impl TcpConnector {
    /// Creates a connector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TcpConnector {
    #[cfg_attr(test, mutants::skip)] // Requires a real network to observe.
    fn connect(
        &self,
        host: &str,
        port: u16,
        secure: bool,
        read_timeout: Duration,
    ) -> io::Result<Box<dyn Transport>> {
        debug!(host, port, secure, "connecting");

        let stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_nodelay(true)?;

        if secure {
            wrap_tls(host, stream)
        } else {
            Ok(Box::new(StreamTransport::new(stream)))
        }
    }
}

#[cfg(feature = "tls")]
#[cfg_attr(test, mutants::skip)] // Requires a real network to observe.
fn wrap_tls(host: &str, stream: TcpStream) -> io::Result<Box<dyn Transport>> {
    let connector = native_tls::TlsConnector::new().map_err(io::Error::other)?;

    let session = connector
        .connect(host, stream)
        .map_err(|error| io::Error::other(error.to_string()))?;

    Ok(Box::new(StreamTransport::new(session)))
}

#[cfg(not(feature = "tls"))]
fn wrap_tls(host: &str, _stream: TcpStream) -> io::Result<Box<dyn Transport>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot open a TLS session to {host}: built without the 'tls' feature"),
    ))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[derive(Debug)]
    struct Loopback {
        incoming: Cursor<Vec<u8>>,
        outgoing: Vec<u8>,
    }

    impl Read for Loopback {
        fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            self.incoming.read(buffer)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.outgoing.write(bytes)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_transport_passes_bytes_through() {
        let mut transport = StreamTransport::new(Loopback {
            incoming: Cursor::new(b"HTTP/1.1".to_vec()),
            outgoing: Vec::new(),
        });

        let mut buffer = [0_u8; 4];
        assert_eq!(transport.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer, b"HTTP");

        assert_eq!(transport.write(b"GET").unwrap(), 3);
        assert_eq!(transport.stream.outgoing, b"GET");
    }

    #[cfg(not(feature = "tls"))]
    #[test]
    fn tls_without_feature_is_unsupported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let error = TcpConnector::new()
            .connect("127.0.0.1", port, true, Duration::from_secs(1))
            .unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::Unsupported);
    }
}
