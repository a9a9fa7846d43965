use std::io;

use tracing::trace;

use crate::{ByteBuffer, ChunkedDecoder, Error, Result, Target, Transport};

/// An open transport plus the bytes read from it that no response has consumed yet.
///
/// Reads happen in blocks of a fixed size. Bytes read past the end of one response stay in the
/// inbound buffer and are consumed by the next response before the transport is read again.
#[derive(Debug)]
pub(crate) struct Connection {
    transport: Box<dyn Transport>,

    // The target the connection was opened for; requests to the same origin reuse it.
    origin: Target,

    inbound: ByteBuffer,
    read_block: usize,
    max_stalls: usize,
}

impl Connection {
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        origin: Target,
        read_block: usize,
        max_stalls: usize,
    ) -> Self {
        Self {
            transport,
            origin,
            inbound: ByteBuffer::with_capacity(read_block),
            read_block,
            max_stalls,
        }
    }

    pub(crate) fn origin(&self) -> &Target {
        &self.origin
    }

    /// Writes every byte of `bytes`, retrying partial writes.
    pub(crate) fn write_all(&mut self, mut bytes: &[u8]) -> Result<()> {
        let mut stalls = 0_usize;

        while !bytes.is_empty() {
            match self.transport.write(bytes) {
                Ok(0) => self.stall(&mut stalls)?,
                Ok(written) => {
                    stalls = 0;
                    bytes = bytes.get(written..).unwrap_or_default();
                }
                Err(error) if is_stall(&error) => self.stall(&mut stalls)?,
                Err(error) => return Err(error.into()),
            }
        }

        Ok(())
    }

    /// Reads one block from the transport into the inbound buffer.
    ///
    /// A read that makes no progress counts as a stall. Once more than `max_stalls` consecutive
    /// reads have stalled, the read fails with [`Error::Timeout`].
    fn fill(&mut self) -> Result<usize> {
        let mut block = vec![0_u8; self.read_block];
        let mut stalls = 0_usize;

        loop {
            match self.transport.read(&mut block) {
                Ok(0) => self.stall(&mut stalls)?,
                Ok(read) => {
                    let read = read.min(block.len());
                    self.inbound.append(block.get(..read).unwrap_or_default());

                    trace!(read, buffered = self.inbound.len(), "read block");

                    return Ok(read);
                }
                Err(error) if is_stall(&error) => self.stall(&mut stalls)?,
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn stall(&self, stalls: &mut usize) -> Result<()> {
        *stalls = stalls.saturating_add(1);

        if *stalls > self.max_stalls {
            return Err(Error::Timeout { stalls: *stalls });
        }

        Ok(())
    }

    /// Reads until the blank line that ends a response head and returns the head, without the
    /// blank line. Anything after it stays buffered for the body.
    pub(crate) fn read_head(&mut self, max_header_bytes: usize) -> Result<Vec<u8>> {
        let mut searched = 0;

        let end = loop {
            if let Some(position) = self.inbound.find(b"\r\n\r\n", searched) {
                break position;
            }

            if self.inbound.len() > max_header_bytes {
                return Err(Error::malformed(format!(
                    "header block exceeds {max_header_bytes} bytes without a terminating blank line"
                )));
            }

            // The terminator may straddle the previous block boundary.
            searched = self.inbound.len().saturating_sub(3);
            self.fill()?;
        };

        if end > max_header_bytes {
            return Err(Error::malformed(format!(
                "header block of {end} bytes exceeds the limit of {max_header_bytes}"
            )));
        }

        if !self.inbound.as_bytes().starts_with(b"HTTP/") {
            return Err(Error::malformed("response does not start with an HTTP status line"));
        }

        let head = self.inbound.as_bytes().get(..end).unwrap_or_default().to_vec();

        // Consume the head and the blank line.
        self.inbound.delete_collapse(0, end.saturating_add(4));

        Ok(head)
    }

    /// Reads a body of exactly `length` bytes.
    pub(crate) fn read_sized_body(&mut self, length: usize) -> Result<Vec<u8>> {
        while self.inbound.len() < length {
            self.fill()?;
        }

        let body = self.inbound.as_bytes().get(..length).unwrap_or_default().to_vec();
        self.inbound.delete_collapse(0, length);

        Ok(body)
    }

    /// Reads and decodes a chunked body, consuming the buffered bytes before reading more.
    pub(crate) fn read_chunked_body(&mut self) -> Result<Vec<u8>> {
        let mut decoder = ChunkedDecoder::new();
        let mut body = Vec::new();

        loop {
            let consumed = decoder.feed(self.inbound.as_bytes(), &mut body)?;
            self.inbound.delete_collapse(0, consumed);

            if decoder.is_done() {
                return Ok(body);
            }

            self.fill()?;
        }
    }
}

fn is_stall(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
