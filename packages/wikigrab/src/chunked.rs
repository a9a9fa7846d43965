use crate::{Error, Result};

// More hex digits than this cannot describe a chunk we could ever buffer.
const MAX_SIZE_DIGITS: usize = 15;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Size { value: u64, digits: usize },
    SizeLineEnd { value: u64 },
    Extension { value: u64 },
    Data { remaining: u64 },
    DataTerminator { seen_cr: bool },
    Trailer { line_len: usize },
    Done,
}

/// Decodes a `Transfer-Encoding: chunked` body incrementally.
///
/// Input is fed in whatever pieces the transport delivers. The decoder keeps its position in the
/// framing between calls, so a chunk size line or chunk payload may be split across any number
/// of reads. It stops consuming at the end of the body, leaving any bytes that belong to the
/// next response to the caller.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: State,
}

impl ChunkedDecoder {
    /// Creates a decoder positioned at the first chunk size line.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Size {
                value: 0,
                digits: 0,
            },
        }
    }

    /// Whether the terminating zero-size chunk and the trailer have been consumed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Decodes as much of `input` as possible, appending chunk payloads to `body`.
    ///
    /// Returns the number of input bytes consumed. This is less than `input.len()` only once the
    /// body is complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMalformed`] if the framing is invalid.
    #[expect(
        clippy::arithmetic_side_effects,
        reason = "position never exceeds the input length and take never exceeds remaining"
    )]
    pub fn feed(&mut self, input: &[u8], body: &mut Vec<u8>) -> Result<usize> {
        let mut position = 0;

        while position < input.len() && !self.is_done() {
            let rest = input.get(position..).unwrap_or_default();

            if let State::Data { remaining } = self.state {
                let take = usize::try_from(remaining).map_or(rest.len(), |r| r.min(rest.len()));

                body.extend_from_slice(rest.get(..take).unwrap_or_default());
                position += take;

                let remaining = remaining - u64::try_from(take).expect("usize always fits in u64");
                self.state = if remaining == 0 {
                    State::DataTerminator { seen_cr: false }
                } else {
                    State::Data { remaining }
                };

                continue;
            }

            let byte = *rest.first().expect("loop condition guarantees unread input");
            self.state = self.step(byte)?;
            position += 1;
        }

        Ok(position)
    }

    #[expect(
        clippy::arithmetic_side_effects,
        reason = "size digits are capped so the value fits in u64 and line lengths count input bytes"
    )]
    fn step(&self, byte: u8) -> Result<State> {
        Ok(match self.state {
            State::Size { value, digits } => match byte {
                b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => {
                    if digits >= MAX_SIZE_DIGITS {
                        return Err(Error::malformed("chunk size is too large"));
                    }

                    let digit = u64::from(
                        char::from(byte)
                            .to_digit(16)
                            .expect("we only get here for hex digits"),
                    );

                    State::Size {
                        value: value * 16 + digit,
                        digits: digits + 1,
                    }
                }
                _ if digits == 0 => {
                    return Err(Error::malformed(format!(
                        "chunk size line starts with byte 0x{byte:02x}"
                    )));
                }
                b'\r' => State::SizeLineEnd { value },
                b'\n' => Self::after_size_line(value),
                b';' | b' ' | b'\t' => State::Extension { value },
                _ => {
                    return Err(Error::malformed(format!(
                        "unexpected byte 0x{byte:02x} in chunk size"
                    )));
                }
            },
            State::SizeLineEnd { value } => match byte {
                b'\n' => Self::after_size_line(value),
                _ => return Err(Error::malformed("chunk size line has a bare CR")),
            },
            State::Extension { value } => match byte {
                b'\n' => Self::after_size_line(value),
                _ => State::Extension { value },
            },
            State::DataTerminator { seen_cr } => match (byte, seen_cr) {
                (b'\r', false) => State::DataTerminator { seen_cr: true },
                (b'\n', _) => State::Size {
                    value: 0,
                    digits: 0,
                },
                _ => return Err(Error::malformed("chunk data is not followed by CRLF")),
            },
            State::Trailer { line_len } => match byte {
                b'\n' if line_len == 0 => State::Done,
                b'\n' => State::Trailer { line_len: 0 },
                b'\r' => State::Trailer { line_len },
                _ => State::Trailer {
                    line_len: line_len + 1,
                },
            },
            State::Data { .. } | State::Done => {
                unreachable!("payload bytes and completion are handled by the caller")
            }
        })
    }

    fn after_size_line(value: u64) -> State {
        if value == 0 {
            State::Trailer { line_len: 0 }
        } else {
            State::Data { remaining: value }
        }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}
