//! Reduction of extracted markup to plain text.

#![expect(
    clippy::arithmetic_side_effects,
    reason = "offsets never exceed the length of the buffer being rewritten"
)]

use std::iter;

use crate::buffer::find_bytes;
use crate::{ByteBuffer, html};

/// The line width articles are wrapped to unless told otherwise.
pub const DEFAULT_LINE_WIDTH: usize = 72;

// Tags that end a visual line. Stripping them leaves a line break behind.
const LINE_BREAKING_TAGS: &[&[u8]] = &[b"</li", b"</tr", b"</td", b"</ul", b"</pre", b"<br"];

const ENTITIES: &[(&[u8], u8)] = &[
    (b"&quot;", b'"'),
    (b"&amp;", b'&'),
    (b"&lt;", b'<'),
    (b"&gt;", b'>'),
    (b"&nbsp;", b' '),
];

// Longest numeric character reference we recognize, `&#x10FFFF;`.
const MAX_NUMERIC_REFERENCE: usize = 10;

/// Applies every cleanup pass in order: tags, reference markers, numeric character
/// references, named entities and finally whitespace.
pub fn clean_up(buffer: &mut ByteBuffer) {
    strip_tags(buffer);
    drop_reference_markers(buffer);
    blank_numeric_references(buffer);
    decode_entities(buffer);
    collapse_whitespace(buffer);
}

/// Removes every tag. Closing list, table row, table cell and preformatted tags, and line
/// breaks, are replaced by a newline.
///
/// A `>` inside a quoted attribute value does not end the tag.
pub fn strip_tags(buffer: &mut ByteBuffer) {
    rewrite(buffer, |rest, output| {
        let is_tag = rest.first() == Some(&b'<')
            && rest
                .get(1)
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, b'/' | b'!'));

        if !is_tag {
            return copy_one(rest, output);
        }

        let Some(end) = html::tag_end(rest, 0) else {
            return copy_one(rest, output);
        };

        if LINE_BREAKING_TAGS.iter().any(|tag| rest.starts_with(tag)) {
            output.push(b'\n');
        }

        end
    });
}

/// Removes inline citation markers such as `&#91;12&#93;`, the encoded form of `[12]`.
///
/// A marker must close on the line it opens on.
pub fn drop_reference_markers(buffer: &mut ByteBuffer) {
    const OPEN: &[u8] = b"&#91;";
    const CLOSE: &[u8] = b"&#93;";

    rewrite(buffer, |rest, output| {
        if rest.starts_with(OPEN) {
            let line = rest
                .iter()
                .position(|byte| *byte == b'\n')
                .map_or(rest, |newline| rest.get(..newline).unwrap_or(rest));

            if let Some(close) = find_bytes(line, CLOSE) {
                return close + CLOSE.len();
            }
        }

        copy_one(rest, output)
    });
}

/// Replaces every numeric character reference such as `&#160;` or `&#x2014;` with a space.
pub fn blank_numeric_references(buffer: &mut ByteBuffer) {
    rewrite(buffer, |rest, output| {
        if let Some(length) = numeric_reference_len(rest) {
            output.push(b' ');
            return length;
        }

        copy_one(rest, output)
    });
}

/// Decodes the named entities `&quot;`, `&amp;`, `&lt;`, `&gt;` and `&nbsp;`.
///
/// Decoding is a single pass, so `&amp;lt;` becomes `&lt;` and not `<`.
pub fn decode_entities(buffer: &mut ByteBuffer) {
    rewrite(buffer, |rest, output| {
        if rest.first() == Some(&b'&') {
            for (entity, replacement) in ENTITIES {
                if rest.starts_with(entity) {
                    output.push(*replacement);
                    return entity.len();
                }
            }
        }

        copy_one(rest, output)
    });
}

/// Collapses runs of spaces and tabs into one space and runs of three or more line breaks
/// into one blank line. Whitespace at the start and end of lines and of the whole text is
/// removed, and non-empty text ends with a single newline.
pub fn collapse_whitespace(buffer: &mut ByteBuffer) {
    let input = buffer.take();
    let mut output = Vec::with_capacity(input.len());

    let mut newlines = 0_usize;
    let mut space = false;

    for byte in input {
        match byte {
            b'\r' => {}
            b' ' | b'\t' => space = true,
            b'\n' => {
                newlines = newlines.saturating_add(1);
                space = false;
            }
            _ => {
                if !output.is_empty() {
                    if newlines > 0 {
                        output.extend_from_slice(if newlines == 1 { b"\n" } else { b"\n\n" });
                    } else if space {
                        output.push(b' ');
                    }
                }

                newlines = 0;
                space = false;
                output.push(byte);
            }
        }
    }

    if !output.is_empty() {
        output.push(b'\n');
    }

    *buffer = ByteBuffer::from(output);
}

/// Wraps the text to lines of at most `width` characters and justifies them.
///
/// Lines within a paragraph are joined and paragraphs stay separated by a blank line. Words
/// are kept whole, so a word longer than `width` gets a line of its own. Every line except the
/// last of its paragraph is padded to exactly `width` by widening the gaps between words,
/// with the leftover spaces handed out alternately to the leftmost and rightmost gaps. Lines
/// shorter than a third of `width` are left ragged. A `width` of zero leaves the text as it is.
pub fn reflow(buffer: &mut ByteBuffer, width: usize) {
    if width == 0 {
        return;
    }

    let input = buffer.take();
    let text = String::from_utf8_lossy(&input);

    let mut output = ByteBuffer::with_capacity(input.len());
    let mut words = Vec::new();

    for line in text.lines().chain(iter::once("")) {
        if !line.trim().is_empty() {
            words.extend(line.split_whitespace());
            continue;
        }

        if words.is_empty() {
            continue;
        }

        if !output.is_empty() {
            output.append(b"\n");
        }

        wrap_paragraph(&words, width, &mut output);
        words.clear();
    }

    *buffer = output;
}

fn wrap_paragraph(words: &[&str], width: usize, output: &mut ByteBuffer) {
    let mut line_start = 0;
    let mut line_width = 0;

    for (index, word) in words.iter().enumerate() {
        let word_width = word.chars().count();

        if index > line_start && line_width + 1 + word_width > width {
            let line = words.get(line_start..index).unwrap_or_default();
            write_line(line, line_width, Some(width), output);

            line_start = index;
            line_width = word_width;
        } else if index > line_start {
            line_width += 1 + word_width;
        } else {
            line_width = word_width;
        }
    }

    let last = words.get(line_start..).unwrap_or_default();
    write_line(last, line_width, None, output);
}

/// Writes one line of words separated by single spaces, padding it to `justify_to` if given.
#[expect(
    clippy::integer_division,
    reason = "spaces are whole, the remainder is handed out separately"
)]
fn write_line(
    words: &[&str],
    line_width: usize,
    justify_to: Option<usize>,
    output: &mut ByteBuffer,
) {
    let mut gaps = Vec::with_capacity(words.len());

    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            gaps.push(output.len());
            output.append(b" ");
        }

        output.append(word.as_bytes());
    }

    output.append(b"\n");

    let Some(width) = justify_to else {
        return;
    };

    if gaps.is_empty() || line_width >= width || line_width * 3 < width {
        return;
    }

    let padding = width - line_width;
    let count = gaps.len();
    let each = padding / count;
    let remainder = padding - each * count;

    // Inserting shifts every later gap, so work from the right.
    for (index, gap) in gaps.iter().enumerate().rev() {
        let from_right = count - 1 - index;
        let rank = (2 * index).min(2 * from_right + 1);
        let extra = each + usize::from(rank < remainder);

        if extra == 0 {
            continue;
        }

        output.insert_shift(*gap, extra);
        output
            .as_mut_bytes()
            .get_mut(*gap..*gap + extra)
            .expect("the gap was just opened inside the buffer")
            .fill(b' ');
    }
}

/// Runs `step` over the buffer from start to end, replacing the buffer with what it outputs.
///
/// `step` sees the unprocessed remainder, writes its replacement for some prefix of it and
/// returns how long that prefix was.
fn rewrite(buffer: &mut ByteBuffer, mut step: impl FnMut(&[u8], &mut Vec<u8>) -> usize) {
    let input = buffer.take();
    let mut output = Vec::with_capacity(input.len());
    let mut position = 0;

    while let Some(rest) = input.get(position..).filter(|rest| !rest.is_empty()) {
        position += step(rest, &mut output).max(1);
    }

    *buffer = ByteBuffer::from(output);
}

fn copy_one(rest: &[u8], output: &mut Vec<u8>) -> usize {
    output.extend(rest.first());
    1
}

fn numeric_reference_len(rest: &[u8]) -> Option<usize> {
    let digits = rest.strip_prefix(b"&#")?;

    let semicolon = digits
        .iter()
        .take(MAX_NUMERIC_REFERENCE)
        .position(|byte| *byte == b';')?;

    let body = digits.get(..semicolon)?;
    let body = body
        .strip_prefix(b"x")
        .or_else(|| body.strip_prefix(b"X"))
        .map_or(
            body.iter().all(u8::is_ascii_digit),
            |hex| hex.iter().all(u8::is_ascii_hexdigit),
        );

    (semicolon > 0 && body).then_some(semicolon + 3)
}
