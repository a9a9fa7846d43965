//! Byte-level scanning of HTML markup.
//!
//! This is not a parser. It finds tags by name, matches opening and closing tags of the same
//! name by nesting depth and reads attribute values, which is enough to cut the article body
//! out of generated markup and delete page furniture from it in place before it is parsed.

#![expect(
    clippy::arithmetic_side_effects,
    reason = "offsets never exceed the length of the document being scanned"
)]

use crate::ByteBuffer;
use crate::buffer::find_bytes;

// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
    b"source", b"track", b"wbr",
];

/// An opening tag found in a document.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct OpenTag<'a> {
    /// Offset of the `<`.
    pub(crate) start: usize,

    /// Offset just past the `>`.
    pub(crate) end: usize,

    pub(crate) name: &'a [u8],

    // Everything between the name and the closing `>`.
    attributes: &'a [u8],
}

impl<'a> OpenTag<'a> {
    /// Reads the opening tag that starts at `start`, if there is one.
    pub(crate) fn at(doc: &'a [u8], start: usize) -> Option<Self> {
        let rest = doc.get(start..)?;

        if rest.first() != Some(&b'<') {
            return None;
        }

        let name_len = rest
            .iter()
            .skip(1)
            .take_while(|byte| byte.is_ascii_alphanumeric())
            .count();

        if name_len == 0 {
            return None;
        }

        let end = tag_end(doc, start)?;

        let name = rest.get(1..=name_len)?;
        let attributes = doc.get(start + 1 + name_len..end - 1)?;

        Some(Self {
            start,
            end,
            name,
            attributes,
        })
    }

    /// The value of an attribute, without its quotes.
    pub(crate) fn attribute(&self, name: &[u8]) -> Option<&'a [u8]> {
        attribute_value(self.attributes, name)
    }

    /// Whether the `class` attribute lists `class`.
    pub(crate) fn has_class(&self, class: &[u8]) -> bool {
        self.attribute(b"class").is_some_and(|classes| {
            classes
                .split(u8::is_ascii_whitespace)
                .any(|candidate| candidate == class)
        })
    }

    fn is_self_closing(&self) -> bool {
        self.attributes.ends_with(b"/") || VOID_ELEMENTS.contains(&self.name)
    }
}

/// Finds the `>` that ends the tag starting at `start`, skipping quoted attribute values.
/// Returns the offset just past it.
pub(crate) fn tag_end(doc: &[u8], start: usize) -> Option<usize> {
    let mut quote = None;

    for (offset, byte) in doc.get(start..)?.iter().enumerate() {
        match (quote, *byte) {
            (None, b'"' | b'\'') => quote = Some(*byte),
            (Some(open), _) if open == *byte => quote = None,
            (None, b'>') => return Some(start + offset + 1),
            _ => {}
        }
    }

    None
}

/// Finds the next tag named `name` at or after `from`, opening or closing depending on
/// `closing`. Names must match exactly and be followed by a tag boundary, so looking for `p`
/// does not find `<pre>`.
fn find_tag(doc: &[u8], name: &[u8], closing: bool, from: usize) -> Option<usize> {
    let mut pattern = Vec::with_capacity(name.len() + 2);
    pattern.extend_from_slice(if closing { b"</" } else { b"<" });
    pattern.extend_from_slice(name);

    let mut position = from;

    loop {
        let found = position + find_bytes(doc.get(position..)?, &pattern)?;
        let after = doc.get(found + pattern.len());

        if matches!(
            after,
            None | Some(b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/')
        ) {
            return Some(found);
        }

        position = found + 1;
    }
}

/// Returns the offset just past the end of the element whose opening tag starts at `start`.
///
/// Nested elements of the same name are matched up, so the closing tag found is the one that
/// belongs to this element. Void and self-closing elements end at their opening tag. Returns
/// `None` if the element is never closed.
pub(crate) fn element_end(doc: &[u8], start: usize) -> Option<usize> {
    let tag = OpenTag::at(doc, start)?;

    if tag.is_self_closing() {
        return Some(tag.end);
    }

    let mut depth = 1_usize;
    let mut position = tag.end;

    loop {
        let close = find_tag(doc, tag.name, true, position)?;

        match find_tag(doc, tag.name, false, position) {
            Some(open) if open < close => {
                depth += 1;
                position = open + 1;
            }
            _ => {
                depth -= 1;
                position = tag_end(doc, close)?;

                if depth == 0 {
                    return Some(position);
                }
            }
        }
    }
}

/// Finds the first element whose opening tag starts with `marker`, such as
/// `<div id="content"`, and returns its whole extent.
pub(crate) fn find_element(doc: &[u8], marker: &[u8]) -> Option<(usize, usize)> {
    let mut position = 0;

    loop {
        let start = position + find_bytes(doc.get(position..)?, marker)?;

        if let Some(end) = element_end(doc, start) {
            return Some((start, end));
        }

        position = start + 1;
    }
}

/// Removes every element for which `unwanted` returns `true`, including everything inside it.
///
/// Returns the number of elements removed.
pub(crate) fn remove_elements_where(
    buffer: &mut ByteBuffer,
    unwanted: impl Fn(&OpenTag<'_>) -> bool,
) -> usize {
    let mut removed = 0;
    let mut position = 0;

    while let Some(lt) = buffer.find_byte(b'<', position) {
        let doc = buffer.as_bytes();

        let extent = match OpenTag::at(doc, lt) {
            Some(tag) if unwanted(&tag) => Ok((lt, element_end(doc, lt).unwrap_or(tag.end))),
            Some(tag) => Err(tag.end),
            None => Err(lt + 1),
        };

        match extent {
            Ok((start, end)) => {
                buffer.delete_collapse(start, end - start);
                removed += 1;
                position = start;
            }
            Err(next) => position = next,
        }
    }

    removed
}

/// Removes every `<!-- ... -->` comment. An unterminated comment runs to the end.
pub(crate) fn remove_comments(buffer: &mut ByteBuffer) {
    while let Some(start) = buffer.find(b"<!--", 0) {
        let end = buffer
            .find(b"-->", start + 4)
            .map_or(buffer.len(), |close| close + 3);

        buffer.delete_collapse(start, end - start);
    }
}

fn attribute_value<'a>(attributes: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let mut position = 0;

    loop {
        let found = position + find_bytes(attributes.get(position..)?, name)?;
        position = found + 1;

        let preceded_by_space = found
            .checked_sub(1)
            .and_then(|before| attributes.get(before))
            .is_some_and(u8::is_ascii_whitespace);

        if !preceded_by_space {
            continue;
        }

        let rest = attributes.get(found + name.len()..)?;
        let Some(rest) = rest.strip_prefix(b"=") else {
            continue;
        };

        return Some(match rest.first() {
            Some(quote @ (b'"' | b'\'')) => {
                let value = rest.get(1..)?;
                let len = value.iter().position(|byte| byte == quote)?;
                value.get(..len)?
            }
            _ => {
                let len = rest
                    .iter()
                    .position(|byte| byte.is_ascii_whitespace() || *byte == b'/')
                    .unwrap_or(rest.len());
                rest.get(..len)?
            }
        });
    }
}
