use http::StatusCode;

use crate::{Error, Result};

/// Parses the status code out of the first line of a response head.
///
/// # Errors
///
/// Returns [`Error::ProtocolMalformed`] if the line has no three-digit status code.
pub(crate) fn parse_status_line(head: &[u8]) -> Result<StatusCode> {
    let line = head
        .split(|byte| *byte == b'\n')
        .next()
        .unwrap_or_default();

    let code = line
        .split(|byte| *byte == b' ')
        .filter(|part| !part.is_empty())
        .nth(1)
        .ok_or_else(|| Error::malformed("status line has no status code"))?;

    let code = code.strip_suffix(b"\r").unwrap_or(code);

    if code.len() != 3 {
        return Err(Error::malformed(format!(
            "status code '{}' is not three digits",
            String::from_utf8_lossy(code)
        )));
    }

    StatusCode::from_bytes(code).map_err(|error| Error::malformed(error.to_string()))
}

/// The canonical reason phrase for a status code, such as `Not Found` for 404.
#[must_use]
pub fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Status")
}

/// Whether the status asks the client to repeat the request at the `Location` URL.
#[must_use]
pub fn is_followable_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Whether a response with this status never has a body, regardless of its headers.
pub(crate) fn has_no_body(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parses_status_lines() {
        assert_eq!(
            parse_status_line(b"HTTP/1.1 200 OK\r\nServer: x").unwrap(),
            StatusCode::OK
        );
        assert_eq!(
            parse_status_line(b"HTTP/1.1 301 Moved Permanently").unwrap(),
            StatusCode::MOVED_PERMANENTLY
        );
        assert_eq!(
            parse_status_line(b"HTTP/1.0 404\r\n").unwrap(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn rejects_bad_status_lines() {
        assert!(parse_status_line(b"HTTP/1.1").is_err());
        assert!(parse_status_line(b"HTTP/1.1 2000 Huge").is_err());
        assert!(parse_status_line(b"HTTP/1.1 abc Words").is_err());
    }

    #[test]
    fn reasons() {
        assert_eq!(reason(StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(reason(StatusCode::from_u16(599).unwrap()), "Unknown Status");
    }

    #[test]
    fn redirect_and_bodyless_classes() {
        assert!(is_followable_redirect(StatusCode::FOUND));
        assert!(is_followable_redirect(StatusCode::PERMANENT_REDIRECT));
        assert!(!is_followable_redirect(StatusCode::NOT_MODIFIED));

        assert!(has_no_body(StatusCode::CONTINUE));
        assert!(has_no_body(StatusCode::NO_CONTENT));
        assert!(has_no_body(StatusCode::NOT_MODIFIED));
        assert!(!has_no_body(StatusCode::OK));
    }
}
