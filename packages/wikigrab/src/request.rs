use crate::{Target, Verb};

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Builds the head of a request for `target`.
///
/// A `GET` asks for HTML and keeps the connection alive. A `HEAD` carries only the host and
/// user agent. Every cookie pair becomes its own `Cookie` line.
pub(crate) fn build_request<'a>(
    verb: Verb,
    target: &Target,
    user_agent: &str,
    cookies: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut request = format!(
        "{verb} {page} HTTP/1.1\r\nHost: {host}\r\nUser-Agent: {user_agent}\r\n",
        page = target.page(),
        host = target.host_header(),
    );

    if verb == Verb::Get {
        request.push_str("Accept: ");
        request.push_str(ACCEPT);
        request.push_str("\r\nConnection: keep-alive\r\n");
    }

    for pair in cookies {
        request.push_str("Cookie: ");
        request.push_str(pair);
        request.push_str("\r\n");
    }

    request.push_str("\r\n");
    request
}
