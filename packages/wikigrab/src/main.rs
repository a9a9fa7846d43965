#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the wikigrab tool.
//!
//! This module is excluded from mutation testing because it needs a live server to do
//! anything observable.

use std::io::{self, Write};
use std::process::ExitCode;

use argh::FromArgs;
use tracing::Level;
use wikigrab::{
    ArticleExtractor, ClientOptions, DEFAULT_LINE_WIDTH, DEFAULT_MAX_REDIRECTS, HttpClient,
    Target, TcpConnector, Verb, WikiGrabber, reason,
};

/// Fetch a Wikipedia article and print it as plain text.
#[derive(FromArgs)]
struct Args {
    /// print the request header to stderr
    #[argh(switch, short = 'Q')]
    request_header: bool,

    /// print the response headers to stderr
    #[argh(switch, short = 'S')]
    response_headers: bool,

    /// connect over plain HTTP instead of HTTPS, which is the default when built with TLS
    #[argh(switch)]
    plain: bool,

    /// send a HEAD request and print only the status and headers
    #[argh(switch)]
    head: bool,

    /// log progress to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// how many redirects to follow before giving up
    #[argh(option)]
    max_redirects: Option<usize>,

    /// wrap and justify the text to this many characters per line, 0 to keep lines unwrapped
    #[argh(option, default = "DEFAULT_LINE_WIDTH")]
    width: usize,

    /// the article URL, such as en.wikipedia.org/wiki/Rust_(programming_language)
    #[argh(positional)]
    url: String,
}

// Binary entry point - mutations would require a live server to observe.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    let args: Args = argh::from_env();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_writer(io::stderr)
        .init();

    let target = match Target::parse(&args.url) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut grabber = WikiGrabber::with_extractor(
        HttpClient::new(TcpConnector::new(), client_options(&args)),
        ArticleExtractor::new().with_line_width(args.width),
    );

    let result = grabber.fetch(&target);

    let client = grabber.client();

    if args.request_header {
        eprint!("{}", client.last_request_header());
    }

    if args.response_headers || args.head {
        for header in client.headers().iter() {
            eprintln!("{}: {}", header.name, header.value);
        }
        eprintln!();
    }

    let article = match result {
        Ok(article) => article,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if !article.status.is_success() {
        eprintln!(
            "{} {} from {}",
            article.status.as_u16(),
            reason(article.status),
            article.target
        );
    }

    let mut stdout = io::stdout().lock();

    let written = match &article.title {
        Some(title) if !args.head => write!(stdout, "{title}\n\n{}", article.text),
        _ => write!(stdout, "{}", article.text),
    };

    if let Err(e) = written.and_then(|()| stdout.flush()) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    if article.status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// HTTPS is only requested when the build can speak it.
fn client_options(args: &Args) -> ClientOptions {
    let secure = ClientOptions::default().secure() && !args.plain;

    ClientOptions::builder()
        .secure(secure)
        .max_redirects(args.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS))
        .verb(if args.head { Verb::Head } else { Verb::Get })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "en.wikipedia.org/wiki/Rust";

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["wikigrab"], args).unwrap()
    }

    #[test]
    fn secure_only_when_tls_is_built_in() {
        let options = client_options(&parse(&[URL]));

        assert_eq!(options.secure(), cfg!(feature = "tls"));
    }

    #[test]
    fn plain_switch_disables_tls() {
        let options = client_options(&parse(&["--plain", URL]));

        assert!(!options.secure());
    }

    #[test]
    fn head_and_redirect_limit() {
        let options = client_options(&parse(&["--head", "--max-redirects", "2", URL]));

        assert_eq!(options.verb(), Verb::Head);
        assert_eq!(options.max_redirects(), 2);

        let options = client_options(&parse(&[URL]));

        assert_eq!(options.verb(), Verb::Get);
        assert_eq!(options.max_redirects(), DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn width_defaults_to_standard_line() {
        assert_eq!(parse(&[URL]).width, DEFAULT_LINE_WIDTH);
        assert_eq!(parse(&["--width", "0", URL]).width, 0);
    }
}
