use std::fmt;

use http::StatusCode;
use scraper::{Html, Selector};
use slot_pool::{Handle, SlotPool};

use crate::{
    ArticleExtractor, Connector, HttpClient, MetaValue, ResponseHeaders, Result, Target, Verb,
};

/// The metadata of one fetched page.
///
/// Each value is a [`MetaValue`] acquired from the value pool under a referee naming the field
/// that holds its handle, so the pool can report which field owns which slot.
pub struct ArticleMetadata {
    values: SlotPool<MetaValue>,

    title_selector: Selector,
    generator_selector: Selector,

    title: Option<Handle>,
    generator: Option<Handle>,
    server: Option<Handle>,
    date: Option<Handle>,
    last_modified: Option<Handle>,
}

impl ArticleMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: SlotPool::new(),
            title_selector: Selector::parse("title").expect("metadata selectors are valid CSS"),
            generator_selector: Selector::parse(r#"meta[name="generator"]"#)
                .expect("metadata selectors are valid CSS"),
            title: None,
            generator: None,
            server: None,
            date: None,
            last_modified: None,
        }
    }

    /// Replaces the metadata with what `document` and the response `headers` say.
    ///
    /// The title has any ` - Wikipedia` style suffix removed. The generator comes from the
    /// `generator` meta tag. The server, date and last modification time come from headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationExhausted`][crate::Error::AllocationExhausted] if the value
    /// pool cannot grow.
    pub fn gather(&mut self, document: &[u8], headers: &ResponseHeaders) -> Result<()> {
        self.clear();

        let page = Html::parse_document(&String::from_utf8_lossy(document));

        let title = page
            .select(&self.title_selector)
            .next()
            .map(|title| page_title(&title.text().collect::<String>()));

        let generator = page
            .select(&self.generator_selector)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .map(str::to_owned);

        if let Some(title) = title {
            self.title = Some(self.store("article.title", &title)?);
        }

        if let Some(generator) = generator {
            self.generator = Some(self.store("article.generator", &generator)?);
        }

        if let Some(server) = headers.get("server") {
            self.server = Some(self.store("response.server", server)?);
        }

        if let Some(date) = headers.get("date") {
            self.date = Some(self.store("response.date", date)?);
        }

        if let Some(last_modified) = headers.get("last-modified") {
            self.last_modified = Some(self.store("response.last_modified", last_modified)?);
        }

        Ok(())
    }

    fn store(&mut self, referee: &'static str, value: &str) -> Result<Handle> {
        let handle = self.values.acquire_tracked(referee)?;
        self.values.get_mut(handle).value.push_str(value);
        Ok(handle)
    }

    fn value(&self, handle: Option<Handle>) -> Option<&str> {
        handle.map(|handle| self.values.get(handle).value.as_str())
    }

    /// The page title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.value(self.title)
    }

    /// The software that generated the page.
    #[must_use]
    pub fn generator(&self) -> Option<&str> {
        self.value(self.generator)
    }

    /// The `Server` response header.
    #[must_use]
    pub fn server(&self) -> Option<&str> {
        self.value(self.server)
    }

    /// The `Date` response header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.value(self.date)
    }

    /// The `Last-Modified` response header.
    #[must_use]
    pub fn last_modified(&self) -> Option<&str> {
        self.value(self.last_modified)
    }

    /// Every present value, paired with the name of the field that holds it, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.values.iter().map(|(handle, value)| {
            let referee = self
                .values
                .referee_of(handle)
                .expect("every metadata value is acquired with a referee");

            (referee, value.value.as_str())
        })
    }

    /// Forgets every value.
    pub fn clear(&mut self) {
        self.title = None;
        self.generator = None;
        self.server = None;
        self.date = None;
        self.last_modified = None;
        self.values.release_all();
    }
}

impl Default for ArticleMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ArticleMetadata {
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    #[cfg_attr(coverage_nightly, coverage(off))] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Cuts the site name off the `<title>` text.
fn page_title(title: &str) -> String {
    let title = title
        .find(" - Wiki")
        .map_or(title, |suffix| title.get(..suffix).unwrap_or_default());

    title.trim().to_owned()
}

/// A fetched page reduced to plain text.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct Article {
    /// The URL the final response came from.
    pub target: Target,

    /// The status of the final response.
    pub status: StatusCode,

    /// The page title.
    pub title: Option<String>,

    /// The `Last-Modified` response header.
    pub last_modified: Option<String>,

    /// The article text. Empty for `HEAD` requests.
    pub text: String,
}

/// Fetches pages and reduces them to articles, reusing its connection and pools across
/// fetches.
#[derive(Debug)]
pub struct WikiGrabber<C: Connector> {
    client: HttpClient<C>,
    extractor: ArticleExtractor,
    metadata: ArticleMetadata,
}

impl<C: Connector> WikiGrabber<C> {
    /// Creates a grabber that sends its requests through `client`.
    #[must_use]
    pub fn new(client: HttpClient<C>) -> Self {
        Self::with_extractor(client, ArticleExtractor::new())
    }

    /// Creates a grabber that sends its requests through `client` and reduces pages with
    /// `extractor`.
    #[must_use]
    pub fn with_extractor(client: HttpClient<C>, extractor: ArticleExtractor) -> Self {
        Self {
            client,
            extractor,
            metadata: ArticleMetadata::new(),
        }
    }

    /// The HTTP client, for inspecting the last request and response headers.
    #[must_use]
    pub fn client(&self) -> &HttpClient<C> {
        &self.client
    }

    /// The metadata of the most recently fetched page.
    #[must_use]
    pub fn metadata(&self) -> &ArticleMetadata {
        &self.metadata
    }

    /// Fetches `target`, following redirects, and extracts the article text.
    ///
    /// # Errors
    ///
    /// Returns any error from the HTTP exchange or from staging records.
    pub fn fetch(&mut self, target: &Target) -> Result<Article> {
        let response = self.client.follow_redirects_until_final(target)?;

        self.metadata.gather(response.body(), self.client.headers())?;

        let text = if self.client.options().verb() == Verb::Head {
            String::new()
        } else {
            self.extractor.extract(response.body())?
        };

        Ok(Article {
            target: response.target().clone(),
            status: response.status(),
            title: self.metadata.title().map(str::to_owned),
            last_modified: self.metadata.last_modified().map(str::to_owned),
            text,
        })
    }
}
