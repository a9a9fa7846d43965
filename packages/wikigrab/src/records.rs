//! Value types staged in slot pools while a response is processed.

use slot_pool::Recyclable;

/// One response header line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HeaderRecord {
    /// The header name, lowercased.
    pub name: String,

    /// The header value with leading spaces removed.
    pub value: String,
}

impl Recyclable for HeaderRecord {
    fn reset(&mut self) {
        self.name.clear();
        self.value.clear();
    }

    fn release(&mut self) {
        self.name = String::new();
        self.value = String::new();
    }
}

/// One cookie received in a `Set-Cookie` header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CookieRecord {
    /// The `name=value` pair exactly as received.
    pub pair: String,

    /// The `expires` attribute as Unix seconds, if present and parseable.
    pub expires: Option<i64>,

    /// The `domain` attribute, if present.
    pub domain: Option<String>,

    /// The `path` attribute, if present.
    pub path: Option<String>,
}

impl CookieRecord {
    /// The cookie name, the part of the pair before `=`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.pair
            .split_once('=')
            .map_or(self.pair.as_str(), |(name, _)| name)
    }
}

impl Recyclable for CookieRecord {
    fn reset(&mut self) {
        self.pair.clear();
        self.expires = None;
        self.domain = None;
        self.path = None;
    }
}

/// The kind of markup a content fragment was extracted from.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum FragmentKind {
    /// A `<p>` paragraph.
    #[default]
    Paragraph,

    /// A `<dl>` definition list.
    DefinitionList,

    /// A `<pre>` preformatted block.
    Preformatted,

    /// A `<li>` list item.
    ListItem,

    /// A MathML formula, found by its TeX `<annotation>`.
    Formula,

    /// A section heading.
    Heading,
}

/// One HTML fragment cut out of the article, tagged with its position in the source.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContentFragment {
    /// The markup of the fragment, with any formulas in it already rendered as text.
    pub data: Vec<u8>,

    /// Position of the fragment's element among all nodes of the article, in document order.
    pub offset: usize,

    /// How many nodes the fragment's element covers, itself included. Fragments whose offset
    /// falls in `offset..offset + span` are nested inside this one.
    pub span: usize,

    /// The markup the fragment was extracted from.
    pub kind: FragmentKind,
}

impl Recyclable for ContentFragment {
    fn reset(&mut self) {
        // Keep the allocation, the next fragment is usually of similar size.
        self.data.clear();
        self.offset = 0;
        self.span = 0;
        self.kind = FragmentKind::default();
    }

    fn release(&mut self) {
        self.data = Vec::new();
    }
}

/// A single piece of document metadata.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MetaValue {
    /// The metadata text.
    pub value: String,
}

impl Recyclable for MetaValue {
    fn reset(&mut self) {
        self.value.clear();
    }

    fn release(&mut self) {
        self.value = String::new();
    }
}
