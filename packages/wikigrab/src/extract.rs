use std::{fmt, iter};

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use slot_pool::{Handle, SlotPool};
use tracing::debug;

use crate::html::{self, OpenTag};
use crate::{ByteBuffer, ContentFragment, FragmentKind, Result, render_tex, text};

/// The opening tag of the element that holds the article body.
pub const CONTENT_MARKER: &[u8] = br#"<div id="mw-content-text""#;

// Page furniture that is not part of the article text.
const UNWANTED_CLASSES: &[&[u8]] = &[
    b"box-Multiple_issues",
    b"mw-references-wrap",
    b"toc",
    b"mw-empty-elt",
    b"mw-editsection",
    b"citation",
    b"infobox",
    b"navbox",
    b"box-Cleanup",
    b"box-Expand_language",
    b"hatnote",
    b"vertical-navbox",
    b"gallery",
    b"reflist",
    b"sidebar",
];

// Matched as prefixes, footnote ids carry a numeric suffix.
const UNWANTED_IDS: &[&[u8]] = &[
    b"cite_note-FOOTNOTE",
    b"See_also",
    b"Notes",
    b"References",
    b"External_links",
];

const FORMULA_SELECTOR: &str = r#"annotation[encoding="application/x-tex"]"#;

impl FragmentKind {
    const ALL: [Self; 6] = [
        Self::Paragraph,
        Self::DefinitionList,
        Self::Preformatted,
        Self::ListItem,
        Self::Formula,
        Self::Heading,
    ];

    fn selector(self) -> &'static str {
        match self {
            Self::Paragraph => "p",
            Self::DefinitionList => "dl",
            Self::Preformatted => "pre",
            Self::ListItem => "li",
            Self::Formula => FORMULA_SELECTOR,
            Self::Heading => "h2, h3, h4, .mw-headline",
        }
    }
}

/// Reduces an article page to its plain text.
///
/// The article body is cut out of the page and stripped of page furniture and reference
/// markers, then parsed. Every paragraph, list, preformatted block, formula and heading in it
/// is staged as a [`ContentFragment`] acquired from the fragment pool, with the TeX source of
/// any formula inside rendered as text in place of the formula markup. Once all kinds have
/// been collected, the fragments are put back in document order, written out separated by
/// blank lines and returned to the pool in a single sweep. The output is then cleaned up into
/// plain text and, if a line width is set, wrapped and justified.
///
/// Fragments nested in another fragment are skipped, since the outer one already holds their
/// markup.
pub struct ArticleExtractor {
    fragments: SlotPool<ContentFragment>,
    staged: Vec<Handle>,

    selectors: Vec<(FragmentKind, Selector)>,
    formula: Selector,

    line_width: usize,
}

impl ArticleExtractor {
    /// Creates an extractor with a default fragment pool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(SlotPool::new())
    }

    /// Creates an extractor that stages fragments in `fragments`.
    ///
    /// # Panics
    ///
    /// Panics if the pool already holds fragments.
    #[must_use]
    pub fn with_pool(fragments: SlotPool<ContentFragment>) -> Self {
        assert!(
            fragments.is_empty(),
            "extractor requires an empty fragment pool"
        );

        let selectors = FragmentKind::ALL
            .into_iter()
            .map(|kind| (kind, parse_selector(kind.selector())))
            .collect();

        Self {
            fragments,
            staged: Vec::new(),
            selectors,
            formula: parse_selector(FORMULA_SELECTOR),
            line_width: 0,
        }
    }

    /// Wraps and justifies the extracted text to `width` characters per line.
    ///
    /// A width of zero leaves the lines as the markup had them, which is the default.
    #[must_use]
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    /// The fragment pool, for inspecting its capacity and occupancy.
    #[must_use]
    pub fn pool(&self) -> &SlotPool<ContentFragment> {
        &self.fragments
    }

    /// Extracts the plain text of the article in `document`.
    ///
    /// If the document has no article body element, the whole document is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationExhausted`][crate::Error::AllocationExhausted] if the
    /// fragment pool cannot grow. No fragments stay staged after an error.
    pub fn extract(&mut self, document: &[u8]) -> Result<String> {
        let mut area = html::find_element(document, CONTENT_MARKER)
            .and_then(|(start, end)| document.get(start..end))
            .map_or_else(|| ByteBuffer::from(document), ByteBuffer::from);

        html::remove_comments(&mut area);
        html::remove_elements_where(&mut area, |tag| {
            matches!(tag.name, b"style" | b"script")
        });
        let removed = html::remove_elements_where(&mut area, is_unwanted);

        // Markers are recognized by their escaped form, which parsing would decode.
        text::drop_reference_markers(&mut area);
        text::blank_numeric_references(&mut area);

        let area = Html::parse_fragment(&String::from_utf8_lossy(area.as_bytes()));

        debug!(
            removed,
            nodes = area.root_element().descendants().count(),
            "article area parsed"
        );

        if let Err(error) = self.collect(&area) {
            self.staged.clear();
            self.fragments.release_all();
            return Err(error);
        }

        let mut output = self.flush();
        text::clean_up(&mut output);
        text::reflow(&mut output, self.line_width);

        Ok(String::from_utf8_lossy(output.as_bytes()).into_owned())
    }

    /// Stages one fragment per matching element, one kind at a time.
    fn collect(&mut self, area: &Html) -> Result<()> {
        for (kind, selector) in &self.selectors {
            for (position, node) in area.root_element().descendants().enumerate() {
                let Some(element) =
                    ElementRef::wrap(node).filter(|element| selector.matches(element))
                else {
                    continue;
                };

                let markup = render_formulas(element, &self.formula);

                let handle = self.fragments.acquire()?;
                self.staged.push(handle);

                let fragment = self.fragments.get_mut(handle);
                fragment.data.extend_from_slice(markup.as_bytes());
                fragment.offset = position;
                fragment.span = node.descendants().count();
                fragment.kind = *kind;
            }
        }

        Ok(())
    }

    /// Writes the staged fragments out in document order and returns them all to the pool.
    fn flush(&mut self) -> ByteBuffer {
        let mut output = ByteBuffer::new();
        let mut covered_until = 0;

        let ordered = self
            .staged
            .drain(..)
            .sorted_by_key(|handle| self.fragments.get(*handle).offset);

        for handle in ordered {
            let fragment = self.fragments.get(handle);

            if fragment.offset < covered_until {
                continue;
            }

            covered_until = fragment.offset.saturating_add(fragment.span);

            if !output.is_empty() {
                output.append(b"\n\n");
            }

            output.append(&fragment.data);
        }

        let released = self.fragments.release_all();
        debug!(fragments = released, bytes = output.len(), "fragments flushed");

        output
    }
}

impl Default for ArticleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ArticleExtractor {
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    #[cfg_attr(coverage_nightly, coverage(off))] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleExtractor")
            .field("fragments", &self.fragments)
            .field("staged", &self.staged.len())
            .field("line_width", &self.line_width)
            .finish_non_exhaustive()
    }
}

fn parse_selector(selector: &str) -> Selector {
    Selector::parse(selector).expect("fragment selectors are valid CSS")
}

fn is_unwanted(tag: &OpenTag<'_>) -> bool {
    UNWANTED_CLASSES.iter().any(|class| tag.has_class(class))
        || tag
            .attribute(b"id")
            .is_some_and(|id| UNWANTED_IDS.iter().any(|prefix| id.starts_with(prefix)))
}

/// Serializes `element`, replacing each formula in it with the text rendering of its TeX
/// annotation.
fn render_formulas(element: ElementRef<'_>, formula: &Selector) -> ByteBuffer {
    let mut markup = ByteBuffer::from(element.html().into_bytes());
    let mut searched = 0;

    let annotations = iter::once(element)
        .filter(|element| formula.matches(element))
        .chain(element.select(formula));

    for annotation in annotations {
        let replaced = formula_extent(annotation, element);
        let outer = replaced.html();

        let Some(at) = markup.find(outer.as_bytes(), searched) else {
            continue;
        };

        let rendered = render_tex(annotation.inner_html().as_bytes());
        markup.splice(at, outer.len(), rendered.as_bytes());

        searched = at.saturating_add(rendered.len());
    }

    markup
}

/// The `<math>` element around `annotation` inside `within`, so the presentation markup next
/// to the annotation goes too. Falls back to the annotation itself.
fn formula_extent<'a>(annotation: ElementRef<'a>, within: ElementRef<'a>) -> ElementRef<'a> {
    if annotation == within {
        return annotation;
    }

    annotation
        .ancestors()
        .take_while(|ancestor| *ancestor != *within)
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "math")
        .unwrap_or(annotation)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Rust - Wikipedia</title><style>.x{}</style></head>
<body><div id="siteNotice"><p>Donate!</p></div>
<div id="mw-content-text" class="mw-body-content"><div class="mw-parser-output">
<div class="hatnote">For other uses, see Rust (disambiguation).</div>
<table class="infobox"><tr><td><p>Infobox text</p></td></tr></table>
<p><b>Rust</b> is a language.<sup class="reference">&#91;1&#93;</sup></p>
<div class="mw-heading mw-heading2"><h2 id="History">History</h2><span class="mw-editsection">[edit]</span></div>
<p>It began &amp; grew.</p>
<ul><li>One <p>nested</p></li><li>Two</li></ul>
<dl><dd><math><semantics><annotation encoding="application/x-tex">x^2</annotation></semantics></math></dd></dl>
<pre>fn main() {}</pre>
<div class="navbox"><p>Nav</p></div>
</div></div>
<div id="footer"><p>Footer</p></div></body></html>"#;

    #[test]
    fn extracts_article_text_in_order() {
        let mut extractor = ArticleExtractor::new();

        let text = extractor.extract(PAGE.as_bytes()).unwrap();

        assert_eq!(
            text,
            "Rust is a language.\n\nHistory\n\nIt began & grew.\n\nOne nested\n\nTwo\n\nx^2\n\nfn main() {}\n"
        );
    }

    #[test]
    fn formulas_replace_their_markup() {
        let mut extractor = ArticleExtractor::new();

        let text = extractor
            .extract(
                br#"<p>Half is <math><semantics><mrow><mn>1</mn><mo>/</mo><mn>2</mn></mrow><annotation encoding="application/x-tex">{\displaystyle \frac{1}{2}}</annotation></semantics></math>.</p>
<dl><dd><math><semantics><mi>x</mi><annotation encoding="application/x-tex">\alpha \leq \beta</annotation></semantics></math></dd></dl>"#,
            )
            .unwrap();

        assert_eq!(text, "Half is 1/2.\n\nα ≤ β\n");
    }

    #[test]
    fn quoted_gt_in_attribute_is_not_text() {
        let mut extractor = ArticleExtractor::new();

        let text = extractor
            .extract(br#"<p><img alt="a > b">Caption</p>"#)
            .unwrap();

        assert_eq!(text, "Caption\n");
    }

    #[test]
    fn line_width_wraps_and_justifies() {
        let mut extractor = ArticleExtractor::new().with_line_width(10);

        let text = extractor
            .extract(b"<p>aaa bbb ccc ddd</p><p>eee</p>")
            .unwrap();

        assert_eq!(text, "aaa    bbb\nccc ddd\n\neee\n");
    }

    #[test]
    fn fragments_are_released_after_flush() {
        let mut extractor = ArticleExtractor::new();

        extractor.extract(PAGE.as_bytes()).unwrap();

        assert!(extractor.pool().is_empty());
        assert!(extractor.staged.is_empty());

        // The next document starts over at the lowest slot.
        extractor.extract(b"<p>again</p>").unwrap();
        assert!(extractor.pool().is_empty());
    }

    #[test]
    fn document_without_content_area_is_used_whole() {
        let mut extractor = ArticleExtractor::new();

        let text = extractor
            .extract(b"<body><p>First.</p><p>Second.</p></body>")
            .unwrap();

        assert_eq!(text, "First.\n\nSecond.\n");
    }

    #[test]
    fn kinds_collected_separately_are_put_in_document_order() {
        let mut extractor = ArticleExtractor::new();

        let text = extractor
            .extract(b"<li>a</li><p>b</p><pre>c</pre><p>d</p><li>e</li>")
            .unwrap();

        assert_eq!(text, "a\n\nb\n\nc\n\nd\n\ne\n");
    }

    #[test]
    fn many_fragments_survive_pool_growth() {
        let pool = SlotPool::builder().initial_capacity(1).build();
        let mut extractor = ArticleExtractor::with_pool(pool);

        let document = (0..50).map(|index| format!("<p>{index}</p>")).join("");
        let text = extractor.extract(document.as_bytes()).unwrap();

        let expected = (0..50).map(|index| index.to_string()).join("\n\n") + "\n";
        assert_eq!(text, expected);
        assert!(extractor.pool().capacity() >= 50);
    }

    #[test]
    fn exhausted_pool_leaves_nothing_staged() {
        let pool = SlotPool::builder()
            .initial_capacity(1)
            .max_capacity(2)
            .build();
        let mut extractor = ArticleExtractor::with_pool(pool);

        let result = extractor.extract(b"<p>1</p><p>2</p><p>3</p>");

        assert!(matches!(result, Err(crate::Error::AllocationExhausted(_))));
        assert!(extractor.pool().is_empty());
        assert!(extractor.staged.is_empty());
    }
}
