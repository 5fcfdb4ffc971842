//! Structural locators and text access over a parsed product page
//!
//! A [`Locator`] describes one place on a page where a field is expected to
//! appear. Field extractors hold ordered lists of locators and ask each one
//! for the text of its first match.

use scraper::{ElementRef, Html, Selector};

/// Elements whose text never counts as page content
const IGNORED_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements whose boundaries separate words in the page text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "head", "header", "hr", "html", "li", "main", "nav", "ol", "p", "pre", "section", "table",
    "tbody", "td", "tfoot", "th", "thead", "title", "tr", "ul",
];

/// Where on a page a field value is expected to appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// First element matching a CSS selector
    Css(&'static str),

    /// An element matching `labels` whose text contains `label`
    /// (case-insensitive), immediately followed by a sibling element named
    /// `value_tag`. The sibling holds the value.
    LabeledSibling {
        labels: &'static str,
        label: &'static str,
        value_tag: &'static str,
    },

    /// First element matching `selector` whose text contains `label`
    /// (case-insensitive)
    Containing {
        selector: &'static str,
        label: &'static str,
    },
}

impl Locator {
    /// Returns the whitespace-collapsed text of this locator's match
    ///
    /// `None` means nothing on the page matched. An invalid selector is
    /// treated the same way.
    pub fn find_text(&self, document: &Html) -> Option<String> {
        self.find(document).map(|element| element_text(&element))
    }

    fn find<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        match *self {
            Locator::Css(selector) => {
                let selector = Selector::parse(selector).ok()?;
                document.select(&selector).next()
            }
            Locator::LabeledSibling {
                labels,
                label,
                value_tag,
            } => {
                let selector = Selector::parse(labels).ok()?;
                document
                    .select(&selector)
                    .filter(|element| contains_ignore_case(&element_text(element), label))
                    .find_map(|element| {
                        next_element_sibling(&element)
                            .filter(|sibling| sibling.value().name() == value_tag)
                    })
            }
            Locator::Containing { selector, label } => {
                let selector = Selector::parse(selector).ok()?;
                document
                    .select(&selector)
                    .find(|element| contains_ignore_case(&element_text(element), label))
            }
        }
    }
}

/// Returns the text of an element with whitespace runs collapsed and trimmed
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Returns the visible text of the whole document
///
/// Script and style contents are skipped. Block boundaries and `<br>` become
/// a space; text inside inline elements is joined as written, so
/// `<b>978</b>8535914849` reads as one token.
pub fn document_text(document: &Html) -> String {
    enum Step<'a> {
        Visit(ElementRef<'a>),
        Text(&'a str),
        Break,
    }

    let mut out = String::new();
    let mut stack = vec![Step::Visit(document.root_element())];

    while let Some(step) = stack.pop() {
        match step {
            Step::Break => out.push(' '),
            Step::Text(text) => out.push_str(text),
            Step::Visit(element) => {
                let name = element.value().name();
                if IGNORED_TEXT_PARENTS.contains(&name) {
                    continue;
                }

                if BLOCK_ELEMENTS.contains(&name) {
                    out.push(' ');
                    stack.push(Step::Break);
                }

                // Reversed so children pop in document order
                for child in element.children().rev() {
                    if let Some(text) = child.value().as_text() {
                        stack.push(Step::Text(&**text));
                    } else if let Some(child) = ElementRef::wrap(child) {
                        stack.push(Step::Visit(child));
                    }
                }
            }
        }
    }

    collapse_whitespace(&out)
}

/// Tries each locator in order and returns the first normalized value
///
/// A locator whose match has empty text is skipped without calling
/// `normalize`. The first `Some` returned by `normalize` wins.
pub fn first_accepted<T>(
    document: &Html,
    locators: &[Locator],
    mut normalize: impl FnMut(&str) -> Option<T>,
) -> Option<T> {
    locators.iter().find_map(|locator| {
        let text = locator.find_text(document)?;
        if text.is_empty() {
            return None;
        }

        let value = normalize(&text);
        if value.is_none() {
            tracing::debug!("Locator {:?} matched but text was rejected: {:?}", locator, text);
        }
        value
    })
}

fn next_element_sibling<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
