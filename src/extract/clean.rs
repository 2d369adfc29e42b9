//! Text cleanup for extracted values
//!
//! Entities are decoded by the HTML parser itself, so cleaning an element
//! means walking its text nodes, skipping script-like blocks, and collapsing
//! whitespace. Attribute values come out of the parser decoded and only
//! need their whitespace collapsed.

use ego_tree::NodeRef;
use scraper::{ElementRef, Node};

/// Elements whose content is never part of a value
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that separate words even without surrounding whitespace
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th",
    "tr", "ul",
];

/// Collapses every run of whitespace into a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the cleaned text content of an element
///
/// # Example
///
/// ```
/// use scraper::{Html, Selector};
/// use sumi_harvest::extract::clean::element_text;
///
/// let html = Html::parse_fragment("<p>Fish &amp;\n  <b>chips</b><script>x()</script></p>");
/// let p = html.select(&Selector::parse("p").unwrap()).next().unwrap();
/// assert_eq!(element_text(p), "Fish & chips");
/// ```
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(*element, &mut raw);
    collapse_whitespace(&raw)
}

fn push_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push(' ');
                }
                push_text(child, out);
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}
