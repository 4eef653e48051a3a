//! HTML → visible-text reduction for fetched result pages.
//!
//! The extraction model wants prose, not markup. This strips scripts,
//! styles, and chrome elements, keeps visible text with block-level line
//! breaks, and collapses the leftover whitespace.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Elements whose entire subtree is invisible or navigational noise.
const SKIP_TAGS: [&str; 8] = [
    "script", "style", "noscript", "template", "svg", "nav", "iframe", "footer",
];

/// Elements that end a visual line.
const BLOCK_TAGS: [&str; 13] = [
    "p", "div", "section", "article", "li", "tr", "br", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Reduce an HTML document to its visible text.
pub(crate) fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    // Prefer the main content element when the page marks one.
    let root = ["main", "article", "body"]
        .into_iter()
        .find_map(|tag| {
            let selector = Selector::parse(tag).expect("valid selector");
            doc.select(&selector).next()
        });

    let mut out = String::new();
    match root {
        Some(el) => collect_text(el, &mut out),
        None => {
            for el in doc.root_element().child_elements() {
                collect_text(el, &mut out);
            }
        }
    }

    collapse_whitespace(&out)
}

/// Recursively collect visible text, skipping invisible subtrees.
fn collect_text(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if SKIP_TAGS.contains(&name) {
        return;
    }

    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push_str(trimmed);
                out.push(' ');
            }
        }
    }

    if BLOCK_TAGS.contains(&name) {
        out.push('\n');
    }
}

/// Trim line-level whitespace and collapse runs of blank lines.
fn collapse_whitespace(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let trimmed_lines = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    MULTI_BLANK_RE
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_paragraph_text() {
        let html = "<html><body><p>Hello world.</p><p>Second line.</p></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Hello world."));
        assert!(text.contains("Second line."));
    }

    #[test]
    fn skips_scripts_and_styles() {
        let html = "<html><head><style>body { color: red }</style></head>\
                    <body><script>var x = 1;</script><p>Visible</p></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Visible"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn prefers_main_over_chrome() {
        let html = "<html><body>\
                    <nav>Home | About</nav>\
                    <main><h1>Acme</h1><p>Contact: info@acme.com</p></main>\
                    <footer>© Acme</footer>\
                    </body></html>";
        let text = html_to_text(html);
        assert!(text.contains("info@acme.com"));
        assert!(!text.contains("Home | About"));
        assert!(!text.contains("© Acme"));
    }

    #[test]
    fn block_elements_break_lines() {
        let html = "<html><body><p>One</p><p>Two</p></body></html>";
        let text = html_to_text(html);
        assert_eq!(text, "One\nTwo");
    }

    #[test]
    fn collapses_blank_runs() {
        let input = "a\n\n\n\n\nb";
        assert_eq!(collapse_whitespace(input), "a\n\nb");
    }
}
