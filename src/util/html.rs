use std::borrow::Cow;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use super::text::strip_control_chars;

/// Plain-text rendition of a server-rendered entry fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedEntry {
    pub title: String,
    /// Logical lines of the body, unwrapped. Blank lines separate blocks.
    pub body: Vec<String>,
    /// Target of the entry's permalink, if the fragment has one.
    pub link: Option<String>,
}

/// Elements that carry no readable content in a terminal.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "iframe", "template", "form", "input", "button", "select",
    "textarea", "label",
];

const BLOCKS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "header",
    "footer",
    "nav",
    "figure",
    "figcaption",
    "table",
    "tr",
    "blockquote",
    "address",
    "ul",
    "ol",
    "pre",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
];

/// Parse an entry fragment into a title, body lines and permalink.
///
/// The title is the first `h1`-`h3` heading, falling back to the permalink's
/// text. The permalink is the first `a.yarr-link`, otherwise the first anchor
/// with a followable `href`.
pub fn render_entry(html: &str) -> RenderedEntry {
    let fragment = Html::parse_fragment(html);

    let heading = select_first(&fragment, "h1, h2, h3");
    let permalink =
        select_first(&fragment, "a.yarr-link[href]").or_else(|| first_followable(&fragment));

    let title_source = heading.or(permalink);
    let title = title_source
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "(untitled)".to_string());

    let link = permalink
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string());

    let mut writer = TextWriter::default();
    writer.visit_children(fragment.root_element(), title_source);

    RenderedEntry {
        title: strip_control_chars(&title).into_owned(),
        body: writer.into_lines(),
        link,
    }
}

/// Resolve HTML character references in an escaped text field.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let fragment = Html::parse_fragment(s);
    Cow::Owned(fragment.root_element().text().collect())
}

fn select_first<'a>(fragment: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    fragment.select(&selector).next()
}

fn first_followable(fragment: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("a[href]").ok()?;
    fragment.select(&selector).find(|el| {
        el.value()
            .attr("href")
            .map(|href| is_followable(href.trim()))
            .unwrap_or(false)
    })
}

fn is_followable(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    !(href.is_empty() || lower.starts_with('#') || lower.starts_with("javascript:"))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Default)]
struct TextWriter {
    lines: Vec<String>,
    line: String,
    preformatted: usize,
}

impl TextWriter {
    fn visit_children<'a>(&mut self, element: ElementRef<'a>, skip: Option<ElementRef<'a>>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.visit_element(el, skip);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_element<'a>(&mut self, element: ElementRef<'a>, skip: Option<ElementRef<'a>>) {
        let tag = element.value().name();
        if Some(element) == skip || SKIPPED.contains(&tag) {
            return;
        }
        match tag {
            "br" => self.break_line(),
            "hr" => {
                self.break_block();
                self.line.push_str("----");
                self.break_block();
            }
            "li" => {
                self.break_line();
                self.line.push_str("• ");
                self.visit_children(element, skip);
                self.break_line();
            }
            "img" => {
                if let Some(alt) = element.value().attr("alt").filter(|a| !a.trim().is_empty()) {
                    self.push_text(&format!("[image: {}]", alt.trim()));
                }
            }
            "pre" => {
                self.break_block();
                self.preformatted += 1;
                self.visit_children(element, skip);
                self.preformatted -= 1;
                self.break_block();
            }
            tag if BLOCKS.contains(&tag) => {
                self.break_block();
                self.visit_children(element, skip);
                self.break_block();
            }
            _ => self.visit_children(element, skip),
        }
    }

    fn push_text(&mut self, text: &str) {
        let text = strip_control_chars(text);
        if self.preformatted > 0 {
            let mut parts = text.split('\n');
            if let Some(first) = parts.next() {
                self.line.push_str(first);
            }
            for part in parts {
                self.break_line();
                self.line.push_str(part);
            }
            return;
        }
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !self.line.is_empty() && !self.line.ends_with(' ') {
                    self.line.push(' ');
                }
            } else {
                self.line.push(ch);
            }
        }
    }

    fn break_line(&mut self) {
        let line = std::mem::take(&mut self.line);
        let line = line.trim_end();
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
    }

    /// End the current line and leave one blank separator line.
    fn break_block(&mut self) {
        self.break_line();
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn into_lines(mut self) -> Vec<String> {
        self.break_line();
        while self.lines.last().is_some_and(String::is_empty) {
            self.lines.pop();
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ENTRY: &str = r#"
        <div class="yarr_entry_header">
            <h2><a href="https://example.com/post" class="yarr-link">A &amp; B</a></h2>
            <p class="yarr_entry_meta">Example Feed</p>
        </div>
        <div class="yarr_entry_content">
            <p>First   paragraph
               continues.</p>
            <ul><li>one</li><li>two</li></ul>
            <script>alert(1)</script>
        </div>
        <div class="yarr_entry_control">
            <form><label><input type="checkbox" name="read"> Read</label></form>
        </div>
    "#;

    #[test]
    fn test_render_entry_title_and_link() {
        let entry = render_entry(ENTRY);
        assert_eq!(entry.title, "A & B");
        assert_eq!(entry.link.as_deref(), Some("https://example.com/post"));
    }

    #[test]
    fn test_render_entry_body_excludes_title_and_controls() {
        let entry = render_entry(ENTRY);
        assert_eq!(
            entry.body,
            vec![
                "Example Feed".to_string(),
                String::new(),
                "First paragraph continues.".to_string(),
                String::new(),
                "• one".to_string(),
                "• two".to_string(),
            ]
        );
    }

    #[test]
    fn test_link_falls_back_to_first_followable_anchor() {
        let html = r##"<p><a href="#top">top</a> <a href="javascript:x()">x</a>
            <a href="https://example.org/">real</a></p>"##;
        let entry = render_entry(html);
        assert_eq!(entry.link.as_deref(), Some("https://example.org/"));
        assert_eq!(entry.title, "real");
    }

    #[test]
    fn test_prefers_yarr_link_over_earlier_anchor() {
        let html = r#"<a href="https://other/">other</a><h3><a class="yarr-link" href="https://main/">Main</a></h3>"#;
        let entry = render_entry(html);
        assert_eq!(entry.link.as_deref(), Some("https://main/"));
        assert_eq!(entry.title, "Main");
    }

    #[test]
    fn test_untitled_fragment() {
        let entry = render_entry("<p>just text</p>");
        assert_eq!(entry.title, "(untitled)");
        assert_eq!(entry.link, None);
        assert_eq!(entry.body, vec!["just text".to_string()]);
    }

    #[test]
    fn test_preformatted_keeps_lines() {
        let entry = render_entry("<pre>a  b\nc</pre>");
        assert_eq!(entry.body, vec!["a  b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_decode_entities() {
        assert!(matches!(decode_entities("plain"), Cow::Borrowed(_)));
        assert_eq!(decode_entities("Tom &amp; Jerry &lt;3"), "Tom & Jerry <3");
        assert_eq!(decode_entities("caf&#233;"), "café");
    }
}
