//! Inline highlighting of artifact content
//!
//! A pure text-to-markup transform applied line by line to an artifact's
//! content: prices, domain keywords and `[KIND: text]` markers get wrapped
//! in styled spans. It plays no part in extraction.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// One alternation, so every byte is claimed by at most one style.
/// Markers win over prices, prices over keywords.
static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\[(?P<marker>HEALTH|EDU|MGMT|PLAN): (?P<marker_text>[^\]\n]+)\]",
        r"|(?P<price>\$\d+(?:\.\d+)?|\d[\d,]*\s*(?:USD|THB|MMK))",
        r"|(?P<edu>🔵|🎓|(?i:\b(?:education|study|learning)\b))",
        r"|(?P<health>🟢|❤️|(?i:\b(?:health|family|wellness|care|parents)\b))",
        r"|(?P<mgmt>🟣|💼|(?i:\b(?:management|project|strategy|professional)\b))",
    ))
    .expect("highlight pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Price,
    Education,
    Health,
    Management,
    MarkerGreen,
    MarkerBlue,
    MarkerPurple,
}

impl Style {
    fn css_class(self) -> &'static str {
        match self {
            Style::Price => "price-text",
            Style::Education => "edu-text",
            Style::Health => "health-text",
            Style::Management => "mgmt-text",
            Style::MarkerGreen => "marker-green",
            Style::MarkerBlue => "marker-blue",
            Style::MarkerPurple => "marker-purple",
        }
    }

    fn ansi_code(self) -> &'static str {
        match self {
            Style::Price => "1;31",
            Style::Education => "1;34",
            Style::Health => "1;32",
            Style::Management => "1;35",
            Style::MarkerGreen => "30;42",
            Style::MarkerBlue => "30;44",
            Style::MarkerPurple => "30;45",
        }
    }

    fn for_marker(kind: &str) -> Self {
        match kind {
            "HEALTH" => Style::MarkerGreen,
            "EDU" => Style::MarkerBlue,
            _ => Style::MarkerPurple,
        }
    }
}

/// Output flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// `<span class="...">` with the text HTML-escaped
    #[allow(dead_code)] // The terminal front end only renders ANSI
    Html,
    /// Terminal escape sequences
    Ansi,
}

impl Markup {
    fn plain(self, text: &str, out: &mut String) {
        match self {
            Markup::Html => escape_html(text, out),
            Markup::Ansi => out.push_str(text),
        }
    }

    fn styled(self, style: Style, text: &str, out: &mut String) {
        match self {
            Markup::Html => {
                out.push_str("<span class=\"");
                out.push_str(style.css_class());
                out.push_str("\">");
                escape_html(text, out);
                out.push_str("</span>");
            }
            Markup::Ansi => {
                out.push_str("\x1b[");
                out.push_str(style.ansi_code());
                out.push('m');
                out.push_str(text);
                out.push_str("\x1b[0m");
            }
        }
    }
}

/// Highlight every line of `content`
pub fn highlight(content: &str, markup: Markup) -> String {
    content
        .split('\n')
        .map(|line| highlight_line(line, markup))
        .collect::<Vec<_>>()
        .join("\n")
}

fn highlight_line(line: &str, markup: Markup) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;

    for caps in PATTERN.captures_iter(line) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if let Some(before) = line.get(last..whole.start()) {
            markup.plain(before, &mut out);
        }
        let (style, text) = classify(&caps);
        markup.styled(style, text, &mut out);
        last = whole.end();
    }

    if let Some(rest) = line.get(last..) {
        markup.plain(rest, &mut out);
    }
    out
}

fn classify<'t>(caps: &Captures<'t>) -> (Style, &'t str) {
    if let (Some(kind), Some(text)) = (caps.name("marker"), caps.name("marker_text")) {
        return (Style::for_marker(kind.as_str()), text.as_str());
    }

    let groups = [
        ("price", Style::Price),
        ("edu", Style::Education),
        ("health", Style::Health),
        ("mgmt", Style::Management),
    ];
    for (name, style) in groups {
        if let Some(m) = caps.name(name) {
            return (style, m.as_str());
        }
    }

    // Unreachable with the current pattern; keep the text intact regardless
    (Style::Management, caps.get(0).map_or("", |m| m.as_str()))
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
