use std::sync::LazyLock;

use ratatui::prelude::*;
use regex::Regex;

use crate::comment::Visibility;
use crate::theme::Theme;

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("valid href regex")
});

/// Column count html2text lays text out in before `textwrap` wraps it.
const UNWRAPPED: usize = 4096;

/// Renders comment HTML to wrapped plain lines.
///
/// Paragraph breaks survive as blank lines. Link footnotes and reference
/// markers that html2text adds are dropped: links are reached via [`links`].
pub fn comment_text(html: &str, width: usize) -> Vec<String> {
    let text = html2text::from_read(html.as_bytes(), UNWRAPPED);

    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let lead = line.trim_start();
        if lead.starts_with('[') && lead.contains("]:") {
            continue;
        }
        let line = strip_references(line.trim_end());
        if line.is_empty() {
            lines.push(line);
            continue;
        }
        lines.extend(
            textwrap::wrap(&line, width.max(10))
                .into_iter()
                .map(|l| l.into_owned()),
        );
    }

    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    lines
}

/// Drops `[1]`-style markers and unwraps `[text]` around link labels.
fn strip_references(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut res = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '[' {
            if let Some(len) = chars[i + 1..].iter().position(|c| *c == ']') {
                let inner = &chars[i + 1..i + 1 + len];
                if !inner.is_empty() && inner.iter().all(|c| c.is_ascii_digit()) {
                    i += len + 2;
                    continue;
                }
                res.extend(inner);
                i += len + 2;
                continue;
            }
        }
        res.push(chars[i]);
        i += 1;
    }
    res
}

/// Targets of the anchors in a comment, entity-decoded, in order of
/// appearance.
pub fn links(html: &str) -> Vec<String> {
    HREF_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or(caps.get(2)).or(caps.get(3)))
        .map(|href| html_escape::decode_html_entities(href.as_str()).trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Body of a comment styled for display, or `None` when the comment is not
/// fully shown.
pub fn styled_body(
    html: &str,
    visibility: Visibility,
    theme: &Theme,
    width: usize,
) -> Option<Text<'static>> {
    if visibility != Visibility::Visible {
        return None;
    }
    let style = Style::default().fg(theme.text);
    let lines: Vec<Line<'static>> = comment_text(html, width)
        .into_iter()
        .map(|l| Line::from(Span::styled(l, style)))
        .collect();
    Some(Text::from(lines))
}
