//! Form field sanitization for untrusted user input.
//!
//! Everything typed or pasted into a form is treated as plain text. Markup is
//! neutralized by removal rather than escaping: the value is parsed as an HTML
//! fragment (html5ever, via `scraper`) and only its character data is kept.
//! Tags, attributes and comments disappear, and the bodies of executable or
//! raw-text elements (`<script>`, `<style>`, ...) are dropped with them.
//!
//! # Guarantees
//!
//! - Output never contains `<` or `>`.
//! - Output has no leading/trailing whitespace, no runs of horizontal
//!   whitespace, and at most one blank line between paragraphs.
//! - Entities such as `&lt;` are left as literal text and never decoded, so
//!   [`sanitize`] is idempotent: `sanitize(sanitize(x)) == sanitize(x)`.

use std::borrow::Cow;

use scraper::{Html, Node};

/// Elements whose content is removed together with the tags.
const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "noembed", "noframes",
    "template", "textarea", "title", "xmp",
];

/// Sanitize a raw form value.
///
/// Strips:
/// - Markup tags, attributes, comments, CDATA sections, doctype and
///   processing instructions
/// - The content of `<script>`, `<style>` and similar elements
/// - Stray `<` and `>` characters
/// - Control characters other than line breaks
///
/// Then collapses whitespace and trims the result. Never fails; input that
/// is nothing but markup yields an empty string.
///
/// # Examples
///
/// ```
/// use formgate_types::sanitize;
///
/// assert_eq!(sanitize("  Bob@Example.com "), "Bob@Example.com");
/// assert_eq!(sanitize("hi <script>alert(1)</script><b>there</b>"), "hi there");
/// ```
#[must_use]
pub fn sanitize(input: &str) -> Cow<'_, str> {
    // Fast path: already plain, normalized text
    if is_clean(input) {
        return Cow::Borrowed(input);
    }

    let stripped = strip_markup(input);
    Cow::Owned(normalize_whitespace(&stripped))
}

/// True when `input` is a fixed point of [`sanitize`].
fn is_clean(input: &str) -> bool {
    if input.starts_with(char::is_whitespace) || input.ends_with(char::is_whitespace) {
        return false;
    }

    let mut prev = '\0';
    let mut newlines = 0usize;
    for c in input.chars() {
        match c {
            '<' | '>' => return false,
            '\n' => {
                if prev == ' ' {
                    return false;
                }
                newlines += 1;
                if newlines > 2 {
                    return false;
                }
            }
            ' ' => {
                if prev == ' ' || prev == '\n' {
                    return false;
                }
                newlines = 0;
            }
            c if c.is_whitespace() || c.is_control() => return false,
            _ => newlines = 0,
        }
        prev = c;
    }
    true
}

/// Remove markup, keeping the surrounding text and its whitespace as is.
///
/// The input is parsed as an HTML fragment and only character data outside
/// dropped elements survives. Literal `<` and `>` left in that text are
/// removed too. Entities are not decoded.
///
/// Paste handlers use this directly; [`sanitize`] additionally normalizes
/// whitespace.
#[must_use]
pub fn strip_markup(input: &str) -> Cow<'_, str> {
    if !input.contains(['<', '>']) {
        return Cow::Borrowed(input);
    }

    // Escaping `&` keeps `&lt;` and friends as literal text.
    let fragment = Html::parse_fragment(&input.replace('&', "&amp;"));

    let mut text = String::with_capacity(input.len());
    for node in fragment.tree.root().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let dropped = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if DROP_CONTENT_TAGS.contains(&el.name()))
        });
        if !dropped {
            text.extend(chunk.chars().filter(|c| !matches!(c, '<' | '>')));
        }
    }
    Cow::Owned(text)
}

/// Collapse horizontal whitespace, trim lines, and cap blank-line runs.
fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut pending_blank = false;

    for line in unified.split('\n') {
        let mut collapsed = String::with_capacity(line.len());
        for word in line
            .split(|c: char| c.is_whitespace() || c.is_control())
            .filter(|w| !w.is_empty())
        {
            if !collapsed.is_empty() {
                collapsed.push(' ');
            }
            collapsed.push_str(word);
        }

        if collapsed.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }

        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        pending_blank = false;
        out.push_str(&collapsed);
    }

    out
}
