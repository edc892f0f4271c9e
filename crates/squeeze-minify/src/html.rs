//! Markup handling: block segmentation and inter-tag whitespace removal

use crate::compressor::Compressor;
use once_cell::sync::Lazy;
use regex::Regex;
use squeeze_core::Result;

/// Opening of a block whose content is not plain markup
static BLOCK_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<!--|<(script|style|pre|textarea)(\s[^>]*)?>").expect("valid block regex")
});

static SCRIPT_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</script\s*>").expect("valid script close regex"));
static STYLE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</style\s*>").expect("valid style close regex"));
static PRE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</pre\s*>").expect("valid pre close regex"));
static TEXTAREA_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</textarea\s*>").expect("valid textarea close regex"));

static TYPE_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|\s)type\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid type attribute regex")
});

/// ASCII whitespace only: a non-breaking space between tags is content
static INTERTAG_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r">[ \t\r\n\x0C]+<").expect("valid intertag regex"));

/// `type` values that mark a script block as JavaScript
const JAVASCRIPT_TYPES: &[&str] = &[
    "",
    "module",
    "text/javascript",
    "application/javascript",
    "application/x-javascript",
    "text/ecmascript",
    "application/ecmascript",
    "text/jscript",
];

/// A slice of a document, classified by how it may be compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// Tags and text outside of any special block
    Markup(&'a str),
    /// Content of a `<style>` element
    Style(&'a str),
    /// Content of a `<script>` element
    Script {
        /// Raw script text
        content: &'a str,
        /// Whether the block's `type` denotes JavaScript
        javascript: bool,
    },
    /// An HTML comment including its delimiters, never modified
    Comment(&'a str),
    /// `<pre>`/`<textarea>` content, never modified
    Protected(&'a str),
}

/// Split `document` into segments whose concatenation is `document`
///
/// Opening and closing tags of special blocks stay in the surrounding
/// markup segments; only block content is classified separately. A block
/// left open runs to the end of the input.
pub(crate) fn segments(document: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    while let Some(open) = BLOCK_OPEN.captures_at(document, cursor) {
        let whole = open.get(0).map_or(cursor..cursor, |m| m.range());

        let Some(name) = open.get(1) else {
            // <!-- comment -->
            push_markup(&mut segments, &document[cursor..whole.start]);
            let end = document[whole.end..]
                .find("-->")
                .map_or(document.len(), |p| whole.end + p + 3);
            segments.push(Segment::Comment(&document[whole.start..end]));
            cursor = end;
            continue;
        };

        push_markup(&mut segments, &document[cursor..whole.end]);

        let name = name.as_str().to_ascii_lowercase();
        let close = match name.as_str() {
            "script" => &*SCRIPT_CLOSE,
            "style" => &*STYLE_CLOSE,
            "pre" => &*PRE_CLOSE,
            _ => &*TEXTAREA_CLOSE,
        };
        let content_end = close
            .find_at(document, whole.end)
            .map_or(document.len(), |m| m.start());
        let content = &document[whole.end..content_end];

        if !content.is_empty() {
            segments.push(match name.as_str() {
                "script" => Segment::Script {
                    content,
                    javascript: is_javascript(open.get(2).map_or("", |m| m.as_str())),
                },
                "style" => Segment::Style(content),
                _ => Segment::Protected(content),
            });
        }
        cursor = content_end;
    }

    push_markup(&mut segments, &document[cursor..]);
    segments
}

fn push_markup<'a>(segments: &mut Vec<Segment<'a>>, markup: &'a str) {
    if !markup.is_empty() {
        segments.push(Segment::Markup(markup));
    }
}

/// Whether a script tag's attributes describe JavaScript
fn is_javascript(attributes: &str) -> bool {
    let Some(caps) = TYPE_ATTRIBUTE.captures(attributes) else {
        return true;
    };
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map_or("", |m| m.as_str());
    let mime = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    JAVASCRIPT_TYPES.contains(&mime.as_str())
}

/// Whether `c` counts as whitespace between two tags
pub(crate) fn is_intertag_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0C')
}

/// Removes whitespace runs that sit between a `>` and the next `<`
#[derive(Debug, Clone, Copy, Default)]
pub struct IntertagCompressor;

impl Compressor for IntertagCompressor {
    fn compress(&self, source: &str) -> Result<String> {
        Ok(INTERTAG_SPACE.replace_all(source, "><").into_owned())
    }
}
