//! Tag-level XML scanning for in-place part edits.
//!
//! Parts are edited by splicing new markup at byte offsets so everything the
//! embedder does not touch survives byte for byte. The scanner reports every
//! start, empty and end tag with its byte span and unescaped attributes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Empty,
    Close,
}

/// One tag as it appears in the source text
#[derive(Debug, Clone)]
pub struct Tag {
    pub name: String,
    pub kind: TagKind,
    /// Byte range of the tag markup, `<` through `>`
    pub span: Range<usize>,
    attrs: Vec<(String, String)>,
}

impl Tag {
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Start or empty tag with this qualified name
    pub fn opens(&self, name: &str) -> bool {
        self.kind != TagKind::Close && self.name == name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn start_tag(e: &BytesStart<'_>, kind: TagKind, span: Range<usize>) -> quick_xml::Result<Tag> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Tag {
        name,
        kind,
        span,
        attrs,
    })
}

/// Scan every tag in document order
pub fn scan(xml: &str) -> quick_xml::Result<Vec<Tag>> {
    let mut reader = Reader::from_str(xml);
    let mut tags = Vec::new();

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => tags.push(start_tag(&e, TagKind::Open, start..end)?),
            Event::Empty(e) => tags.push(start_tag(&e, TagKind::Empty, start..end)?),
            Event::End(e) => tags.push(Tag {
                name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                kind: TagKind::Close,
                span: start..end,
                attrs: Vec::new(),
            }),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(tags)
}

/// Index of the first start or empty tag named `name` at or after `from`
pub fn find_open(tags: &[Tag], name: &str, from: usize) -> Option<usize> {
    tags.iter()
        .skip(from)
        .position(|t| t.opens(name))
        .map(|i| i + from)
}

/// Index of the close tag matching the start tag at `open`.
///
/// Returns `open` itself for an empty element.
pub fn matching_close(tags: &[Tag], open: usize) -> Option<usize> {
    let tag = tags.get(open)?;
    match tag.kind {
        TagKind::Empty => return Some(open),
        TagKind::Close => return None,
        TagKind::Open => {}
    }

    let mut depth = 0usize;
    for (i, t) in tags.iter().enumerate().skip(open) {
        match t.kind {
            TagKind::Open => depth += 1,
            TagKind::Close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (t.name == tag.name).then_some(i);
                }
            }
            TagKind::Empty => {}
        }
    }
    None
}

/// Indices of the direct children of the element opened at `open`
pub fn children(tags: &[Tag], open: usize) -> Vec<usize> {
    let Some(close) = matching_close(tags, open) else {
        return Vec::new();
    };

    let mut result = Vec::new();
    let mut depth = 0usize;
    for (i, t) in tags.iter().enumerate().take(close).skip(open + 1) {
        match t.kind {
            TagKind::Open => {
                if depth == 0 {
                    result.push(i);
                }
                depth += 1;
            }
            TagKind::Empty => {
                if depth == 0 {
                    result.push(i);
                }
            }
            TagKind::Close => depth = depth.saturating_sub(1),
        }
    }
    result
}

/// Apply `(offset, markup)` insertions to `xml`.
///
/// Offsets refer to the original text; insertions at the same offset keep
/// their order.
pub fn splice(xml: &str, inserts: Vec<(usize, String)>) -> String {
    replace(
        xml,
        inserts
            .into_iter()
            .map(|(offset, markup)| (offset..offset, markup))
            .collect(),
    )
}

/// Replace each `(range, markup)` in `xml`. Ranges refer to the original
/// text and must not overlap.
pub fn replace(xml: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    let extra: usize = edits.iter().map(|(_, s)| s.len()).sum();
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(xml.len() + extra);
    let mut cursor = 0;
    for (range, markup) in edits {
        let start = range.start.clamp(cursor, xml.len());
        let end = range.end.clamp(start, xml.len());
        out.push_str(&xml[cursor..start]);
        out.push_str(&markup);
        cursor = end;
    }
    out.push_str(&xml[cursor..]);
    out
}

/// Escape text for use inside a double-quoted attribute
pub fn escape_attr(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}
