//! Just enough XML for the SpreadsheetML parts this crate writes and reads:
//! escaping, and a scanner over the tags of a document whose attribute
//! values are double-quoted and escaped.

pub const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

pub fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    Empty,
}

#[derive(Clone, Copy, Debug)]
pub struct Tag<'a> {
    pub name: &'a str,
    pub kind: TagKind,
    attrs: &'a str,
}

impl<'a> Tag<'a> {
    /// Raw (still escaped) attribute value.
    pub fn attr(&self, key: &str) -> Option<&'a str> {
        let mut rest = self.attrs;
        loop {
            rest = rest.trim_start();
            let eq = rest.find('=')?;
            let name = rest[..eq].trim();
            let after = rest[eq + 1..].trim_start();
            let after = after.strip_prefix('"')?;
            let end = after.find('"')?;
            if name == key {
                return Some(&after[..end]);
            }
            rest = &after[end + 1..];
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, TagKind::Open | TagKind::Empty)
    }
}

/// Iterator over element tags, skipping the declaration, comments and text.
pub struct Tags<'a> {
    rest: &'a str,
}

pub fn tags(xml: &str) -> Tags<'_> {
    Tags { rest: xml }
}

impl<'a> Iterator for Tags<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        loop {
            let start = self.rest.find('<')?;
            let end = start + self.rest[start..].find('>')?;
            let body = &self.rest[start + 1..end];
            self.rest = &self.rest[end + 1..];

            if body.starts_with('?') || body.starts_with('!') {
                continue;
            }
            if let Some(name) = body.strip_prefix('/') {
                return Some(Tag { name: name.trim(), kind: TagKind::Close, attrs: "" });
            }

            let (body, kind) = match body.strip_suffix('/') {
                Some(b) => (b, TagKind::Empty),
                None => (body, TagKind::Open),
            };
            let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
            return Some(Tag { name: &body[..name_end], kind, attrs: &body[name_end..] });
        }
    }
}
