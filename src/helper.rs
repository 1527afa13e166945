use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use log::trace;
use rand::Rng;

/// Highest identifier handed out by this process so far
static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Generates an identifier for a note or reminder.
///
/// The value is the current time in milliseconds plus a random offset below
/// 1000, bumped past the last issued value so that rapid successive calls in
/// one process never repeat. Separate processes can still collide.
pub fn generate_id() -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let candidate = now + rand::thread_rng().gen_range(0..1000);

    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let next = candidate.max(last + 1);
        match LAST_ID.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => {
                trace!("Generated id {}", next);
                return next;
            }
            Err(current) => last = current,
        }
    }
}

/// Trims and lowercases a tag; returns `None` when nothing is left
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Normalizes a list of tags, dropping empties and later duplicates
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result: Vec<String> = Vec::new();
    for tag in tags {
        if let Some(tag) = normalize_tag(tag.as_ref()) {
            if !result.contains(&tag) {
                result.push(tag);
            }
        }
    }
    result
}

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Elements whose boundaries separate words in the extracted text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "td",
    "th", "tr", "ul",
];

/// Elements whose body is never text
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Extracts the plain text of an HTML fragment.
///
/// Tags and comments are removed, character references are resolved and
/// block-level boundaries become a line break so that words from adjacent
/// blocks stay apart. The markup is never executed or validated.
pub fn extract_text_from_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut pending_break = false;
    let mut rest = html;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(after) = rest.strip_prefix("<!--") {
                rest = match after.find("-->") {
                    Some(end) => &after[end + 3..],
                    None => "",
                };
                continue;
            }

            if let Some(tag) = parse_tag(rest) {
                if BLOCK_ELEMENTS.contains(&tag.name.as_str()) {
                    pending_break = true;
                }
                rest = &rest[tag.len..];

                if !tag.closing && RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                    let closing = format!("</{}", tag.name);
                    rest = match find_ignore_ascii_case(rest, &closing) {
                        Some(start) => {
                            let tail = &rest[start..];
                            match tail.find('>') {
                                Some(end) => &tail[end + 1..],
                                None => "",
                            }
                        }
                        None => "",
                    };
                }
                continue;
            }
        }

        let (decoded, consumed) = if ch == '&' {
            decode_entity(rest).unwrap_or((ch, 1))
        } else {
            (ch, ch.len_utf8())
        };

        if pending_break {
            if text.chars().last().is_some_and(|last| !last.is_whitespace()) && !decoded.is_whitespace() {
                text.push('\n');
            }
            pending_break = false;
        }
        text.push(decoded);
        rest = &rest[consumed..];
    }

    text
}

struct Tag {
    name: String,
    closing: bool,
    len: usize,
}

/// Recognizes a tag at the start of `input`; `<` not followed by a name is text
fn parse_tag(input: &str) -> Option<Tag> {
    let body = input.strip_prefix('<')?;
    let (closing, body) = match body.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let first = body.chars().next()?;
    if !(first.is_ascii_alphabetic() || (!closing && (first == '!' || first == '?'))) {
        return None;
    }

    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    // Attribute values may contain '>' inside quotes
    let mut quote: Option<char> = None;
    for (offset, c) in body.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => {
                let len = input.len() - body.len() + offset + 1;
                return Some(Tag { name, closing, len });
            }
            None => {}
        }
    }
    None
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Decodes a character reference at the start of `input`
fn decode_entity(input: &str) -> Option<(char, usize)> {
    let body = input.strip_prefix('&')?;
    let end = body.char_indices().take(12).find(|(_, c)| *c == ';')?.0;
    let name = &body[..end];
    let consumed = end + 2;

    let decoded = if let Some(numeric) = name.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        char::from_u32(code)?
    } else {
        match name {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            "ndash" => '\u{2013}',
            "mdash" => '\u{2014}',
            "hellip" => '\u{2026}',
            "laquo" => '\u{ab}',
            "raquo" => '\u{bb}',
            "lsquo" => '\u{2018}',
            "rsquo" => '\u{2019}',
            "ldquo" => '\u{201c}',
            "rdquo" => '\u{201d}',
            "copy" => '\u{a9}',
            "reg" => '\u{ae}',
            "euro" => '\u{20ac}',
            _ => return None,
        }
    };
    Some((decoded, consumed))
}
