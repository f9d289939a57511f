//! Normalized text similarity for duplicate-content detection
//!
//! `similarity(a, b) = 1 - levenshtein(a', b') / max(|a'|, |b'|)` where `a'`
//! and `b'` are the inputs reduced to plain text. Lengths count Unicode
//! scalar values, not bytes.

/// Elements rendered as a break between words when reduced to text
const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "li", "ul", "ol", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre", "hr", "table", "section", "article",
];

/// Similarity of two submissions in `[0.0, 1.0]`
///
/// The blank check runs on the raw input, before markup is stripped: `" "`
/// scores 0.0 against anything, while `"<br>"` (not blank, but empty once
/// stripped) scores 1.0 against another markup-only string.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.trim().is_empty() || b.trim().is_empty() {
        return 0.0;
    }

    let plain_a = strip_markup(a);
    let plain_b = strip_markup(b);

    // normalized_levenshtein returns 1.0 for two empty strings
    strsim::normalized_levenshtein(&plain_a, &plain_b)
}

/// Reduce markup to plain text: drop tags, decode entities, collapse whitespace
pub fn strip_markup(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut chars = input.char_indices();

    while let Some((idx, ch)) = chars.next() {
        if ch == '<' && starts_tag(&input[idx + 1..]) {
            let mut name = String::new();
            let mut reading_name = true;
            for (_, tag_ch) in chars.by_ref() {
                if tag_ch == '>' {
                    break;
                }
                if reading_name {
                    if tag_ch.is_ascii_alphanumeric() {
                        name.push(tag_ch.to_ascii_lowercase());
                    } else if !(tag_ch == '/' && name.is_empty()) {
                        reading_name = false;
                    }
                }
            }
            if BLOCK_TAGS.contains(&name.as_str()) {
                text.push(' ');
            }
        } else {
            text.push(ch);
        }
    }

    collapse_whitespace(&decode_entities(&text))
}

/// A `<` opens a tag only when followed by a name, `/`, `!` or `?`
fn starts_tag(rest: &str) -> bool {
    rest.chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
        .unwrap_or(false)
}

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        match after.find(';').filter(|&semi| semi <= 10) {
            Some(semi) => match decode_entity(&after[1..semi]) {
                Some(decoded) => {
                    out.push(decoded);
                    rest = &after[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &after[1..];
                }
            },
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
