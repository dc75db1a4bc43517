//! Minimal case-insensitive helpers for pulling text and attributes out of
//! saved product markup. Lowercasing is ASCII-only, so byte offsets found in
//! the lowered copy are valid in the original.

pub(crate) fn lower(s: &str) -> String {
    s.to_ascii_lowercase()
}

/// Byte offsets of every occurrence of `needle` (already lowercase) in
/// `lowered`.
pub(crate) fn find_all(lowered: &str, needle: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(found) = lowered.get(from..).and_then(|rest| rest.find(needle)) {
        positions.push(from + found);
        from += found + needle.len().max(1);
    }
    positions
}

/// Span `[start, end)` of the tag containing byte `pos`, `end` just past `>`.
pub(crate) fn enclosing_tag(html: &str, pos: usize) -> Option<(usize, usize)> {
    let start = html.get(..pos)?.rfind('<')?;
    let end = html.get(pos..)?.find('>')? + pos + 1;
    Some((start, end))
}

/// Value of attribute `name` inside a single opening tag.
pub(crate) fn attribute(tag: &str, name: &str) -> Option<String> {
    let lowered = lower(tag);
    let pattern = format!("{}=", lower(name));
    let mut from = 0;

    while let Some(found) = lowered.get(from..).and_then(|rest| rest.find(&pattern)) {
        let at = from + found;
        from = at + pattern.len();

        let preceded_by_space = lowered[..at]
            .chars()
            .next_back()
            .is_some_and(|ch| ch.is_ascii_whitespace());
        if !preceded_by_space {
            continue;
        }

        let value_start = at + pattern.len();
        let rest = &tag[value_start..];
        let value = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let close = body.find(quote)?;
                &body[..close]
            }
            Some(_) => {
                let stop = rest
                    .find(|ch: char| ch.is_ascii_whitespace() || ch == '>' || ch == '/')
                    .unwrap_or(rest.len());
                &rest[..stop]
            }
            None => return None,
        };
        return Some(decode_entities(value.trim()));
    }
    None
}

/// Text between the end of the opening tag that ends at `open_end` and the
/// next `close` tag (lowercase, e.g. `</h2`).
pub(crate) fn element_text(html: &str, open_end: usize, close: &str) -> Option<String> {
    let lowered = lower(html.get(open_end..)?);
    let stop = lowered.find(close)?;
    Some(clean_text(&html[open_end..open_end + stop]))
}

pub(crate) fn clean_text(fragment: &str) -> String {
    normalize_ws(&decode_entities(&strip_tags(fragment)))
}

pub(crate) fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

pub(crate) fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_handles_quotes_and_case() {
        let tag = r#"<div DATA-ASIN="B01ABC" class='row' data-index=3>"#;
        assert_eq!(attribute(tag, "data-asin").as_deref(), Some("B01ABC"));
        assert_eq!(attribute(tag, "class").as_deref(), Some("row"));
        assert_eq!(attribute(tag, "data-index").as_deref(), Some("3"));
        assert_eq!(attribute(tag, "asin"), None, "must not match inside data-asin");
    }

    #[test]
    fn element_text_strips_nested_markup() {
        let html = r#"<h2 class="t"><a href="/x"><span>Organic&nbsp;Bamboo   Brush</span></a></h2>"#;
        let open_end = html.find('>').expect("tag end") + 1;
        assert_eq!(
            element_text(html, open_end, "</h2").as_deref(),
            Some("Organic Bamboo Brush")
        );
    }

    #[test]
    fn find_all_reports_every_offset() {
        assert_eq!(find_all("abcabc", "bc"), vec![1, 4]);
        assert!(find_all("abc", "zz").is_empty());
    }
}
