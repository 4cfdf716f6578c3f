//! Unsubscribe-link detection.
//!
//! Priority order, first match wins:
//! 1. `List-Unsubscribe` header with an angle-bracketed `http…` URL.
//! 2. The first anchor in the HTML body whose visible text mentions
//!    unsubscribing (or whose href does).

use once_cell::sync::Lazy;
use regex::Regex;

use super::mime::{decode_attribute, html_to_text};

/// Anchor text phrases (lowercase) that mark an unsubscribe link.
const ANCHOR_TEXT_MARKERS: [&str; 3] = ["unsubscribe", "opt out", "remove"];

/// Comments plus script and style blocks never contribute anchors.
static HIDDEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap()
});

/// An `<a>` element: attribute text (quoted values may hold `>`) and inner HTML.
static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a(\s(?:[^>"']|"[^"]*"|'[^']*')*)?>(.*?)(?:</a\s*>|\z)"#).unwrap()
});

/// One attribute: name, then an optional double-quoted, single-quoted or bare value.
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).unwrap()
});

/// Find the unsubscribe URL for a message, if any.
pub fn detect_unsubscribe(list_unsubscribe: &str, html_body: &str) -> Option<String> {
    from_list_header(list_unsubscribe).or_else(|| from_html_anchors(html_body))
}

/// Extract the text between the first `<http` and the following `>`.
pub fn from_list_header(value: &str) -> Option<String> {
    let start = value.find("<http")?;
    let len = value[start..].find('>')?;
    Some(value[start + 1..start + len].to_string())
}

/// Scan `<a href>` elements in document order and return the first qualifying href.
///
/// Anchors without an `href` attribute never qualify. Anchors inside comments,
/// scripts and style blocks are ignored.
pub fn from_html_anchors(html: &str) -> Option<String> {
    if html.is_empty() {
        return None;
    }
    let visible = HIDDEN_RE.replace_all(html, "");

    ANCHOR_RE.captures_iter(&visible).find_map(|caps| {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let href = attr_value(attrs, "href")?;
        let text = html_to_text(caps.get(2).map_or("", |m| m.as_str())).to_lowercase();

        let qualifies = ANCHOR_TEXT_MARKERS.iter().any(|m| text.contains(m))
            || href.to_lowercase().contains("unsubscribe");
        qualifies.then_some(href)
    })
}

/// Decoded value of the first attribute called `name` (case-insensitive).
fn attr_value(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .map(|caps| {
            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            decode_attribute(raw)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_header_http_url() {
        let value = "<mailto:leave@list.example>, <https://list.example/u?x=1>";
        assert_eq!(
            from_list_header(value).as_deref(),
            Some("https://list.example/u?x=1")
        );
    }

    #[test]
    fn test_list_header_mailto_only() {
        assert_eq!(from_list_header("<mailto:leave@list.example>"), None);
        assert_eq!(from_list_header("<https://unterminated"), None);
        assert_eq!(from_list_header(""), None);
    }

    #[test]
    fn test_header_wins_over_body() {
        let html = r#"<a href="https://body.example/unsubscribe">Unsubscribe</a>"#;
        let url = detect_unsubscribe("<https://header.example/u>", html);
        assert_eq!(url.as_deref(), Some("https://header.example/u"));
    }

    #[test]
    fn test_anchor_text_match() {
        let html = r#"<p>Hi</p><a href="https://shop.example/home">Home</a>
            <A class="x" HREF='https://shop.example/prefs?a=1&amp;b=2'>Opt&nbsp;Out</A>"#;
        assert_eq!(
            from_html_anchors(html).as_deref(),
            Some("https://shop.example/prefs?a=1&b=2")
        );
    }

    #[test]
    fn test_anchor_href_match() {
        let html = r#"<a href=https://x.example/Unsubscribe?id=9>click here</a>"#;
        assert_eq!(
            from_html_anchors(html).as_deref(),
            Some("https://x.example/Unsubscribe?id=9")
        );
    }

    #[test]
    fn test_remove_in_nested_markup() {
        let html = r#"<a href="https://x.example/r"><span>Remove me</span> from this list</a>"#;
        assert_eq!(from_html_anchors(html).as_deref(), Some("https://x.example/r"));
    }

    #[test]
    fn test_ignores_non_anchor_tags_and_missing_href() {
        let html = r#"<abbr>unsubscribe</abbr><a name="top">unsubscribe</a><area href="u">"#;
        assert_eq!(from_html_anchors(html), None);
    }

    #[test]
    fn test_data_href_is_not_href() {
        let html = r#"<a data-href="https://x.example/unsubscribe" href="/ok">Read more</a>"#;
        assert_eq!(from_html_anchors(html), None);
    }

    #[test]
    fn test_numeric_entity_in_anchor_text() {
        let html = r#"<a href="https://x.example/p">Un&#115;ubscribe</a>"#;
        assert_eq!(from_html_anchors(html).as_deref(), Some("https://x.example/p"));
    }

    #[test]
    fn test_commented_out_anchor_is_ignored() {
        let html = r#"<!-- <a href="https://x.example/old">remove</a> --><p>Thanks</p>"#;
        assert_eq!(from_html_anchors(html), None);

        let html = r#"<!-- <a href="https://x.example/old">remove</a> -->
            <a href="https://x.example/new">Unsubscribe</a>"#;
        assert_eq!(from_html_anchors(html).as_deref(), Some("https://x.example/new"));
    }

    #[test]
    fn test_script_anchor_is_ignored() {
        let html = r#"<script>var s = '<a href="https://x.example/js">unsubscribe</a>';</script>"#;
        assert_eq!(from_html_anchors(html), None);
    }

    #[test]
    fn test_gt_inside_quoted_attribute() {
        let html = r#"<a title="a>b" href="https://x.example/unsubscribe">here</a>"#;
        assert_eq!(
            from_html_anchors(html).as_deref(),
            Some("https://x.example/unsubscribe")
        );
    }

    #[test]
    fn test_no_link_anywhere() {
        assert_eq!(detect_unsubscribe("", "<p>Lunch tomorrow?</p>"), None);
    }
}
