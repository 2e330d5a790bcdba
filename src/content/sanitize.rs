//! HTML sanitizing profiles for user-authored markup.

use std::collections::{HashMap, HashSet};

/// Named sanitizing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Rich text a user writes into a topic body.
    UserTopicBody,
}

const TOPIC_BODY_TAGS: &[&str] = &[
    "div", "b", "strong", "i", "em", "a", "ul", "ol", "li", "p", "br", "span", "img", "pre", "hr",
    "code", "h2", "h3", "h4", "h5", "h6", "blockquote", "del", "table", "thead", "tbody", "tr",
    "th", "td",
];

const TOPIC_BODY_CSS: &[&str] = &[
    "font",
    "font-size",
    "font-weight",
    "font-style",
    "margin",
    "width",
    "height",
    "font-family",
    "text-decoration",
    "padding-left",
    "color",
    "background-color",
    "text-align",
];

/// Clean `html` according to `profile`. Total: any input yields some output.
pub fn clean(html: &str, profile: Profile) -> String {
    match profile {
        Profile::UserTopicBody => {
            let tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::from([
                ("a", HashSet::from(["href", "title"])),
                ("ol", HashSet::from(["start"])),
                ("img", HashSet::from(["width", "height", "alt", "src"])),
            ]);

            ammonia::Builder::default()
                .tags(TOPIC_BODY_TAGS.iter().copied().collect())
                .tag_attributes(tag_attributes)
                .generic_attributes(HashSet::from(["style", "class"]))
                .filter_style_properties(TOPIC_BODY_CSS.iter().copied().collect())
                .clean(html)
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(html: &str) -> String {
        clean(html, Profile::UserTopicBody)
    }

    #[test]
    fn test_script_removed_with_content() {
        let out = topic("<p>hi</p><script>alert(1)</script>");
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn test_event_handlers_stripped() {
        let out = topic(r#"<img src="https://example.com/a.png" onerror="x()">"#);
        assert!(out.contains(r#"src="https://example.com/a.png""#));
        assert!(!out.contains("onerror"));
    }

    #[test]
    fn test_disallowed_tag_unwrapped() {
        let out = topic("<h1>Title</h1><iframe src=\"x\"></iframe>");
        assert!(!out.contains("<h1>"));
        assert!(!out.contains("iframe"));
        assert!(out.contains("Title"));
    }

    #[test]
    fn test_javascript_href_dropped() {
        let out = topic(r#"<a href="javascript:alert(1)" title="t">x</a>"#);
        assert!(!out.contains("javascript"));
        assert!(out.contains("title=\"t\""));
    }

    #[test]
    fn test_style_properties_filtered() {
        let out = topic(r#"<span style="color: red; position: fixed">x</span>"#);
        assert!(out.contains("color"));
        assert!(!out.contains("position"));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<p>plain</p>",
            r#"<p style="color: red">a <b>b</b> <a href="https://x.io" title="x">c</a></p>"#,
            "<table><tr><td>1 &amp; 2</td></tr></table><script>bad()</script>",
            "unclosed <em>tags <strong>here",
        ];
        for input in inputs {
            let once = topic(input);
            assert_eq!(topic(&once), once, "input: {input}");
        }
    }
}
