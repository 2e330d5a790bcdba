//! Hooks the repository runs around topic writes.

use crate::content::{clean, make_excerpt, Profile, SlugTranslator};
use crate::models::TopicRecord;

/// Slug used when the translator produces nothing for a title.
pub const FALLBACK_SLUG: &str = "topic";

/// Runs before every insert and update of a topic.
///
/// Sanitizes the body, derives the excerpt from the sanitized body, and
/// assigns a slug from the title when none is set. An existing slug is kept.
pub fn saving(topic: &mut TopicRecord, translator: &dyn SlugTranslator) {
    topic.body = clean(&topic.body, Profile::UserTopicBody);
    topic.excerpt = make_excerpt(&topic.body);

    if topic.slug.is_empty() {
        let slug = translator.translate(&topic.title);
        topic.slug = if slug.is_empty() {
            FALLBACK_SLUG.to_string()
        } else {
            slug
        };
    }
}

/// Runs before an update only, ahead of [`saving`]. Nothing to do yet.
pub fn updating(_topic: &TopicRecord) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::DashSlugTranslator;

    fn record(title: &str, body: &str, slug: &str) -> TopicRecord {
        TopicRecord {
            title: title.to_string(),
            body: body.to_string(),
            excerpt: "stale".to_string(),
            slug: slug.to_string(),
            category_id: 1,
            user_id: 1,
        }
    }

    #[test]
    fn test_excerpt_comes_from_sanitized_body() {
        let raw = "<p>Visible</p><script>hidden()</script>";
        let mut topic = record("Hello", raw, "");
        saving(&mut topic, &DashSlugTranslator);

        assert_eq!(topic.body, "<p>Visible</p>");
        assert_eq!(topic.excerpt, make_excerpt(&topic.body));
        assert_ne!(topic.excerpt, make_excerpt(raw));
    }

    #[test]
    fn test_empty_slug_derived_from_title() {
        let mut a = record("Hello Rust World", "<p>body</p>", "");
        let mut b = record("Hello Rust World", "<p>other</p>", "");
        saving(&mut a, &DashSlugTranslator);
        saving(&mut b, &DashSlugTranslator);

        assert_eq!(a.slug, "hello-rust-world");
        assert_eq!(a.slug, b.slug);
    }

    #[test]
    fn test_existing_slug_kept() {
        let mut topic = record("A brand new title", "<p>body</p>", "original-slug");
        saving(&mut topic, &DashSlugTranslator);
        assert_eq!(topic.slug, "original-slug");
    }

    #[test]
    fn test_untranslatable_title_gets_fallback() {
        let mut topic = record("？？", "<p>body</p>", "");
        saving(&mut topic, &DashSlugTranslator);
        assert_eq!(topic.slug, FALLBACK_SLUG);
    }

    #[test]
    fn test_chinese_title_gets_pinyin_slug() {
        let mut topic = record("你好世界", "<p>body</p>", "");
        saving(&mut topic, &DashSlugTranslator);
        assert_eq!(topic.slug, "ni-hao-shi-jie");
    }

    #[test]
    fn test_saving_twice_is_stable() {
        let mut topic = record("Stable", r#"<p style="color: red">x</p><em>y"#, "");
        saving(&mut topic, &DashSlugTranslator);
        let first = topic.clone();
        saving(&mut topic, &DashSlugTranslator);
        assert_eq!(topic, first);
    }
}
