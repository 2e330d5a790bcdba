//! Topic model and the form/record types that flow into persistence.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A stored discussion topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    /// Sanitized HTML.
    pub body: String,
    pub excerpt: String,
    pub slug: String,
    pub category_id: i64,
    pub user_id: i64,
    pub reply_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Topic {
    /// Canonical permalink for this topic.
    pub fn link(&self) -> String {
        topic_link(self.id, &self.slug)
    }

    /// The mutable part of this topic, ready to go through the save hook again.
    pub fn to_record(&self) -> TopicRecord {
        TopicRecord {
            title: self.title.clone(),
            body: self.body.clone(),
            excerpt: self.excerpt.clone(),
            slug: self.slug.clone(),
            category_id: self.category_id,
            user_id: self.user_id,
        }
    }
}

pub fn topic_link(id: i64, slug: &str) -> String {
    if slug.is_empty() {
        format!("/topics/{}", id)
    } else {
        format!("/topics/{}/{}", id, slug)
    }
}

/// In-memory topic about to be written; what the save hook operates on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicRecord {
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub slug: String,
    pub category_id: i64,
    pub user_id: i64,
}

/// Submitted create/edit form.
///
/// Text fields arrive trimmed. `category_id` is kept as submitted so a
/// malformed value becomes a field error instead of a rejected request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TopicForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 2, message = "标题必须至少两个字符。"))]
    pub title: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 3, message = "文章内容必须至少三个字符。"))]
    pub body: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required(message = "请选择分类。"))]
    pub category_id: Option<String>,
}

impl TopicForm {
    /// The submitted category id, if it is a number.
    pub fn category(&self) -> Option<i64> {
        self.category_id.as_deref().and_then(|raw| raw.parse().ok())
    }
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

/// HTML selects post an empty string for "nothing chosen".
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// List ordering accepted by the index page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TopicOrder {
    /// Newest topics first.
    Recent,
    /// Most recently active first.
    #[default]
    RecentReplied,
}

impl TopicOrder {
    /// Unknown or missing values select the default ordering.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("recent") => TopicOrder::Recent,
            _ => TopicOrder::RecentReplied,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopicOrder::Recent => "recent",
            TopicOrder::RecentReplied => "default",
        }
    }

    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            TopicOrder::Recent => "t.created_at DESC, t.id DESC",
            TopicOrder::RecentReplied => "t.updated_at DESC, t.id DESC",
        }
    }
}

/// One row of the topic list, joined with author and category.
#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub reply_count: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_avatar: String,
    pub category_id: i64,
    pub category_name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TopicSummary {
    pub fn link(&self) -> String {
        topic_link(self.id, &self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_with_and_without_slug() {
        assert_eq!(topic_link(3, "hello-world"), "/topics/3/hello-world");
        assert_eq!(topic_link(3, ""), "/topics/3");
    }

    #[test]
    fn test_form_validation_messages() {
        let form = TopicForm {
            title: "a".to_string(),
            body: "ok".to_string(),
            category_id: None,
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("body"));
        assert!(fields.contains_key("category_id"));
    }

    #[test]
    fn test_form_trims_and_keeps_raw_category() {
        let form: TopicForm = serde_json::from_value(serde_json::json!({
            "title": "   ",
            "body": "  body  ",
            "category_id": "abc",
        }))
        .unwrap();
        assert_eq!(form.title, "");
        assert_eq!(form.body, "body");
        assert_eq!(form.category_id.as_deref(), Some("abc"));
        assert_eq!(form.category(), None);

        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(!errors.field_errors().contains_key("category_id"));
    }

    #[test]
    fn test_blank_category_is_missing() {
        let form: TopicForm = serde_json::from_value(serde_json::json!({
            "title": "Title",
            "body": "Body",
            "category_id": " ",
        }))
        .unwrap();
        assert_eq!(form.category_id, None);
        assert!(form.validate().unwrap_err().field_errors().contains_key("category_id"));
    }

    #[test]
    fn test_unknown_order_falls_back_to_default() {
        assert_eq!(TopicOrder::from_param(Some("recent")), TopicOrder::Recent);
        assert_eq!(
            TopicOrder::from_param(Some("whatever")),
            TopicOrder::RecentReplied
        );
        assert_eq!(TopicOrder::from_param(None), TopicOrder::RecentReplied);
    }
}
