//! Server-rendered HTML pages.

use axum::response::Html;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};

use crate::errors::AppError;
use crate::models::{Paginated, TopicSummary};

/// Load the templates compiled into the binary.
pub fn templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (
            "layouts/app.html",
            include_str!("../../templates/layouts/app.html"),
        ),
        (
            "topics/index.html",
            include_str!("../../templates/topics/index.html"),
        ),
        (
            "topics/_topic_list.html",
            include_str!("../../templates/topics/_topic_list.html"),
        ),
        (
            "topics/show.html",
            include_str!("../../templates/topics/show.html"),
        ),
        (
            "topics/create_and_edit.html",
            include_str!("../../templates/topics/create_and_edit.html"),
        ),
    ])?;
    Ok(tera)
}

pub fn render(tera: &Tera, template: &str, context: &Context) -> Result<Html<String>, AppError> {
    Ok(Html(tera.render(template, context)?))
}

/// A topic as the list template sees it.
#[derive(Debug, Serialize)]
pub struct TopicListEntry {
    pub title: String,
    pub link: String,
    pub reply_count: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_avatar: String,
    pub category_id: i64,
    pub category_name: String,
    pub updated_at: String,
    pub updated_ago: String,
}

impl TopicListEntry {
    pub fn new(topic: &TopicSummary, now: DateTime<Utc>) -> Self {
        Self {
            title: topic.title.clone(),
            link: topic.link(),
            reply_count: topic.reply_count,
            user_id: topic.user_id,
            user_name: topic.user_name.clone(),
            user_avatar: topic.user_avatar.clone(),
            category_id: topic.category_id,
            category_name: topic.category_name.clone(),
            updated_at: topic.updated_at.clone(),
            updated_ago: time_ago(&topic.updated_at, now),
        }
    }
}

/// Pager links for a list page.
#[derive(Debug, Serialize)]
pub struct Pager {
    pub page: u32,
    pub last_page: u32,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl Pager {
    pub fn new<T: Serialize>(page: &Paginated<T>, order: &str) -> Self {
        let href = |n: u32| format!("/topics?order={}&page={}", order, n);
        Self {
            page: page.page,
            last_page: page.last_page(),
            prev: page.prev_page().map(href),
            next: page.next_page().map(href),
        }
    }
}

/// Relative "last active" phrase; unparseable input is shown as-is.
pub fn time_ago(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(then) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };
    let then = then.with_timezone(&Utc);
    let seconds = (now - then).num_seconds().max(0);

    match seconds {
        0..=59 => "刚刚".to_string(),
        60..=3_599 => format!("{} 分钟前", seconds / 60),
        3_600..=86_399 => format!("{} 小时前", seconds / 3_600),
        86_400..=2_591_999 => format!("{} 天前", seconds / 86_400),
        _ => then.format("%Y-%m-%d").to_string(),
    }
}

/// One-shot notices carried across a redirect in the `flash` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    TopicCreated,
    TopicUpdated,
    TopicDeleted,
}

pub const FLASH_COOKIE: &str = "flash";

impl Flash {
    pub fn key(&self) -> &'static str {
        match self {
            Flash::TopicCreated => "topic_created",
            Flash::TopicUpdated => "topic_updated",
            Flash::TopicDeleted => "topic_deleted",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "topic_created" => Some(Flash::TopicCreated),
            "topic_updated" => Some(Flash::TopicUpdated),
            "topic_deleted" => Some(Flash::TopicDeleted),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Flash::TopicCreated => "创建话题成功！",
            Flash::TopicUpdated => "更新成功！",
            Flash::TopicDeleted => "成功删除！",
        }
    }
}
