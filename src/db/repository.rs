//! Database repository for CRUD operations.
//!
//! Every topic write goes through the lifecycle hooks before it reaches SQL.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};

use crate::content::{disambiguate, DashSlugTranslator, SlugTranslator, RESERVED_SLUGS};
use crate::errors::AppError;
use crate::lifecycle;
use crate::models::{
    page_offset, Category, Link, NewUser, Paginated, Topic, TopicOrder, TopicRecord,
    TopicSummary, User,
};

/// Attempts at inserting a topic before a slug conflict is reported.
const SLUG_ATTEMPTS: usize = 3;

const TOPIC_COLUMNS: &str = "id, title, body, excerpt, slug, category_id, user_id, reply_count, created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, avatar, is_admin, api_token, created_at";

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    translator: Arc<dyn SlugTranslator>,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_translator(pool, Arc::new(DashSlugTranslator))
    }

    pub fn with_translator(pool: SqlitePool, translator: Arc<dyn SlugTranslator>) -> Self {
        Self { pool, translator }
    }

    // ==================== USER OPERATIONS ====================

    /// Get a user by ID.
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Create a user.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, AppError> {
        let now = timestamp(Utc::now());

        let result = sqlx::query(
            "INSERT INTO users (name, email, avatar, is_admin, api_token, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.avatar)
        .bind(user.is_admin as i32)
        .bind(&user.api_token)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            is_admin: user.is_admin,
            api_token: user.api_token.clone(),
            created_at: now,
        })
    }

    pub async fn count_users(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Users with the most topics created since `since`.
    pub async fn active_users(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(
            r#"SELECT u.id, u.name, u.email, u.avatar, u.is_admin, u.api_token, u.created_at,
                      COUNT(t.id) AS topic_count
               FROM users u
               JOIN topics t ON t.user_id = u.id
               WHERE t.created_at >= ?
               GROUP BY u.id
               ORDER BY topic_count DESC, u.id
               LIMIT ?"#,
        )
        .bind(timestamp(since))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    // ==================== CATEGORY & LINK OPERATIONS ====================

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query("SELECT id, name, description FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        let row = sqlx::query("SELECT id, name, description FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// List all site links.
    pub async fn list_links(&self) -> Result<Vec<Link>, AppError> {
        let rows = sqlx::query("SELECT id, title, link FROM links ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Link {
                id: row.get("id"),
                title: row.get("title"),
                link: row.get("link"),
            })
            .collect())
    }

    pub async fn create_link(&self, title: &str, link: &str) -> Result<Link, AppError> {
        let result = sqlx::query("INSERT INTO links (title, link) VALUES (?, ?)")
            .bind(title)
            .bind(link)
            .execute(&self.pool)
            .await?;

        Ok(Link {
            id: result.last_insert_rowid(),
            title: title.to_string(),
            link: link.to_string(),
        })
    }

    // ==================== TOPIC OPERATIONS ====================

    /// One page of topics in the requested order.
    pub async fn paginate_topics(
        &self,
        order: TopicOrder,
        page: u32,
        per_page: u32,
    ) -> Result<Paginated<TopicSummary>, AppError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM topics")
            .fetch_one(&self.pool)
            .await?
            .get("n");

        let sql = format!(
            r#"SELECT t.id, t.title, t.slug, t.reply_count, t.user_id, t.category_id,
                      t.created_at, t.updated_at,
                      u.name AS user_name, u.avatar AS user_avatar,
                      c.name AS category_name
               FROM topics t
               JOIN users u ON u.id = t.user_id
               JOIN categories c ON c.id = t.category_id
               ORDER BY {}
               LIMIT ? OFFSET ?"#,
            order.order_by()
        );

        let rows = sqlx::query(&sql)
            .bind(per_page as i64)
            .bind(page_offset(page, per_page))
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(|row| TopicSummary {
                id: row.get("id"),
                title: row.get("title"),
                slug: row.get("slug"),
                reply_count: row.get("reply_count"),
                user_id: row.get("user_id"),
                user_name: row.get("user_name"),
                user_avatar: row.get("user_avatar"),
                category_id: row.get("category_id"),
                category_name: row.get("category_name"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect();

        Ok(Paginated {
            items,
            page: page.max(1),
            per_page,
            total,
        })
    }

    /// Get a topic by ID.
    pub async fn get_topic(&self, id: i64) -> Result<Option<Topic>, AppError> {
        let row = sqlx::query(&format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(topic_from_row))
    }

    /// Get a topic by its slug.
    pub async fn find_topic_by_slug(&self, slug: &str) -> Result<Option<Topic>, AppError> {
        let row = sqlx::query(&format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(topic_from_row))
    }

    /// `base` if no topic uses it, otherwise the first free `base-N`.
    pub async fn available_slug(&self, base: &str) -> Result<String, AppError> {
        let rows = sqlx::query("SELECT slug FROM topics WHERE slug = ? OR slug LIKE ?")
            .bind(base)
            .bind(format!("{}-%", base))
            .fetch_all(&self.pool)
            .await?;

        let taken: Vec<String> = rows.iter().map(|row| row.get("slug")).collect();
        let taken = taken
            .iter()
            .map(String::as_str)
            .chain(RESERVED_SLUGS.iter().copied());
        Ok(disambiguate(base, taken))
    }

    /// Create a topic stamped with the current time.
    pub async fn create_topic(&self, record: TopicRecord) -> Result<Topic, AppError> {
        let now = Utc::now();
        self.insert_topic(record, now, now).await
    }

    /// Create a topic with explicit timestamps.
    pub async fn insert_topic(
        &self,
        mut record: TopicRecord,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Topic, AppError> {
        lifecycle::saving(&mut record, self.translator.as_ref());

        let created_at = timestamp(created_at);
        let updated_at = timestamp(updated_at);
        let base_slug = record.slug.clone();

        for attempt in 1..=SLUG_ATTEMPTS {
            let slug = self.available_slug(&base_slug).await?;

            let result = sqlx::query(
                r#"INSERT INTO topics (
                    title, body, excerpt, slug, category_id, user_id, reply_count,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)"#,
            )
            .bind(&record.title)
            .bind(&record.body)
            .bind(&record.excerpt)
            .bind(&slug)
            .bind(record.category_id)
            .bind(record.user_id)
            .bind(&created_at)
            .bind(&updated_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) => {
                    return Ok(Topic {
                        id: done.last_insert_rowid(),
                        title: record.title,
                        body: record.body,
                        excerpt: record.excerpt,
                        slug,
                        category_id: record.category_id,
                        user_id: record.user_id,
                        reply_count: 0,
                        created_at,
                        updated_at,
                    });
                }
                Err(err) if is_unique_violation(&err) => {
                    tracing::warn!(
                        "Slug {} taken concurrently (attempt {}/{})",
                        slug,
                        attempt,
                        SLUG_ATTEMPTS
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(format!(
            "Could not allocate a unique slug for {:?}",
            base_slug
        )))
    }

    /// Apply title, body and category changes to an existing topic.
    ///
    /// Last write wins; there is no version check.
    pub async fn update_topic(&self, id: i64, changes: TopicRecord) -> Result<Topic, AppError> {
        let existing = self
            .get_topic(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))?;

        let mut record = existing.to_record();
        record.title = changes.title;
        record.body = changes.body;
        record.category_id = changes.category_id;

        lifecycle::updating(&record);
        lifecycle::saving(&mut record, self.translator.as_ref());

        // Only a legacy row without a slug gets one here; it must not collide.
        if existing.slug.is_empty() {
            record.slug = self.available_slug(&record.slug).await?;
        }

        let updated_at = timestamp(Utc::now());

        let result = sqlx::query(
            r#"UPDATE topics SET
                title = ?, body = ?, excerpt = ?, slug = ?, category_id = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(&record.title)
        .bind(&record.body)
        .bind(&record.excerpt)
        .bind(&record.slug)
        .bind(record.category_id)
        .bind(&updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Topic {} not found", id)));
        }

        Ok(Topic {
            id,
            title: record.title,
            body: record.body,
            excerpt: record.excerpt,
            slug: record.slug,
            category_id: record.category_id,
            user_id: existing.user_id,
            reply_count: existing.reply_count,
            created_at: existing.created_at,
            updated_at,
        })
    }

    /// Delete a topic.
    pub async fn delete_topic(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Topic {} not found", id)));
        }

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let is_admin: i32 = row.get("is_admin");
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        avatar: row.get("avatar"),
        is_admin: is_admin != 0,
        api_token: row.get("api_token"),
        created_at: row.get("created_at"),
    }
}

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
    }
}

fn topic_from_row(row: &sqlx::sqlite::SqliteRow) -> Topic {
    Topic {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        excerpt: row.get("excerpt"),
        slug: row.get("slug"),
        category_id: row.get("category_id"),
        user_id: row.get("user_id"),
        reply_count: row.get("reply_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn setup() -> (Repository, User, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("repo.sqlite"))
            .await
            .unwrap();
        let repo = Repository::new(pool);
        let user = repo
            .create_user(&NewUser {
                name: "author".to_string(),
                email: "author@example.com".to_string(),
                avatar: String::new(),
                is_admin: false,
                api_token: "secret".to_string(),
            })
            .await
            .unwrap();
        (repo, user, temp_dir)
    }

    fn record(title: &str, body: &str, user: &User) -> TopicRecord {
        TopicRecord {
            title: title.to_string(),
            body: body.to_string(),
            category_id: 1,
            user_id: user.id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_categories_seeded() {
        let (repo, _, _dir) = setup().await;
        let categories = repo.list_categories().await.unwrap();
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["分享", "教程", "问答", "公告"]);
    }

    #[tokio::test]
    async fn test_create_runs_save_hook() {
        let (repo, user, _dir) = setup().await;
        let topic = repo
            .create_topic(record(
                "Hook Check",
                "<p>kept</p><script>dropped()</script>",
                &user,
            ))
            .await
            .unwrap();

        assert_eq!(topic.body, "<p>kept</p>");
        assert_eq!(topic.excerpt, "kept");
        assert_eq!(topic.slug, "hook-check");

        let stored = repo.get_topic(topic.id).await.unwrap().unwrap();
        assert_eq!(stored, topic);
    }

    #[tokio::test]
    async fn test_duplicate_titles_get_suffixed_slugs() {
        let (repo, user, _dir) = setup().await;
        let a = repo.create_topic(record("Same", "<p>a</p>", &user)).await.unwrap();
        let b = repo.create_topic(record("Same", "<p>b</p>", &user)).await.unwrap();
        let c = repo.create_topic(record("Same", "<p>c</p>", &user)).await.unwrap();

        assert_eq!(a.slug, "same");
        assert_eq!(b.slug, "same-2");
        assert_eq!(c.slug, "same-3");
        assert_eq!(
            repo.find_topic_by_slug("same-2").await.unwrap().unwrap().id,
            b.id
        );
    }

    #[tokio::test]
    async fn test_update_keeps_slug_and_recomputes_excerpt() {
        let (repo, user, _dir) = setup().await;
        let topic = repo
            .create_topic(record("Original", "<p>first</p>", &user))
            .await
            .unwrap();

        let updated = repo
            .update_topic(topic.id, record("Renamed", "<p>second</p>", &user))
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.slug, "original");
        assert_eq!(updated.excerpt, "second");
        assert_eq!(updated.created_at, topic.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_topic() {
        let (repo, user, _dir) = setup().await;
        let err = repo
            .update_topic(404, record("Nope", "<p>nope</p>", &user))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pagination_and_order() {
        let (repo, user, _dir) = setup().await;
        let base = Utc::now() - chrono::Duration::days(1);
        for i in 0..3 {
            // Created in order 0,1,2; updated in reverse.
            repo.insert_topic(
                record(&format!("Topic {i}"), "<p>body</p>", &user),
                base + chrono::Duration::minutes(i),
                base + chrono::Duration::minutes(10 - i),
            )
            .await
            .unwrap();
        }

        let recent = repo
            .paginate_topics(TopicOrder::Recent, 1, 2)
            .await
            .unwrap();
        assert_eq!(recent.total, 3);
        assert_eq!(recent.last_page(), 2);
        let titles: Vec<_> = recent.items.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Topic 2", "Topic 1"]);
        assert_eq!(recent.items[0].user_name, "author");
        assert_eq!(recent.items[0].category_name, "分享");

        let active = repo
            .paginate_topics(TopicOrder::RecentReplied, 2, 2)
            .await
            .unwrap();
        let titles: Vec<_> = active.items.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Topic 2"]);
    }

    #[tokio::test]
    async fn test_active_users_window() {
        let (repo, user, _dir) = setup().await;
        let old = Utc::now() - chrono::Duration::days(30);
        repo.insert_topic(record("Old", "<p>old</p>", &user), old, old)
            .await
            .unwrap();

        let since = Utc::now() - chrono::Duration::days(7);
        assert!(repo.active_users(since, 6).await.unwrap().is_empty());

        repo.create_topic(record("New", "<p>new</p>", &user))
            .await
            .unwrap();
        let active = repo.active_users(since, 6).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, user.id);
    }

    #[tokio::test]
    async fn test_delete_topic() {
        let (repo, user, _dir) = setup().await;
        let topic = repo
            .create_topic(record("Doomed", "<p>bye</p>", &user))
            .await
            .unwrap();

        repo.delete_topic(topic.id).await.unwrap();
        assert!(repo.get_topic(topic.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_topic(topic.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
