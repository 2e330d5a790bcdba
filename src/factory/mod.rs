//! Fake topic data for tests and demo databases.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rand::{distr::Alphanumeric, seq::IndexedRandom, Rng};

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{NewUser, TopicRecord, User};

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "voluptate",
    "velit", "esse", "cillum", "fugiat", "nulla", "pariatur",
];

/// Attributes for one fake topic.
#[derive(Debug, Clone)]
pub struct FakeTopic {
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FakeTopic {
    pub fn into_record(self, user_id: i64, category_id: i64) -> TopicRecord {
        TopicRecord {
            title: self.title,
            body: self.body,
            excerpt: self.excerpt,
            slug: String::new(),
            category_id,
            user_id,
        }
    }
}

/// A sentence-titled topic last updated some time this month, created no
/// later than that.
pub fn fake_topic<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> FakeTopic {
    let title = sentence(rng);
    let body = (0..rng.random_range(2..=5))
        .map(|_| sentence(rng))
        .collect::<Vec<_>>()
        .join(" ");

    let month_start = start_of_month(now);
    let updated_at = between(rng, month_start, now);
    let created_at = between(rng, month_start, updated_at);

    FakeTopic {
        excerpt: title.clone(),
        title,
        body,
        created_at,
        updated_at,
    }
}

/// Fill an empty database with `count` topics spread over a few demo users.
pub async fn seed_demo(repo: &Repository, count: u32) -> Result<(), AppError> {
    if repo.count_users().await? > 0 {
        tracing::info!("Users exist; skipping demo seed");
        return Ok(());
    }

    let mut users: Vec<User> = Vec::new();
    for (i, name) in ["Summer", "Aufree", "Monkey"].iter().enumerate() {
        let user = repo
            .create_user(&NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                avatar: format!("/uploads/images/avatars/{}.png", i + 1),
                is_admin: i == 0,
                api_token: token(),
            })
            .await?;
        users.push(user);
    }

    let category_ids: Vec<i64> = repo.list_categories().await?.iter().map(|c| c.id).collect();
    let now = Utc::now();

    for _ in 0..count {
        // ThreadRng is not Send; keep it out of the awaits.
        let (topic, user_id, category_id) = {
            let mut rng = rand::rng();
            let user_id = users.choose(&mut rng).map(|u| u.id).unwrap_or_default();
            let category_id = category_ids.choose(&mut rng).copied().unwrap_or(1);
            (fake_topic(&mut rng, now), user_id, category_id)
        };

        let (created_at, updated_at) = (topic.created_at, topic.updated_at);
        repo.insert_topic(topic.into_record(user_id, category_id), created_at, updated_at)
            .await?;
    }

    tracing::info!("Seeded {} demo topics for {} users", count, users.len());
    Ok(())
}

fn sentence<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.random_range(4..=9);
    let words: Vec<&str> = (0..len)
        .filter_map(|_| WORDS.choose(rng).copied())
        .collect();
    let sentence = words.join(" ");
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => ".".to_string(),
    }
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

fn between<R: Rng + ?Sized>(rng: &mut R, from: DateTime<Utc>, to: DateTime<Utc>) -> DateTime<Utc> {
    let span = (to - from).num_seconds();
    if span <= 0 {
        return from;
    }
    from + Duration::seconds(rng.random_range(0..=span))
}

fn token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use rand::{rngs::StdRng, SeedableRng};
    use tempfile::TempDir;

    #[test]
    fn test_fake_topic_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();

        for _ in 0..50 {
            let topic = fake_topic(&mut rng, now);
            assert!(topic.title.ends_with('.'));
            assert_eq!(topic.excerpt, topic.title);
            assert!(!topic.body.is_empty());
            assert!(topic.created_at <= topic.updated_at);
            assert!(topic.updated_at <= now);
            assert_eq!(topic.created_at.month(), 3);
        }
    }

    #[test]
    fn test_same_seed_same_topic() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let a = fake_topic(&mut StdRng::seed_from_u64(1), now);
        let b = fake_topic(&mut StdRng::seed_from_u64(1), now);
        assert_eq!(a.title, b.title);
        assert_eq!(a.updated_at, b.updated_at);
    }

    #[tokio::test]
    async fn test_seed_demo_once() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("seed.sqlite"))
            .await
            .unwrap();
        let repo = Repository::new(pool);

        seed_demo(&repo, 5).await.unwrap();
        assert_eq!(repo.count_users().await.unwrap(), 3);
        let page = repo
            .paginate_topics(crate::models::TopicOrder::Recent, 1, 20)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert!(page.items.iter().all(|t| !t.slug.is_empty()));

        seed_demo(&repo, 5).await.unwrap();
        assert_eq!(repo.count_users().await.unwrap(), 3);
    }
}
