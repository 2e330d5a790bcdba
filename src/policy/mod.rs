//! Topic authorization rules.

use crate::models::{Topic, User};

fn owns(user: &User, topic: &Topic) -> bool {
    user.id == topic.user_id
}

/// Author or content manager.
pub fn can_update(user: &User, topic: &Topic) -> bool {
    user.is_admin || owns(user, topic)
}

pub fn can_destroy(user: &User, topic: &Topic) -> bool {
    user.is_admin || owns(user, topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, is_admin: bool) -> User {
        User {
            id,
            name: format!("user{id}"),
            email: format!("user{id}@example.com"),
            avatar: String::new(),
            is_admin,
            api_token: String::new(),
            created_at: String::new(),
        }
    }

    fn topic_by(user_id: i64) -> Topic {
        Topic {
            id: 1,
            title: "t".to_string(),
            body: String::new(),
            excerpt: String::new(),
            slug: "t".to_string(),
            category_id: 1,
            user_id,
            reply_count: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_owner_may_update_and_destroy() {
        let topic = topic_by(7);
        assert!(can_update(&user(7, false), &topic));
        assert!(can_destroy(&user(7, false), &topic));
    }

    #[test]
    fn test_stranger_denied() {
        let topic = topic_by(7);
        assert!(!can_update(&user(8, false), &topic));
        assert!(!can_destroy(&user(8, false), &topic));
    }

    #[test]
    fn test_admin_allowed() {
        let topic = topic_by(7);
        assert!(can_update(&user(1, true), &topic));
        assert!(can_destroy(&user(1, true), &topic));
    }
}
