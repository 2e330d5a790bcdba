//! Users and categories are owned elsewhere; topics only reference them.

use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub avatar: String,
    /// May manage any user's content.
    pub is_admin: bool,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub created_at: String,
}

/// Fields for inserting a user (seeding and tests).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub is_admin: bool,
    pub api_token: String,
}

/// A topic category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// An entry of the site's resource link list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub id: i64,
    pub title: String,
    pub link: String,
}
