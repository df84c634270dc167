//! Database Models - rows shared by the Postgres and in-memory stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder that replaces a password digest before a user leaves the
/// server.
pub const MASKED_PASSWORD: &str = "******";

/// Column widths of the `VARCHAR` fields. Handlers reject longer input.
pub const MAX_EMAIL_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_SUMMARY_LEN: usize = 200;

/// User model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// `SHA1(id + ":" + client digest)` in hex, or [`MASKED_PASSWORD`].
    pub passwd: String,
    pub admin: bool,
    pub name: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn masked(mut self) -> Self {
        self.passwd = MASKED_PASSWORD.to_string();
        self
    }
}

/// Blog post model. Author fields are copied in at creation time.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Blog {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: String,
    pub name: String,
    pub summary: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Comment model. Commenter fields are copied in at creation time.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub blog_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
