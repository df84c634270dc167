//! Data-access layer: the `Store` contract the handlers depend on, plus the
//! Postgres pool helpers and id generation.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

use models::{Blog, Comment, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique column already holds this value.
    #[error("duplicate value for {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence contract. Every call is atomic on its own; nothing spans calls.
/// Listings are ordered by `created_at` descending.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn count_users(&self) -> Result<i64, StoreError>;
    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError>;
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>, StoreError>;
    async fn count_blogs(&self) -> Result<i64, StoreError>;
    async fn list_blogs(&self, offset: i64, limit: i64) -> Result<Vec<Blog>, StoreError>;
    async fn insert_blog(&self, blog: &Blog) -> Result<(), StoreError>;
    /// Returns `false` when no row has `blog.id`.
    async fn update_blog(&self, blog: &Blog) -> Result<bool, StoreError>;
    /// Removes the blog and its comments. Returns `false` when absent.
    async fn delete_blog(&self, id: &str) -> Result<bool, StoreError>;

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>, StoreError>;
    async fn count_comments(&self) -> Result<i64, StoreError>;
    async fn list_comments(&self, offset: i64, limit: i64) -> Result<Vec<Comment>, StoreError>;
    async fn comments_for_blog(&self, blog_id: &str) -> Result<Vec<Comment>, StoreError>;
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError>;
    async fn delete_comment(&self, id: &str) -> Result<bool, StoreError>;

    /// Round-trip latency probe for health checks.
    async fn ping(&self) -> Result<Duration, StoreError>;
}

/// Fresh row id: 15-digit epoch millis, 32 hex chars of uuid v4, `000`.
/// Sorts by creation time and never contains `-`, which the session token
/// uses as its field separator.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

pub async fn init_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}
