//! Postgres-backed `Store`.

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::{Duration, Instant};

use super::models::{Blog, Comment, User};
use super::{Store, StoreError};

const USER_COLUMNS: &str = "id, email, passwd, admin, name, image, created_at";
const BLOG_COLUMNS: &str = "id, user_id, user_name, user_image, name, summary, content, created_at";
const COMMENT_COLUMNS: &str = "id, blog_id, user_id, user_name, user_image, content, created_at";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id VARCHAR(50) PRIMARY KEY,
        email VARCHAR(50) NOT NULL,
        passwd VARCHAR(50) NOT NULL,
        admin BOOLEAN NOT NULL DEFAULT false,
        name VARCHAR(50) NOT NULL,
        image VARCHAR(500) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email)",
    "CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS blogs (
        id VARCHAR(50) PRIMARY KEY,
        user_id VARCHAR(50) NOT NULL,
        user_name VARCHAR(50) NOT NULL,
        user_image VARCHAR(500) NOT NULL,
        name VARCHAR(50) NOT NULL,
        summary VARCHAR(200) NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_blogs_created_at ON blogs(created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id VARCHAR(50) PRIMARY KEY,
        blog_id VARCHAR(50) NOT NULL,
        user_id VARCHAR(50) NOT NULL,
        user_name VARCHAR(50) NOT NULL,
        user_image VARCHAR(500) NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_comments_blog_id ON comments(blog_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_created_at ON comments(created_at DESC)",
];

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        tracing::info!("Running database migrations...");

        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        tracing::info!("Database migrations completed successfully");
        Ok(())
    }
}

/// Maps a unique-constraint violation to `StoreError::Duplicate(field)`.
fn duplicate_as(field: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(field.to_string())
        }
        _ => StoreError::Database(err),
    }
}

async fn count(pool: &PgPool, table: &str) -> Result<i64, StoreError> {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(id) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(n)
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        count(&self.pool, "users").await
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.passwd)
        .bind(user.admin)
        .bind(&user.name)
        .bind(&user.image)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(duplicate_as("email"))?;
        Ok(())
    }

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>, StoreError> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(blog)
    }

    async fn count_blogs(&self) -> Result<i64, StoreError> {
        count(&self.pool, "blogs").await
    }

    async fn list_blogs(&self, offset: i64, limit: i64) -> Result<Vec<Blog>, StoreError> {
        let blogs = sqlx::query_as::<_, Blog>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(blogs)
    }

    async fn insert_blog(&self, blog: &Blog) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO blogs ({BLOG_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(&blog.id)
        .bind(&blog.user_id)
        .bind(&blog.user_name)
        .bind(&blog.user_image)
        .bind(&blog.name)
        .bind(&blog.summary)
        .bind(&blog.content)
        .bind(blog.created_at)
        .execute(&self.pool)
        .await
        .map_err(duplicate_as("id"))?;
        Ok(())
    }

    async fn update_blog(&self, blog: &Blog) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE blogs SET name = $1, summary = $2, content = $3 WHERE id = $4",
        )
        .bind(&blog.name)
        .bind(&blog.summary)
        .bind(&blog.content)
        .bind(&blog.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_blog(&self, id: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE blog_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn count_comments(&self) -> Result<i64, StoreError> {
        count(&self.pool, "comments").await
    }

    async fn list_comments(&self, offset: i64, limit: i64) -> Result<Vec<Comment>, StoreError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn comments_for_blog(&self, blog_id: &str) -> Result<Vec<Comment>, StoreError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE blog_id = $1 ORDER BY created_at DESC"
        ))
        .bind(blog_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(&comment.id)
        .bind(&comment.blog_id)
        .bind(&comment.user_id)
        .bind(&comment.user_name)
        .bind(&comment.user_image)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(duplicate_as("id"))?;
        Ok(())
    }

    async fn delete_comment(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        let start = Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }
}
