//! In-process store used when no `DATABASE_URL` is configured, and by tests.

use async_trait::async_trait;
use std::{collections::HashMap, time::Duration};
use tokio::sync::RwLock;

use super::models::{Blog, Comment, User};
use super::{Store, StoreError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, User>,
    blogs: HashMap<String, Blog>,
    comments: HashMap<String, Comment>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, then the `offset..offset+limit` window.
fn window<T: Clone>(
    rows: impl Iterator<Item = T>,
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
    offset: i64,
    limit: i64,
) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.users.len() as i64)
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(window(
            tables.users.values().cloned(),
            |u| u.created_at,
            offset,
            limit,
        ))
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate("id".to_string()));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_blog(&self, id: &str) -> Result<Option<Blog>, StoreError> {
        Ok(self.tables.read().await.blogs.get(id).cloned())
    }

    async fn count_blogs(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.blogs.len() as i64)
    }

    async fn list_blogs(&self, offset: i64, limit: i64) -> Result<Vec<Blog>, StoreError> {
        let tables = self.tables.read().await;
        Ok(window(
            tables.blogs.values().cloned(),
            |b| b.created_at,
            offset,
            limit,
        ))
    }

    async fn insert_blog(&self, blog: &Blog) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.blogs.contains_key(&blog.id) {
            return Err(StoreError::Duplicate("id".to_string()));
        }
        tables.blogs.insert(blog.id.clone(), blog.clone());
        Ok(())
    }

    async fn update_blog(&self, blog: &Blog) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.blogs.get_mut(&blog.id) {
            Some(existing) => {
                *existing = blog.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_blog(&self, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.blogs.remove(id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.blog_id != id);
        Ok(true)
    }

    async fn find_comment(&self, id: &str) -> Result<Option<Comment>, StoreError> {
        Ok(self.tables.read().await.comments.get(id).cloned())
    }

    async fn count_comments(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.comments.len() as i64)
    }

    async fn list_comments(&self, offset: i64, limit: i64) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(window(
            tables.comments.values().cloned(),
            |c| c.created_at,
            offset,
            limit,
        ))
    }

    async fn comments_for_blog(&self, blog_id: &str) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(window(
            tables.comments.values().filter(|c| c.blog_id == blog_id).cloned(),
            |c| c.created_at,
            0,
            i64::MAX,
        ))
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.comments.contains_key(&comment.id) {
            return Err(StoreError::Duplicate("id".to_string()));
        }
        tables.comments.insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn delete_comment(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.comments.remove(id).is_some())
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        let start = std::time::Instant::now();
        drop(self.tables.read().await);
        Ok(start.elapsed())
    }
}
