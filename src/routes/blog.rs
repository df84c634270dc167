/**
 * Blog Routes
 * Paginated listings, detail view and admin-only create/update/delete
 */
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{
    models::{Blog, Comment, MAX_NAME_LEN, MAX_SUMMARY_LEN},
    next_id, Store,
};
use crate::error::{ApiError, ApiResult};
use crate::page::{Page, PageQuery};
use crate::render::{markdown_to_html, text_to_html};
use crate::routes::{auth::CurrentUser, required, within_limit, DeletedResponse};
use crate::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body for POST /api/blogs and POST /api/blogs/{id}
#[derive(Debug, Deserialize, Serialize)]
pub struct BlogRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
}

/// Response for GET / and GET /api/blogs
#[derive(Debug, Serialize, Deserialize)]
pub struct BlogListResponse {
    pub page: Page,
    pub blogs: Vec<Blog>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlogView {
    #[serde(flatten)]
    pub blog: Blog,
    pub html_content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub html_content: String,
}

/// Response for GET /blog/{id}
#[derive(Debug, Serialize, Deserialize)]
pub struct BlogDetailResponse {
    pub blog: BlogView,
    pub comments: Vec<CommentView>,
}

/// Validated name, summary and content, trimmed.
fn validate(payload: &BlogRequest) -> ApiResult<(String, String, String)> {
    let name = required("name", &payload.name, "name cannot be empty")?;
    let summary = required("summary", &payload.summary, "summary cannot be empty")?;
    let content = required("content", &payload.content, "content cannot be empty")?;
    Ok((
        within_limit("name", name, MAX_NAME_LEN)?,
        within_limit("summary", summary, MAX_SUMMARY_LEN)?,
        content,
    ))
}

async fn blog_page(store: &dyn Store, requested: &str) -> ApiResult<BlogListResponse> {
    let page = Page::new(store.count_blogs().await?, requested);
    let blogs = if page.is_empty() {
        Vec::new()
    } else {
        store.list_blogs(page.offset, page.limit).await?
    };
    Ok(BlogListResponse { page, blogs })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - Front page view-model
pub async fn index(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<BlogListResponse>> {
    Ok(Json(blog_page(state.store.as_ref(), &query.page).await?))
}

/// GET /api/blogs - List blogs with pagination
pub async fn list_blogs(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<BlogListResponse>> {
    Ok(Json(blog_page(state.store.as_ref(), &query.page).await?))
}

/// GET /api/blogs/{id} - Single blog
pub async fn get_blog(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Blog>> {
    state
        .store
        .find_blog(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Blog"))
}

/// GET /blog/{id} - Blog with rendered body and its comments, newest first
pub async fn blog_detail(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BlogDetailResponse>> {
    let blog = state
        .store
        .find_blog(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog"))?;

    let comments = state
        .store
        .comments_for_blog(&id)
        .await?
        .into_iter()
        .map(|comment| CommentView {
            html_content: text_to_html(&comment.content),
            comment,
        })
        .collect();

    Ok(Json(BlogDetailResponse {
        blog: BlogView {
            html_content: markdown_to_html(&blog.content),
            blog,
        },
        comments,
    }))
}

/// POST /api/blogs - Create blog (admin only)
pub async fn create_blog(
    State(state): State<SharedState>,
    current: CurrentUser,
    payload: Result<Json<BlogRequest>, JsonRejection>,
) -> ApiResult<Json<Blog>> {
    let author = current.require_admin()?;
    let Json(payload) = payload?;
    let (name, summary, content) = validate(&payload)?;

    let blog = Blog {
        id: next_id(),
        user_id: author.id.clone(),
        user_name: author.name.clone(),
        user_image: author.image.clone(),
        name,
        summary,
        content,
        created_at: Utc::now(),
    };
    state.store.insert_blog(&blog).await?;

    tracing::info!(blog_id = %blog.id, user_id = %author.id, "blog created");
    Ok(Json(blog))
}

/// POST /api/blogs/{id} - Update blog in place (admin only)
pub async fn update_blog(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<BlogRequest>, JsonRejection>,
) -> ApiResult<Json<Blog>> {
    current.require_admin()?;
    let Json(payload) = payload?;
    let (name, summary, content) = validate(&payload)?;

    let mut blog = state
        .store
        .find_blog(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog"))?;
    blog.name = name;
    blog.summary = summary;
    blog.content = content;

    if !state.store.update_blog(&blog).await? {
        return Err(ApiError::not_found("Blog"));
    }

    tracing::info!(blog_id = %blog.id, "blog updated");
    Ok(Json(blog))
}

/// POST /api/blogs/{id}/delete - Delete blog and its comments (admin only)
pub async fn delete_blog(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    current.require_admin()?;

    if !state.store.delete_blog(&id).await? {
        return Err(ApiError::not_found("Blog"));
    }

    tracing::info!(blog_id = %id, "blog deleted");
    Ok(Json(DeletedResponse { id }))
}
