/**
 * Comment Routes
 * Signed-in users comment on blogs; admins list and delete
 */
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{models::Comment, next_id};
use crate::error::{ApiError, ApiResult};
use crate::page::{Page, PageQuery};
use crate::routes::{auth::CurrentUser, required, DeletedResponse};
use crate::SharedState;

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentListResponse {
    pub page: Page,
    pub comments: Vec<Comment>,
}

/// POST /api/blogs/{id}/comments - Comment as the signed-in user
pub async fn create_comment(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(blog_id): Path<String>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<Json<Comment>> {
    let user = current.require()?;
    let Json(payload) = payload?;
    let content = required("content", &payload.content, "content cannot be empty")?;

    if state.store.find_blog(&blog_id).await?.is_none() {
        return Err(ApiError::not_found("Blog"));
    }

    let comment = Comment {
        id: next_id(),
        blog_id,
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_image: user.image.clone(),
        content,
        created_at: Utc::now(),
    };
    state.store.insert_comment(&comment).await?;

    tracing::info!(comment_id = %comment.id, blog_id = %comment.blog_id, "comment created");
    Ok(Json(comment))
}

/// GET /api/comments - All comments, newest first
pub async fn list_comments(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<CommentListResponse>> {
    let page = Page::new(state.store.count_comments().await?, &query.page);
    let comments = if page.is_empty() {
        Vec::new()
    } else {
        state.store.list_comments(page.offset, page.limit).await?
    };
    Ok(Json(CommentListResponse { page, comments }))
}

/// POST /api/comments/{id}/delete - Remove a comment (admin only)
pub async fn delete_comment(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    current.require_admin()?;

    let comment = state
        .store
        .find_comment(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))?;

    if !state.store.delete_comment(&comment.id).await? {
        return Err(ApiError::not_found("Comment"));
    }

    tracing::info!(comment_id = %id, blog_id = %comment.blog_id, "comment deleted");
    Ok(Json(DeletedResponse { id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Blog;
    use crate::routes::testing;
    use axum::http::StatusCode;
    use serde_json::json;

    async fn seed_blog(state: &SharedState) -> Blog {
        let blog = Blog {
            id: next_id(),
            user_id: "author".to_string(),
            user_name: "Author".to_string(),
            user_image: String::new(),
            name: "post".to_string(),
            summary: "s".to_string(),
            content: "c".to_string(),
            created_at: Utc::now(),
        };
        state.store.insert_blog(&blog).await.unwrap();
        blog
    }

    #[tokio::test]
    async fn test_signed_in_user_comments() {
        let state = testing::state();
        let blog = seed_blog(&state).await;
        let (reader, cookie) = testing::signed_in(&state, "Reader", false).await;

        let (status, bytes) = testing::post_json(
            testing::app(&state),
            &format!("/api/blogs/{}/comments", blog.id),
            Some(&cookie),
            &json!({ "content": "  great read  " }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let comment: Comment = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(comment.content, "great read");
        assert_eq!(comment.blog_id, blog.id);
        assert_eq!(comment.user_id, reader.id);
        assert_eq!(comment.user_name, "Reader");
    }

    #[tokio::test]
    async fn test_anonymous_comment_is_forbidden() {
        let state = testing::state();
        let blog = seed_blog(&state).await;

        let (status, bytes) = testing::post_json(
            testing::app(&state),
            &format!("/api/blogs/{}/comments", blog.id),
            None,
            &json!({ "content": "hi" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(testing::json(&bytes)["error"], "permission:forbidden");
        assert_eq!(state.store.count_comments().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_bad_body_is_forbidden() {
        let state = testing::state();
        let blog = seed_blog(&state).await;

        let (status, bytes) = testing::post_raw(
            testing::app(&state),
            &format!("/api/blogs/{}/comments", blog.id),
            None,
            "text/plain",
            "hello",
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(testing::json(&bytes)["error"], "permission:forbidden");
    }

    #[tokio::test]
    async fn test_blank_comment_is_value_error() {
        let state = testing::state();
        let blog = seed_blog(&state).await;
        let (_, cookie) = testing::signed_in(&state, "Reader", false).await;

        let (status, bytes) = testing::post_json(
            testing::app(&state),
            &format!("/api/blogs/{}/comments", blog.id),
            Some(&cookie),
            &json!({ "content": " \n " }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(testing::json(&bytes)["data"], "content");
    }

    #[tokio::test]
    async fn test_comment_on_missing_blog_is_not_found() {
        let state = testing::state();
        let (_, cookie) = testing::signed_in(&state, "Reader", false).await;

        let (status, bytes) = testing::post_json(
            testing::app(&state),
            "/api/blogs/missing/comments",
            Some(&cookie),
            &json!({ "content": "hello" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(testing::json(&bytes)["error"], "value:notfound");
    }

    #[tokio::test]
    async fn test_list_and_delete_comments() {
        let state = testing::state();
        let blog = seed_blog(&state).await;
        let (_, reader) = testing::signed_in(&state, "Reader", false).await;
        let (_, owner) = testing::signed_in(&state, "Owner", true).await;

        let (_, bytes) = testing::post_json(
            testing::app(&state),
            &format!("/api/blogs/{}/comments", blog.id),
            Some(&reader),
            &json!({ "content": "first" }),
        )
        .await;
        let comment: Comment = serde_json::from_slice(&bytes).unwrap();

        let (status, bytes) = testing::get(testing::app(&state), "/api/comments", None).await;
        assert_eq!(status, StatusCode::OK);
        let listing: CommentListResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(listing.page.item_count, 1);
        assert_eq!(listing.comments, vec![comment.clone()]);

        let uri = format!("/api/comments/{}/delete", comment.id);
        let (status, _) =
            testing::post_json(testing::app(&state), &uri, Some(&reader), &json!({})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, bytes) =
            testing::post_json(testing::app(&state), &uri, Some(&owner), &json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(testing::json(&bytes)["id"], comment.id);

        let (status, bytes) =
            testing::post_json(testing::app(&state), &uri, Some(&owner), &json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(testing::json(&bytes)["error"], "value:notfound");
        assert!(state.store.find_comment(&comment.id).await.unwrap().is_none());
    }
}
