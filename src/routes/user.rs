/**
 * User Routes
 */
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::User;
use crate::error::ApiResult;
use crate::page::{Page, PageQuery};
use crate::SharedState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub page: Page,
    pub users: Vec<User>,
}

/// GET /api/users - Registered users, newest first, with digests masked
pub async fn list_users(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<UserListResponse>> {
    let page = Page::new(state.store.count_users().await?, &query.page);
    let users = if page.is_empty() {
        Vec::new()
    } else {
        state
            .store
            .list_users(page.offset, page.limit)
            .await?
            .into_iter()
            .map(User::masked)
            .collect()
    };
    Ok(Json(UserListResponse { page, users }))
}
