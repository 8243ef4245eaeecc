use crate::api::{parse_page, ErrorResponse, PaginationMetadata};
use crate::auth::MaybeUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::raw_sql::{always_false, count_over};
use crate::schema::users;
use crate::subscribed_to_author;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::profile::UserProfile;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsersListResponse {
    pub users: Vec<UserProfile>,
    pub pagination: PaginationMetadata,
}

#[derive(Queryable)]
struct UserRow {
    email: String,
    id: i32,
    username: String,
    first_name: String,
    last_name: String,
    is_subscribed: bool,
    /// Total count of all matching rows (from window function)
    total_count: i64,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(
        ("limit" = Option<i64>, Query, description = "Number of items to return (default: 20, max: 1000)"),
        ("offset" = Option<i64>, Query, description = "Number of items to skip (default: 0)")
    ),
    responses(
        (status = 200, description = "All users, oldest first", body = UsersListResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse)
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    MaybeUser(viewer): MaybeUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let page = parse_page(&params);

    let mut conn = get_conn!(pool);

    let base = users::table
        .order(users::id.asc())
        .limit(page.limit)
        .offset(page.offset);

    // Anonymous viewers follow nobody, so skip the membership probe
    let result: QueryResult<Vec<UserRow>> = match viewer {
        Some(ref viewer) => base
            .select((
                users::email,
                users::id,
                users::username,
                users::first_name,
                users::last_name,
                subscribed_to_author!(viewer.id),
                count_over(),
            ))
            .load(&mut conn),
        None => base
            .select((
                users::email,
                users::id,
                users::username,
                users::first_name,
                users::last_name,
                always_false(),
                count_over(),
            ))
            .load(&mut conn),
    };

    let rows = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch users: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to fetch users".to_string(),
                }),
            )
                .into_response();
        }
    };

    let total = rows.first().map(|r| r.total_count).unwrap_or(0);

    let users = rows
        .into_iter()
        .map(|r| UserProfile {
            email: r.email,
            id: r.id,
            username: r.username,
            first_name: r.first_name,
            last_name: r.last_name,
            is_subscribed: r.is_subscribed,
        })
        .collect();

    (
        StatusCode::OK,
        Json(UsersListResponse {
            users,
            pagination: PaginationMetadata {
                total,
                limit: page.limit,
                offset: page.offset,
            },
        }),
    )
        .into_response()
}
