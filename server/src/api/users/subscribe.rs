use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::relations::{add_flag, remove_flag, FollowFlag};
use crate::schema::recipes;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use std::sync::Arc;

use super::profile::{parse_recipes_limit, recipes_for_authors, UserWithRecipes};

#[utoipa::path(
    post,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID to follow"),
        ("recipes_limit" = Option<usize>, Query, description = "Max recipe cards in the response; invalid values are ignored")
    ),
    responses(
        (status = 201, description = "Now following the user", body = UserWithRecipes),
        (status = 400, description = "Already following", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn subscribe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<i32>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let recipes_limit = parse_recipes_limit(&params);

    let mut conn = get_conn!(pool);

    let author = match add_flag::<FollowFlag>(&mut conn, user.id, id) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };

    let recipes_count: i64 = match recipes::table
        .filter(recipes::author_id.eq(author.id))
        .count()
        .get_result(&mut conn)
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Failed to count recipes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to fetch followed user".to_string(),
                }),
            )
                .into_response();
        }
    };

    let mut recipes_by_author = match recipes_for_authors(&mut conn, &[author.id], recipes_limit)
    {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to fetch recipes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to fetch followed user".to_string(),
                }),
            )
                .into_response();
        }
    };

    let response = UserWithRecipes {
        email: author.email,
        id: author.id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed: true,
        recipes: recipes_by_author.remove(&author.id).unwrap_or_default(),
        recipes_count,
    };

    (StatusCode::CREATED, Json(response)).into_response()
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID to unfollow")
    ),
    responses(
        (status = 204, description = "No longer following the user"),
        (status = 400, description = "Not following", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn unsubscribe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match remove_flag::<FollowFlag>(&mut conn, user.id, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
