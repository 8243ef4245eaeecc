use crate::api::{parse_page, ErrorResponse, PaginationMetadata};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::raw_sql::{always_true, count_over, recipes_count};
use crate::schema::{follows, users};
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

use super::profile::{parse_recipes_limit, recipes_for_authors, UserWithRecipes};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<UserWithRecipes>,
    pub pagination: PaginationMetadata,
}

#[derive(Queryable)]
struct AuthorRow {
    email: String,
    id: i32,
    username: String,
    first_name: String,
    last_name: String,
    is_subscribed: bool,
    recipes_count: i64,
    /// Total count of all matching rows (from window function)
    total_count: i64,
}

#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    tag = "users",
    params(
        ("limit" = Option<i64>, Query, description = "Number of items to return (default: 20, max: 1000)"),
        ("offset" = Option<i64>, Query, description = "Number of items to skip (default: 0)"),
        ("recipes_limit" = Option<usize>, Query, description = "Max recipe cards per author; invalid values are ignored")
    ),
    responses(
        (status = 200, description = "Authors the caller follows, with their recipes", body = SubscriptionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_subscriptions(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let page = parse_page(&params);
    let recipes_limit = parse_recipes_limit(&params);

    let mut conn = get_conn!(pool);

    // Every row is a followed author, so is_subscribed is constant TRUE
    let rows: Vec<AuthorRow> = match follows::table
        .inner_join(users::table.on(users::id.eq(follows::author_id)))
        .filter(follows::user_id.eq(user.id))
        .order(users::id.asc())
        .limit(page.limit)
        .offset(page.offset)
        .select((
            users::email,
            users::id,
            users::username,
            users::first_name,
            users::last_name,
            always_true(),
            recipes_count(),
            count_over(),
        ))
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch subscriptions: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to fetch subscriptions".to_string(),
                }),
            )
                .into_response();
        }
    };

    let total = rows.first().map(|r| r.total_count).unwrap_or(0);
    let author_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

    let mut recipes_by_author =
        match recipes_for_authors(&mut conn, &author_ids, recipes_limit) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("Failed to fetch subscription recipes: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        code: "internal_error".to_string(),
                        error: "Failed to fetch subscriptions".to_string(),
                    }),
                )
                    .into_response();
            }
        };

    let subscriptions = rows
        .into_iter()
        .map(|r| UserWithRecipes {
            email: r.email,
            id: r.id,
            username: r.username,
            first_name: r.first_name,
            last_name: r.last_name,
            is_subscribed: r.is_subscribed,
            recipes: recipes_by_author.remove(&r.id).unwrap_or_default(),
            recipes_count: r.recipes_count,
        })
        .collect();

    (
        StatusCode::OK,
        Json(SubscriptionsResponse {
            subscriptions,
            pagination: PaginationMetadata {
                total,
                limit: page.limit,
                offset: page.offset,
            },
        }),
    )
        .into_response()
}
