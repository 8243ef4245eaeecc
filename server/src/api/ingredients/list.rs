use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Ingredient;
use crate::schema::ingredients;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListIngredientsParams {
    /// Case-insensitive name prefix to match
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientsListResponse {
    pub ingredients: Vec<Ingredient>,
}

// Backslash first, or the escapes added for % and _ get re-escaped
fn prefix_pattern(name: &str) -> String {
    let escaped = name
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{}%", escaped)
}

#[utoipa::path(
    get,
    path = "/api/ingredients",
    tag = "ingredients",
    params(ListIngredientsParams),
    responses(
        (status = 200, description = "Ingredients ordered by name, optionally narrowed by prefix", body = IngredientsListResponse)
    )
)]
pub async fn list_ingredients(
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListIngredientsParams>,
) -> impl IntoResponse {
    // Pre-compute the pattern so it lives long enough for the boxed query
    let pattern = params.name.as_deref().map(prefix_pattern);

    let mut conn = get_conn!(pool);

    let mut query = ingredients::table.into_boxed();

    if let Some(ref pattern) = pattern {
        query = query.filter(ingredients::name.ilike(pattern));
    }

    let ingredients: Vec<Ingredient> = match query
        .select(Ingredient::as_select())
        .order(ingredients::name.asc())
        .load(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch ingredients: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to fetch ingredients".to_string(),
                }),
            )
                .into_response();
        }
    };

    (StatusCode::OK, Json(IngredientsListResponse { ingredients })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_pattern_appends_wildcard() {
        assert_eq!(prefix_pattern("salt"), "salt%");
        assert_eq!(prefix_pattern(""), "%");
    }

    #[test]
    fn test_prefix_pattern_escapes_like_metacharacters() {
        assert_eq!(prefix_pattern("10% cream"), "10\\% cream%");
        assert_eq!(prefix_pattern("under_score"), "under\\_score%");
    }

    #[test]
    fn test_prefix_pattern_escapes_backslash() {
        assert_eq!(prefix_pattern("back\\slash"), "back\\\\slash%");
        assert_eq!(prefix_pattern("trailing\\"), "trailing\\\\%");
    }
}
