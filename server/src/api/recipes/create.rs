use crate::api::recipes::detail::{load_detail, RecipeDetail};
use crate::api::recipes::payload::{insert_relations, validate, verify_references, RecipePayload};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::models::NewRecipe;
use crate::schema::recipes;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = RecipePayload,
    responses(
        (status = 201, description = "Recipe created successfully", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Referenced tag or ingredient not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(mut payload): Json<RecipePayload>,
) -> impl IntoResponse {
    if let Err(e) = validate(&mut payload) {
        return e.into_response();
    }

    let mut conn = get_conn!(pool);

    // Reference checks and all three inserts commit atomically
    let result: Result<i32, ApiError> = conn.transaction(|conn| {
        verify_references(conn, &payload)?;

        let new_recipe = NewRecipe {
            author_id: user.id,
            name: &payload.name,
            image: &payload.image,
            text: &payload.text,
            cooking_time: payload.cooking_time,
        };

        let recipe_id: i32 = diesel::insert_into(recipes::table)
            .values(&new_recipe)
            .returning(recipes::id)
            .get_result(conn)?;

        insert_relations(conn, recipe_id, &payload)?;

        Ok(recipe_id)
    });

    let recipe_id = match result {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match load_detail(&mut conn, Some(user.id), recipe_id) {
        Ok(Some(recipe)) => (StatusCode::CREATED, Json(recipe)).into_response(),
        Ok(None) => {
            tracing::error!("Recipe {} missing right after insert", recipe_id);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch created recipe: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}
