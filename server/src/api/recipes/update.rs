use crate::api::recipes::detail::{load_detail, RecipeDetail};
use crate::api::recipes::payload::{insert_relations, validate, verify_references, RecipePayload};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::{ApiError, Target};
use crate::get_conn;
use crate::schema::{recipe_ingredients, recipe_tags, recipes};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use std::sync::Arc;

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    request_body = RecipePayload,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the recipe's author", body = ErrorResponse),
        (status = 404, description = "Recipe, tag, or ingredient not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<i32>,
    Json(mut payload): Json<RecipePayload>,
) -> impl IntoResponse {
    if let Err(e) = validate(&mut payload) {
        return e.into_response();
    }

    let mut conn = get_conn!(pool);

    let result: Result<(), ApiError> = conn.transaction(|conn| {
        let author_id: i32 = recipes::table
            .find(id)
            .select(recipes::author_id)
            .first(conn)
            .optional()?
            .ok_or(ApiError::NotFound(Target::Recipe))?;

        if author_id != user.id {
            return Err(ApiError::PermissionDenied);
        }

        verify_references(conn, &payload)?;

        diesel::update(recipes::table.find(id))
            .set((
                recipes::name.eq(&payload.name),
                recipes::image.eq(&payload.image),
                recipes::text.eq(&payload.text),
                recipes::cooking_time.eq(payload.cooking_time),
            ))
            .execute(conn)?;

        // Tag and ingredient sets are fully replaced, never merged
        diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(id))).execute(conn)?;
        diesel::delete(
            recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(id)),
        )
        .execute(conn)?;
        insert_relations(conn, id, &payload)?;

        Ok(())
    });

    if let Err(e) = result {
        return e.into_response();
    }

    match load_detail(&mut conn, Some(user.id), id) {
        Ok(Some(recipe)) => (StatusCode::OK, Json(recipe)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                code: "not_found".to_string(),
                error: "Recipe not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch updated recipe: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}
