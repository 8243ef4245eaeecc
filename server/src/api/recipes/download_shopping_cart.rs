use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::{ingredients, recipe_ingredients, shopping_cart_items};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use diesel::prelude::*;
use std::sync::Arc;

/// Formats aggregated shopping list lines as `name, amount unit`, one per
/// line with a trailing newline. An empty cart renders as a single newline.
fn render_shopping_list(items: &[(String, i64, String)]) -> String {
    let mut text = items
        .iter()
        .map(|(name, amount, unit)| format!("{}, {} {}", name, amount, unit))
        .collect::<Vec<_>>()
        .join("\n");
    text.push('\n');
    text
}

#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart",
    tag = "recipes",
    responses(
        (status = 200, description = "Shopping list as a text attachment", content_type = "text/plain"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_shopping_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    // One line per distinct ingredient: amounts are summed across every
    // recipe in the cart, including repeated entries within one recipe.
    let result: QueryResult<Vec<(String, Option<i64>, String)>> = shopping_cart_items::table
        .inner_join(
            recipe_ingredients::table
                .on(recipe_ingredients::recipe_id.eq(shopping_cart_items::recipe_id)),
        )
        .inner_join(ingredients::table.on(ingredients::id.eq(recipe_ingredients::ingredient_id)))
        .filter(shopping_cart_items::user_id.eq(user.id))
        .group_by((ingredients::id, ingredients::name, ingredients::measurement_unit))
        .order(ingredients::name.asc())
        .select((
            ingredients::name,
            diesel::dsl::sum(recipe_ingredients::amount),
            ingredients::measurement_unit,
        ))
        .load(&mut conn);

    let rows = match result {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to build shopping list: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to build shopping list".to_string(),
                }),
            )
                .into_response();
        }
    };

    let items: Vec<(String, i64, String)> = rows
        .into_iter()
        .map(|(name, amount, unit)| (name, amount.unwrap_or(0), unit))
        .collect();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=ShoppingCart.txt",
        )
        .body(Body::from(render_shopping_list(&items)))
        .unwrap()
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, amount: i64, unit: &str) -> (String, i64, String) {
        (name.to_string(), amount, unit.to_string())
    }

    #[test]
    fn test_render_empty_list() {
        assert_eq!(render_shopping_list(&[]), "\n");
    }

    #[test]
    fn test_render_single_line() {
        let items = vec![item("egg", 3, "pcs")];
        assert_eq!(render_shopping_list(&items), "egg, 3 pcs\n");
    }

    #[test]
    fn test_render_multiple_lines() {
        let items = vec![item("egg", 3, "pcs"), item("flour", 500, "g")];
        assert_eq!(render_shopping_list(&items), "egg, 3 pcs\nflour, 500 g\n");
    }
}
