use crate::api::recipes::detail::{assemble_details, RecipeDetail, RecipeRow};
use crate::api::{last_value, parse_page, ErrorResponse, PaginationMetadata};
use crate::auth::MaybeUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::raw_sql::{always_false, count_over};
use crate::schema::recipes;
use crate::{favorited_by_viewer, has_tag_slug, in_cart_of_viewer};
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

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipesListResponse {
    pub recipes: Vec<RecipeDetail>,
    pub pagination: PaginationMetadata,
}

/// How a viewer-membership parameter filters the listing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MembershipFilter {
    /// Parameter absent or empty: no restriction.
    #[default]
    Nothing,
    /// Literal `0`: only recipes outside the viewer's set.
    Exclude,
    /// Any other value: only recipes inside the viewer's set.
    Only,
}

/// Author filter state. `Empty` means the parameter was present but not a
/// valid id, which yields an empty listing rather than an error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthorFilter {
    #[default]
    Nothing,
    Only(i32),
    Empty,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecipeFilters {
    pub favorited: MembershipFilter,
    pub in_cart: MembershipFilter,
    pub author: AuthorFilter,
    pub tag_slugs: Vec<String>,
}

fn parse_membership(value: Option<&str>) -> MembershipFilter {
    match value {
        None | Some("") => MembershipFilter::Nothing,
        Some("0") => MembershipFilter::Exclude,
        Some(_) => MembershipFilter::Only,
    }
}

/// Parses the recipe listing filters from raw query pairs. Scalar
/// parameters take the last value when repeated; `tags` collects every
/// non-empty occurrence.
pub fn parse_filters(pairs: &[(String, String)]) -> RecipeFilters {
    let author = match last_value(pairs, "author") {
        None | Some("") => AuthorFilter::Nothing,
        Some(value) => match value.parse::<i32>() {
            Ok(id) => AuthorFilter::Only(id),
            Err(_) => AuthorFilter::Empty,
        },
    };

    let tag_slugs = pairs
        .iter()
        .filter(|(key, value)| key == "tags" && !value.is_empty())
        .map(|(_, value)| value.clone())
        .collect();

    RecipeFilters {
        favorited: parse_membership(last_value(pairs, "is_favorited")),
        in_cart: parse_membership(last_value(pairs, "is_in_shopping_cart")),
        author,
        tag_slugs,
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(
        ("limit" = Option<i64>, Query, description = "Number of items to return (default: 20, max: 1000)"),
        ("offset" = Option<i64>, Query, description = "Number of items to skip (default: 0)"),
        ("is_favorited" = Option<String>, Query, description = "Only the caller's favorites; 0 excludes them instead"),
        ("is_in_shopping_cart" = Option<String>, Query, description = "Only the caller's shopping cart; 0 excludes it instead"),
        ("author" = Option<i32>, Query, description = "Only recipes by this author"),
        ("tags" = Option<Vec<String>>, Query, description = "Tag slugs; repeatable, recipes matching any slug are included")
    ),
    responses(
        (status = 200, description = "List of recipes, newest first", body = RecipesListResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse)
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    MaybeUser(user): MaybeUser,
    State(pool): State<Arc<DbPool>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let page = parse_page(&pairs);
    let filters = parse_filters(&pairs);
    let viewer = user.map(|u| u.id);

    // A malformed author id matches nothing, and so do membership
    // restrictions when there is no viewer to be a member.
    let cannot_match = matches!(filters.author, AuthorFilter::Empty)
        || (viewer.is_none()
            && (filters.favorited == MembershipFilter::Only
                || filters.in_cart == MembershipFilter::Only));
    if cannot_match {
        return (
            StatusCode::OK,
            Json(RecipesListResponse {
                recipes: vec![],
                pagination: PaginationMetadata {
                    total: 0,
                    limit: page.limit,
                    offset: page.offset,
                },
            }),
        )
            .into_response();
    }

    let mut conn = get_conn!(pool);

    let mut query = recipes::table.into_boxed();
    if let AuthorFilter::Only(author_id) = filters.author {
        query = query.filter(recipes::author_id.eq(author_id));
    }
    if !filters.tag_slugs.is_empty() {
        query = query.filter(has_tag_slug!(filters.tag_slugs.clone()));
    }
    if let Some(viewer) = viewer {
        match filters.favorited {
            MembershipFilter::Only => query = query.filter(favorited_by_viewer!(viewer)),
            MembershipFilter::Exclude => {
                query = query.filter(diesel::dsl::not(favorited_by_viewer!(viewer)));
            }
            MembershipFilter::Nothing => {}
        }
        match filters.in_cart {
            MembershipFilter::Only => query = query.filter(in_cart_of_viewer!(viewer)),
            MembershipFilter::Exclude => {
                query = query.filter(diesel::dsl::not(in_cart_of_viewer!(viewer)));
            }
            MembershipFilter::Nothing => {}
        }
    }
    let query = query
        .order(recipes::id.desc())
        .limit(page.limit)
        .offset(page.offset);

    let result: QueryResult<Vec<(RecipeRow, i64)>> = match viewer {
        Some(viewer) => query
            .select((
                (
                    recipes::id,
                    recipes::author_id,
                    recipes::name,
                    recipes::image,
                    recipes::text,
                    recipes::cooking_time,
                    favorited_by_viewer!(viewer),
                    in_cart_of_viewer!(viewer),
                ),
                count_over(),
            ))
            .load(&mut conn),
        None => query
            .select((
                (
                    recipes::id,
                    recipes::author_id,
                    recipes::name,
                    recipes::image,
                    recipes::text,
                    recipes::cooking_time,
                    always_false(),
                    always_false(),
                ),
                count_over(),
            ))
            .load(&mut conn),
    };

    let rows = match result {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch recipes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    let total = rows.first().map(|(_, total_count)| *total_count).unwrap_or(0);
    let page_rows: Vec<RecipeRow> = rows.into_iter().map(|(row, _)| row).collect();

    let recipes = match assemble_details(&mut conn, viewer, page_rows) {
        Ok(details) => details,
        Err(e) => {
            tracing::error!("Failed to assemble recipe listing: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    (
        StatusCode::OK,
        Json(RecipesListResponse {
            recipes,
            pagination: PaginationMetadata {
                total,
                limit: page.limit,
                offset: page.offset,
            },
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_filters_defaults() {
        assert_eq!(parse_filters(&[]), RecipeFilters::default());
    }

    #[test]
    fn test_parse_membership_values() {
        assert_eq!(
            parse_filters(&pairs(&[("is_favorited", "1")])).favorited,
            MembershipFilter::Only
        );
        assert_eq!(
            parse_filters(&pairs(&[("is_favorited", "true")])).favorited,
            MembershipFilter::Only
        );
        assert_eq!(
            parse_filters(&pairs(&[("is_favorited", "0")])).favorited,
            MembershipFilter::Exclude
        );
        assert_eq!(
            parse_filters(&pairs(&[("is_favorited", "")])).favorited,
            MembershipFilter::Nothing
        );
        assert_eq!(
            parse_filters(&pairs(&[("is_in_shopping_cart", "0")])).in_cart,
            MembershipFilter::Exclude
        );
    }

    #[test]
    fn test_parse_author() {
        assert_eq!(
            parse_filters(&pairs(&[("author", "7")])).author,
            AuthorFilter::Only(7)
        );
        assert_eq!(
            parse_filters(&pairs(&[("author", "abc")])).author,
            AuthorFilter::Empty
        );
        assert_eq!(
            parse_filters(&pairs(&[("author", "")])).author,
            AuthorFilter::Nothing
        );
    }

    #[test]
    fn test_parse_tags_collects_repeats() {
        let filters = parse_filters(&pairs(&[
            ("tags", "breakfast"),
            ("tags", ""),
            ("tags", "dinner"),
        ]));
        assert_eq!(filters.tag_slugs, vec!["breakfast", "dinner"]);
    }

    #[test]
    fn test_scalar_filters_take_last_value() {
        let filters = parse_filters(&pairs(&[
            ("author", "3"),
            ("author", "9"),
            ("is_favorited", "1"),
            ("is_favorited", "0"),
        ]));
        assert_eq!(filters.author, AuthorFilter::Only(9));
        assert_eq!(filters.favorited, MembershipFilter::Exclude);
    }
}
