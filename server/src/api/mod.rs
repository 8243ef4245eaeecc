pub mod auth;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod testing;
pub mod users;

use serde::Serialize;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

use crate::models::{Ingredient, RecipeShort, Tag};

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Stable machine-readable code, e.g. "already_favorite"
    pub code: String,
    pub error: String,
}

/// Pagination metadata returned alongside every list
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMetadata {
    /// Total number of items available
    pub total: i64,
    /// Number of items requested (limit)
    pub limit: i64,
    /// Number of items skipped (offset)
    pub offset: i64,
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Last occurrence of `key` in the raw query pairs. Listing endpoints
/// accept repeated keys (`tags=a&tags=b`), so they extract the raw pairs
/// instead of a serde struct; for scalar params the last value wins.
pub fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Parse `limit`/`offset` from raw query pairs. Values that fail to
/// parse are ignored rather than rejected.
pub fn parse_page(pairs: &[(String, String)]) -> Page {
    let limit = last_value(pairs, "limit")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    let offset = last_value(pairs, "offset")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0)
        .max(0);

    Page { limit, offset }
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Base spec with shared components and security
    #[derive(OpenApi)]
    #[openapi(components(schemas(ErrorResponse, PaginationMetadata, Tag, Ingredient, RecipeShort)))]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    // Add security scheme
    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    // Merge in each module's spec
    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        auth::ApiDoc::openapi(),
        testing::ApiDoc::openapi(),
        users::ApiDoc::openapi(),
        tags::ApiDoc::openapi(),
        ingredients::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        // Merge paths
        spec.paths.paths.extend(module_spec.paths.paths);

        // Merge components (schemas)
        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_page_defaults() {
        let page = parse_page(&[]);
        assert_eq!(page, Page { limit: 20, offset: 0 });
    }

    #[test]
    fn test_parse_page_explicit() {
        let page = parse_page(&pairs(&[("limit", "5"), ("offset", "10")]));
        assert_eq!(page, Page { limit: 5, offset: 10 });
    }

    #[test]
    fn test_parse_page_clamps() {
        let page = parse_page(&pairs(&[("limit", "100000"), ("offset", "-3")]));
        assert_eq!(
            page,
            Page {
                limit: MAX_PAGE_LIMIT,
                offset: 0
            }
        );
        assert_eq!(parse_page(&pairs(&[("limit", "0")])).limit, 1);
    }

    #[test]
    fn test_parse_page_ignores_garbage() {
        let page = parse_page(&pairs(&[("limit", "abc"), ("offset", "1.5")]));
        assert_eq!(page, Page { limit: 20, offset: 0 });
    }

    #[test]
    fn test_parse_page_last_value_wins() {
        let page = parse_page(&pairs(&[("limit", "3"), ("limit", "7")]));
        assert_eq!(page.limit, 7);
    }

    #[test]
    fn test_openapi_merges_all_modules() {
        let spec = openapi();
        assert!(spec.paths.paths.contains_key("/api/auth/signup"));
        assert!(spec.paths.paths.contains_key("/api/users/subscriptions"));
        assert!(spec.paths.paths.contains_key("/api/tags"));
        assert!(spec.paths.paths.contains_key("/api/ingredients"));
        assert!(spec.paths.paths.contains_key("/api/recipes"));
        assert!(spec
            .paths
            .paths
            .contains_key("/api/recipes/download_shopping_cart"));
    }
}
