use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::api::ErrorResponse;
use crate::relations::Relation;

/// Entity kind a failed lookup was resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    User,
    Tag,
    Ingredient,
    Recipe,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::User => "User",
            Target::Tag => "Tag",
            Target::Ingredient => "Ingredient",
            Target::Recipe => "Recipe",
        }
    }
}

/// Domain errors surfaced by handlers and the shared query helpers.
///
/// Everything except `Database` maps to a client error with a stable
/// machine-readable code; `Database` is logged server-side and reported
/// without details.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{} not found", .0.name())]
    NotFound(Target),
    #[error("{}", .0.already_exists_message())]
    AlreadyExists(Relation),
    #[error("{}", .0.missing_message())]
    MissingRelation(Relation),
    #[error("You do not have permission to perform this action.")]
    PermissionDenied,
    #[error("{0}")]
    Conflict(&'static str),
    #[error("Internal server error")]
    Database(#[from] diesel::result::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingRelation(_) => StatusCode::BAD_REQUEST,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::AlreadyExists(relation) => relation.already_exists_code(),
            ApiError::MissingRelation(relation) => relation.missing_code(),
            ApiError::PermissionDenied => "permission_denied",
            ApiError::Conflict(_) => "conflict",
            ApiError::Database(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(ref e) = self {
            tracing::error!("Database error: {}", e);
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::Validation("Name cannot be empty".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.to_string(), "Name cannot be empty");
    }

    #[test]
    fn test_not_found_names_the_target() {
        let err = ApiError::NotFound(Target::Recipe);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_string(), "Recipe not found");

        assert_eq!(ApiError::NotFound(Target::User).to_string(), "User not found");
        assert_eq!(ApiError::NotFound(Target::Tag).to_string(), "Tag not found");
        assert_eq!(
            ApiError::NotFound(Target::Ingredient).to_string(),
            "Ingredient not found"
        );
    }

    #[test]
    fn test_flag_errors_use_relation_codes() {
        let err = ApiError::AlreadyExists(Relation::Favorite);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "already_favorite");
        assert_eq!(err.to_string(), "Recipe already is in favorites.");

        let err = ApiError::MissingRelation(Relation::Follow);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "not_following");
        assert_eq!(err.to_string(), "Not following the user.");
    }

    #[test]
    fn test_permission_denied_is_forbidden() {
        let err = ApiError::PermissionDenied;
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "permission_denied");
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = ApiError::Conflict("Username already exists");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn test_database_errors_are_opaque() {
        let err = ApiError::from(diesel::result::Error::NotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
        assert_eq!(err.to_string(), "Internal server error");
    }
}
