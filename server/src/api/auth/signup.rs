use crate::api::ErrorResponse;
use crate::auth::{create_session_with_token, hash_password, DEV_TEST_TOKEN};
use crate::db::DbPool;
use crate::get_conn;
use crate::models::NewUser;
use crate::schema::users;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, serde::Serialize, ToSchema)]
pub struct SignupResponse {
    pub user_id: i32,
    pub token: String,
}

fn validate(req: &SignupRequest) -> Result<(), &'static str> {
    if req.email.is_empty() || req.email.len() > 254 {
        return Err("Email must be between 1 and 254 characters");
    }
    if !req.email.contains('@') {
        return Err("Email must be a valid email address");
    }
    if req.username.is_empty() || req.username.len() > 150 {
        return Err("Username must be between 1 and 150 characters");
    }
    if req.first_name.is_empty() || req.first_name.len() > 150 {
        return Err("First name must be between 1 and 150 characters");
    }
    if req.last_name.is_empty() || req.last_name.len() > 150 {
        return Err("Last name must be between 1 and 150 characters");
    }
    if req.password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body(content = SignupRequest, example = json!({"email": "user@example.com", "username": "user", "first_name": "Some", "last_name": "User", "password": "password"})),
    responses(
        (status = 201, description = "User created successfully", body = SignupResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email or username already exists", body = ErrorResponse)
    )
)]
pub async fn signup(
    State(pool): State<Arc<DbPool>>,
    Json(req): Json<SignupRequest>,
) -> impl IntoResponse {
    if let Err(message) = validate(&req) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                code: "validation_error".to_string(),
                error: message.to_string(),
            }),
        )
            .into_response();
    }

    let mut conn = get_conn!(pool);

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to hash password".to_string(),
                }),
            )
                .into_response()
        }
    };

    let new_user = NewUser {
        email: &req.email,
        username: &req.username,
        first_name: &req.first_name,
        last_name: &req.last_name,
        password_hash: &password_hash,
    };

    let user: crate::models::User = match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(crate::models::User::as_returning())
        .get_result(&mut conn)
    {
        Ok(u) => u,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            info,
        )) => {
            // users has two unique columns; tell the caller which one collided
            let message = if info.constraint_name() == Some("users_email_key") {
                "Email already exists"
            } else {
                "Username already exists"
            };
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    code: "conflict".to_string(),
                    error: message.to_string(),
                }),
            )
                .into_response();
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to create user".to_string(),
                }),
            )
                .into_response()
        }
    };

    // Use fixed token for test user "t" so session persists across DB resets
    let fixed_token = if req.username.to_lowercase() == "t" {
        Some(DEV_TEST_TOKEN)
    } else {
        None
    };
    let token = match create_session_with_token(&mut conn, user.id, fixed_token) {
        Ok(t) => t,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "internal_error".to_string(),
                    error: "Failed to create session".to_string(),
                }),
            )
                .into_response()
        }
    };

    (
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id,
            token,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> SignupRequest {
        SignupRequest {
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Julia".to_string(),
            last_name: "Child".to_string(),
            password: "mastering".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_valid_request() {
        assert!(validate(&valid_request()).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_email() {
        let mut req = valid_request();
        req.email = String::new();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn test_validate_rejects_email_without_at() {
        let mut req = valid_request();
        req.email = "not-an-email".to_string();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn test_validate_rejects_overlong_username() {
        let mut req = valid_request();
        req.username = "x".repeat(151);
        assert!(validate(&req).is_err());
    }

    #[test]
    fn test_validate_rejects_short_password() {
        let mut req = valid_request();
        req.password = "short".to_string();
        assert_eq!(
            validate(&req),
            Err("Password must be at least 8 characters")
        );
    }
}
