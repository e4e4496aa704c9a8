use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::utils::{error_codes, error_to_api_response};

// 唯一索引名称，见 migrations/0001_init.sql
const EMAIL_CONSTRAINT: &str = "users_email_key";
const USERNAME_CONSTRAINT: &str = "users_username_key";

#[derive(Debug)]
pub enum ApiError {
    DuplicateEmail,
    DuplicateUsername,
    InvalidUsername,
    InvalidPassword,
    PasswordMismatch,
    AlreadyInWishlist,
    NotFound(&'static str),
    Unauthorized,
    Hash(bcrypt::BcryptError),
    Token(jsonwebtoken::errors::Error),
    Persistence(sqlx::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::DuplicateEmail
            | ApiError::DuplicateUsername
            | ApiError::InvalidUsername
            | ApiError::InvalidPassword
            | ApiError::PasswordMismatch
            | ApiError::AlreadyInWishlist => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Hash(_) | ApiError::Token(_) | ApiError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ApiError::DuplicateEmail => error_codes::DUPLICATE_EMAIL,
            ApiError::DuplicateUsername => error_codes::DUPLICATE_USERNAME,
            ApiError::InvalidUsername => error_codes::INVALID_USERNAME,
            ApiError::InvalidPassword => error_codes::INVALID_PASSWORD,
            ApiError::PasswordMismatch => error_codes::PASSWORD_MISMATCH,
            ApiError::AlreadyInWishlist => error_codes::ALREADY_IN_WISHLIST,
            ApiError::NotFound(_) => error_codes::NOT_FOUND,
            ApiError::Unauthorized => error_codes::AUTH_FAILED,
            ApiError::Hash(_) | ApiError::Token(_) => error_codes::INTERNAL_ERROR,
            ApiError::Persistence(_) => error_codes::PERSISTENCE_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::DuplicateEmail => "This email is taken".into(),
            ApiError::DuplicateUsername => "Username is taken".into(),
            ApiError::InvalidUsername => "Invalid username".into(),
            ApiError::InvalidPassword => "Invalid password".into(),
            ApiError::PasswordMismatch => "Password doesn't match".into(),
            ApiError::AlreadyInWishlist => "You already added this item".into(),
            ApiError::NotFound(what) => format!("{} not found", what),
            ApiError::Unauthorized => "Authorization token is missing or invalid".into(),
            ApiError::Hash(e) => format!("Password hashing failed: {}", e),
            ApiError::Token(e) => format!("Token generation failed: {}", e),
            ApiError::Persistence(e) => format!("Storage error: {}", e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        }
        (status, error_to_api_response::<()>(self.code(), self.message())).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        // 数据库唯一索引是重复检查的最终裁决，插入冲突按索引名归类
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.constraint() {
                Some(EMAIL_CONSTRAINT) => return ApiError::DuplicateEmail,
                Some(USERNAME_CONSTRAINT) => return ApiError::DuplicateUsername,
                _ => {}
            }
        }
        if matches!(e, sqlx::Error::RowNotFound) {
            return ApiError::NotFound("Record");
        }
        ApiError::Persistence(e)
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(e: bcrypt::BcryptError) -> Self {
        ApiError::Hash(e)
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        ApiError::Token(e)
    }
}
