use axum::Json;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 会话令牌里携带的角色声明，角色变更后必须重新签发
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub is_admin: bool,
    pub is_seller: bool,
    pub is_customer: bool,
    pub exp: i64,
    pub iat: i64,
}

/// 签发令牌时的角色快照，只能来自数据库里当前的用户记录，
/// 绝不能使用客户端提交的值
#[derive(Debug, Clone, Copy)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_seller: bool,
    pub is_customer: bool,
}

pub fn generate_token(
    user_id: &str,
    roles: RoleFlags,
    config: &Config,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::seconds(config.jwt_expiration().as_secs() as i64))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        is_admin: roles.is_admin,
        is_seller: roles.is_seller,
        is_customer: roles.is_customer,
        exp: expiration,
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 通用的API响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 错误码，0表示成功
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const DUPLICATE_EMAIL: i32 = 1001;
    pub const DUPLICATE_USERNAME: i32 = 1002;
    pub const AUTH_FAILED: i32 = 1003;
    pub const INVALID_USERNAME: i32 = 1004;
    pub const INVALID_PASSWORD: i32 = 1005;
    pub const PASSWORD_MISMATCH: i32 = 1006;
    pub const ALREADY_IN_WISHLIST: i32 = 1007;
    pub const NOT_FOUND: i32 = 1008;
    pub const RATE_LIMIT: i32 = 1009;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const PERSISTENCE_ERROR: i32 = 5001;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://localhost".into(),
            jwt_secret: "test-secret".into(),
            jwt_expiration_secs: 3600,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            request_timeout_secs: 30,
            reconcile_interval_secs: 300,
            server_host: "::".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
        }
    }

    #[test]
    fn hashed_password_never_equals_plaintext() {
        let hashed = hash_password("longenough").unwrap();
        assert_ne!(hashed, "longenough");
        assert!(verify_password("longenough", &hashed).unwrap());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hashed = hash_password("longenough").unwrap();
        assert!(!verify_password("longenough2", &hashed).unwrap());
        assert!(!verify_password("", &hashed).unwrap());
    }

    #[test]
    fn token_round_trip_preserves_role_claims() {
        let config = test_config();
        let token = generate_token(
            "user-1",
            RoleFlags {
                is_admin: false,
                is_seller: true,
                is_customer: true,
            },
            &config,
        )
        .unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(!claims.is_admin);
        assert!(claims.is_seller);
        assert!(claims.is_customer);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = test_config();
        let mut other = test_config();
        other.jwt_secret = "other-secret".into();

        let token = generate_token(
            "user-1",
            RoleFlags {
                is_admin: false,
                is_seller: false,
                is_customer: true,
            },
            &other,
        )
        .unwrap();

        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            is_admin: false,
            is_seller: false,
            is_customer: true,
            exp: now - 7200,
            iat: now - 10800,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn claims_serialize_camel_case() {
        let claims = Claims {
            sub: "user-1".into(),
            is_admin: false,
            is_seller: true,
            is_customer: true,
            exp: 2,
            iat: 1,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["isSeller"], true);
        assert_eq!(value["isCustomer"], true);
        assert_eq!(value["isAdmin"], false);
    }
}
