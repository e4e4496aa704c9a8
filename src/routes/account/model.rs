use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::utils::{RoleFlags, hash_password, verify_password};

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "id")]
    pub user_id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub creation_date: DateTime<Utc>,
    pub is_admin: bool,
    pub is_seller: bool,
    pub is_customer: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 账户编辑请求。password 为空字符串表示保持原密码不变，
/// 其余字段缺省或为空时退回数据库里已存的值
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditAccountRequest {
    pub password: String,
    pub verify_password: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub is_seller: Option<bool>,
}

/// 补丁与现有记录合并后的结果，new_password 为 None 时沿用旧哈希
#[derive(Debug, PartialEq)]
pub struct MergedAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub is_seller: bool,
    pub new_password: Option<String>,
}

fn keep_or(patch: &Option<String>, current: &str) -> String {
    match patch {
        Some(v) if !v.is_empty() => v.clone(),
        _ => current.to_string(),
    }
}

impl EditAccountRequest {
    /// 纯合并逻辑：密码确认检查必须先于一切持久化动作
    pub fn merged_with(&self, current: &User) -> Result<MergedAccount, ApiError> {
        if !self.password.is_empty() && self.password != self.verify_password {
            return Err(ApiError::PasswordMismatch);
        }

        Ok(MergedAccount {
            username: keep_or(&self.username, &current.username),
            email: keep_or(&self.email, &current.email),
            first_name: keep_or(&self.first_name, &current.first_name),
            last_name: keep_or(&self.last_name, &current.last_name),
            gender: self
                .gender
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| current.gender.clone()),
            nationality: self
                .nationality
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| current.nationality.clone()),
            birth_date: self.birth_date.or(current.birth_date),
            is_seller: self.is_seller.unwrap_or(current.is_seller),
            new_password: if self.password.is_empty() {
                None
            } else {
                Some(self.password.clone())
            },
        })
    }
}

const USER_COLUMNS: &str = "user_id, username, email, password_hash, first_name, last_name, \
     gender, nationality, birth_date, creation_date, is_admin, is_seller, is_customer";

impl User {
    pub fn role_flags(&self) -> RoleFlags {
        RoleFlags {
            is_admin: self.is_admin,
            is_seller: self.is_seller,
            is_customer: self.is_customer,
        }
    }

    pub async fn create(pool: &PgPool, req: CreateAccountRequest) -> Result<Self, ApiError> {
        // 预检查只是快速路径，先邮箱后用户名；并发注册漏过检查时
        // 由唯一索引在插入阶段裁决（见 From<sqlx::Error>）
        if Self::find_by_email(pool, &req.email).await?.is_some() {
            return Err(ApiError::DuplicateEmail);
        }
        if Self::find_by_username(pool, &req.username).await?.is_some() {
            return Err(ApiError::DuplicateUsername);
        }

        let password_hash = hash_password(&req.password)?;
        let user_id = Uuid::new_v4().to_string();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_id, username, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user_id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .fetch_one(pool)
        .await?;

        tracing::info!("created account {}", user.user_id);
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, user_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub fn verify_login(&self, password: &str) -> Result<bool, bcrypt::BcryptError> {
        verify_password(password, &self.password_hash)
    }

    /// 账户编辑：密码确认 → 唯一性复查 → 单条 UPDATE。
    /// 只更新账户字段，心愿单和发货列表各自独立存储，互不覆盖
    pub async fn edit(
        pool: &PgPool,
        user_id: &str,
        req: EditAccountRequest,
    ) -> Result<Self, ApiError> {
        let current = Self::find_by_id(pool, user_id)
            .await?
            .ok_or(ApiError::NotFound("User"))?;

        let merged = req.merged_with(&current)?;

        if merged.email != current.email {
            if let Some(other) = Self::find_by_email(pool, &merged.email).await? {
                if other.user_id != current.user_id {
                    return Err(ApiError::DuplicateEmail);
                }
            }
        }

        if merged.username != current.username {
            if let Some(other) = Self::find_by_username(pool, &merged.username).await? {
                if other.user_id != current.user_id {
                    return Err(ApiError::DuplicateUsername);
                }
            }
        }

        // 密码变了才重新哈希
        let password_hash = match &merged.new_password {
            Some(plain) => hash_password(plain)?,
            None => current.password_hash.clone(),
        };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $1, email = $2, password_hash = $3, first_name = $4,
                last_name = $5, gender = $6, nationality = $7, birth_date = $8,
                is_seller = $9
            WHERE user_id = $10
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&merged.username)
        .bind(&merged.email)
        .bind(&password_hash)
        .bind(&merged.first_name)
        .bind(&merged.last_name)
        .bind(&merged.gender)
        .bind(&merged.nationality)
        .bind(merged.birth_date)
        .bind(merged.is_seller)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_user() -> User {
        User {
            user_id: "u-1".into(),
            username: "ab".into(),
            email: "j@x.com".into(),
            password_hash: "$2b$10$stored".into(),
            first_name: "Jo".into(),
            last_name: "Doe".into(),
            gender: None,
            nationality: Some("FR".into()),
            birth_date: None,
            creation_date: Utc::now(),
            is_admin: false,
            is_seller: false,
            is_customer: true,
        }
    }

    #[test]
    fn password_mismatch_rejected_before_merge() {
        let req = EditAccountRequest {
            password: "newpass1".into(),
            verify_password: "different".into(),
            ..Default::default()
        };
        assert!(matches!(
            req.merged_with(&stored_user()),
            Err(ApiError::PasswordMismatch)
        ));
    }

    #[test]
    fn empty_password_keeps_stored_hash() {
        let req = EditAccountRequest {
            password: String::new(),
            verify_password: "whatever".into(),
            first_name: Some("Joe".into()),
            ..Default::default()
        };
        let merged = req.merged_with(&stored_user()).unwrap();
        assert_eq!(merged.new_password, None);
        assert_eq!(merged.first_name, "Joe");
    }

    #[test]
    fn absent_fields_fall_back_to_stored_values() {
        let req = EditAccountRequest::default();
        let merged = req.merged_with(&stored_user()).unwrap();
        assert_eq!(merged.username, "ab");
        assert_eq!(merged.email, "j@x.com");
        assert_eq!(merged.nationality.as_deref(), Some("FR"));
        assert!(!merged.is_seller);
    }

    #[test]
    fn empty_strings_are_treated_as_absent() {
        let req = EditAccountRequest {
            email: Some(String::new()),
            first_name: Some(String::new()),
            ..Default::default()
        };
        let merged = req.merged_with(&stored_user()).unwrap();
        assert_eq!(merged.email, "j@x.com");
        assert_eq!(merged.first_name, "Jo");
    }

    #[test]
    fn seller_flag_promotes_account() {
        let req = EditAccountRequest {
            is_seller: Some(true),
            ..Default::default()
        };
        let merged = req.merged_with(&stored_user()).unwrap();
        assert!(merged.is_seller);
    }

    #[test]
    fn matching_passwords_produce_new_password() {
        let req = EditAccountRequest {
            password: "newpass1".into(),
            verify_password: "newpass1".into(),
            ..Default::default()
        };
        let merged = req.merged_with(&stored_user()).unwrap();
        assert_eq!(merged.new_password.as_deref(), Some("newpass1"));
    }

    #[test]
    fn user_serialization_excludes_password_hash() {
        let value = serde_json::to_value(stored_user()).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["id"], "u-1");
        assert_eq!(value["firstName"], "Jo");
        assert_eq!(value["isCustomer"], true);
    }
}
