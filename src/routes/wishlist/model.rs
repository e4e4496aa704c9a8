use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::ApiError;

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: String,
    pub added_at: DateTime<Utc>,
}

impl WishlistEntry {
    /// 原子的"不存在才追加"：主键冲突时没有行被写入，
    /// 据此报告重复收藏
    pub async fn add(pool: &PgPool, user_id: &str, product_id: &str) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            INSERT INTO wishlist_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::AlreadyInWishlist);
        }

        Ok(())
    }

    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WishlistEntry>(
            r#"
            SELECT product_id, added_at
            FROM wishlist_items
            WHERE user_id = $1
            ORDER BY added_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// 按 product_id 等值删除；目标不存在时照样成功
    pub async fn remove(pool: &PgPool, user_id: &str, product_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub fn product_ids(entries: &[Self]) -> Vec<String> {
        entries.iter().map(|e| e.product_id.clone()).collect()
    }
}
