use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// 商品目录条目，本服务只读
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub seller_id: Option<String>,
}

impl Product {
    /// 按 id 批量解析，结果按商品 id 升序；未解析到的 id 直接缺席，
    /// 调用方自行容忍
    pub async fn find_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, description, price_cents, seller_id
            FROM products
            WHERE product_id = ANY($1)
            ORDER BY product_id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}
