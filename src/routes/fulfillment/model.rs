use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::routes::product::Product;

/// 卖家发货列表里的一条冗余记录，product 为 None 表示商品已不可解析
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItem {
    pub order_item_id: String,
    pub product_id: String,
    pub shipped: bool,
    pub product: Option<Product>,
}

#[derive(FromRow)]
struct DeliveryRow {
    order_item_id: String,
    product_id: String,
    shipped: bool,
    name: Option<String>,
    description: Option<String>,
    price_cents: Option<i64>,
    seller_id: Option<String>,
}

impl From<DeliveryRow> for DeliveryItem {
    fn from(row: DeliveryRow) -> Self {
        let product = match (row.name, row.price_cents) {
            (Some(name), Some(price_cents)) => Some(Product {
                product_id: row.product_id.clone(),
                name,
                description: row.description.unwrap_or_default(),
                price_cents,
                seller_id: row.seller_id,
            }),
            _ => None,
        };

        DeliveryItem {
            order_item_id: row.order_item_id,
            product_id: row.product_id,
            shipped: row.shipped,
            product,
        }
    }
}

pub async fn list_for_seller(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<DeliveryItem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DeliveryRow>(
        r#"
        SELECT d.order_item_id, d.product_id, d.shipped,
               p.name, p.description, p.price_cents, p.seller_id
        FROM orders_to_deliver d
        LEFT JOIN products p ON p.product_id = d.product_id
        WHERE d.user_id = $1
        ORDER BY d.order_item_id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DeliveryItem::from).collect())
}

/// 单次写入的结果。matched 表示有行被命中；
/// 重复标记已发货的行照样命中，所以操作是幂等的
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub matched: bool,
    pub error: Option<String>,
}

/// 双写的逐项结果：权威订单记录一份，卖家冗余副本一份。
/// 两次写互不以对方成功为前提，任何一边失败都单独上报，
/// 残留的分歧由周期性的 reconcile_shipped 修复
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentReport {
    pub order_record: WriteOutcome,
    pub seller_copy: WriteOutcome,
}

#[derive(Debug, PartialEq)]
pub enum ShipmentStatus {
    Completed,
    NotFound,
    Failed,
}

impl ShipmentReport {
    pub async fn apply(pool: &PgPool, order_item_id: &str, seller_id: &str) -> Self {
        // 第一笔：权威订单行
        let order_record = match sqlx::query(
            "UPDATE order_items SET shipped = true WHERE order_item_id = $1",
        )
        .bind(order_item_id)
        .execute(pool)
        .await
        {
            Ok(r) => WriteOutcome {
                matched: r.rows_affected() > 0,
                error: None,
            },
            Err(e) => {
                tracing::error!("order-side shipment write failed: {}", e);
                WriteOutcome {
                    matched: false,
                    error: Some(e.to_string()),
                }
            }
        };

        // 第二笔：卖家副本。无论第一笔结果如何都要尝试
        let seller_copy = match sqlx::query(
            "UPDATE orders_to_deliver SET shipped = true WHERE user_id = $1 AND order_item_id = $2",
        )
        .bind(seller_id)
        .bind(order_item_id)
        .execute(pool)
        .await
        {
            Ok(r) => WriteOutcome {
                matched: r.rows_affected() > 0,
                error: None,
            },
            Err(e) => {
                tracing::error!("seller-side shipment write failed: {}", e);
                WriteOutcome {
                    matched: false,
                    error: Some(e.to_string()),
                }
            }
        };

        ShipmentReport {
            order_record,
            seller_copy,
        }
    }

    pub fn classify(&self) -> ShipmentStatus {
        if self.order_record.error.is_some() || self.seller_copy.error.is_some() {
            return ShipmentStatus::Failed;
        }
        if !self.order_record.matched && !self.seller_copy.matched {
            return ShipmentStatus::NotFound;
        }
        ShipmentStatus::Completed
    }
}

/// 离线修复双写分歧。发货状态是单向的（Placed → Shipped），
/// 任意一份副本标了 shipped 即视为事实，向另一份传播。
/// 返回（修复的卖家副本数，修复的订单记录数）
pub async fn reconcile_shipped(pool: &PgPool) -> Result<(u64, u64), sqlx::Error> {
    let seller_repaired = sqlx::query(
        r#"
        UPDATE orders_to_deliver d
        SET shipped = true
        FROM order_items i
        WHERE i.order_item_id = d.order_item_id
          AND i.shipped
          AND NOT d.shipped
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    let order_repaired = sqlx::query(
        r#"
        UPDATE order_items i
        SET shipped = true
        FROM orders_to_deliver d
        WHERE d.order_item_id = i.order_item_id
          AND d.shipped
          AND NOT i.shipped
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    Ok((seller_repaired, order_repaired))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(matched: bool, error: Option<&str>) -> WriteOutcome {
        WriteOutcome {
            matched,
            error: error.map(String::from),
        }
    }

    #[test]
    fn both_writes_matched_is_completed() {
        let report = ShipmentReport {
            order_record: outcome(true, None),
            seller_copy: outcome(true, None),
        };
        assert_eq!(report.classify(), ShipmentStatus::Completed);
    }

    #[test]
    fn order_side_failure_is_reported_even_if_seller_copy_succeeded() {
        let report = ShipmentReport {
            order_record: outcome(false, Some("connection reset")),
            seller_copy: outcome(true, None),
        };
        assert_eq!(report.classify(), ShipmentStatus::Failed);
        assert!(report.order_record.error.is_some());
        assert!(report.seller_copy.error.is_none());
    }

    #[test]
    fn seller_side_failure_is_reported_even_if_order_succeeded() {
        let report = ShipmentReport {
            order_record: outcome(true, None),
            seller_copy: outcome(false, Some("timeout")),
        };
        assert_eq!(report.classify(), ShipmentStatus::Failed);
        assert!(report.order_record.error.is_none());
        assert_eq!(report.seller_copy.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn nothing_matched_means_not_found() {
        let report = ShipmentReport {
            order_record: outcome(false, None),
            seller_copy: outcome(false, None),
        };
        assert_eq!(report.classify(), ShipmentStatus::NotFound);
    }

    #[test]
    fn missing_seller_copy_alone_is_not_an_error() {
        // 权威记录命中而副本缺失属于可检测的分歧，交给对账修复
        let report = ShipmentReport {
            order_record: outcome(true, None),
            seller_copy: outcome(false, None),
        };
        assert_eq!(report.classify(), ShipmentStatus::Completed);
    }

    #[test]
    fn report_serializes_per_write() {
        let report = ShipmentReport {
            order_record: outcome(true, None),
            seller_copy: outcome(false, Some("timeout")),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["orderRecord"]["matched"], true);
        assert_eq!(value["sellerCopy"]["error"], "timeout");
    }

    #[test]
    fn unresolved_product_serializes_as_null() {
        let item = DeliveryItem {
            order_item_id: "oi-1".into(),
            product_id: "p-gone".into(),
            shipped: false,
            product: None,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["orderItemId"], "oi-1");
        assert!(value["product"].is_null());
    }
}
