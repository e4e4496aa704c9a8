use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::ApiError,
    routes::account::model::User,
    utils::{ApiResponse, Claims, error_codes, success_to_api_response},
};

use super::model::{DeliveryItem, ShipmentReport, ShipmentStatus, list_for_seller};

#[derive(Debug, Deserialize)]
pub struct OrderIdQuery {
    #[serde(rename = "orderId")]
    pub order_id: String,
}

/// 卖家视图：用户记录加上已解析的发货列表
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    #[serde(flatten)]
    pub user: User,
    pub orders_to_deliver: Vec<DeliveryItem>,
}

#[derive(Debug, Serialize)]
pub struct SellerOrdersResponse {
    pub user: SellerProfile,
}

#[derive(Debug, Serialize)]
pub struct MarkShippedResponse {
    pub message: String,
    pub user: SellerProfile,
}

async fn seller_profile(state: &AppState, user_id: &str) -> Result<SellerProfile, ApiError> {
    let user = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    let orders_to_deliver = list_for_seller(&state.pool, user_id).await?;

    Ok(SellerProfile {
        user,
        orders_to_deliver,
    })
}

#[axum::debug_handler]
pub async fn orders_to_deliver(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let user = seller_profile(&state, &claims.sub).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(SellerOrdersResponse { user }),
    ))
}

#[axum::debug_handler]
pub async fn mark_shipped(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(query): Query<OrderIdQuery>,
) -> Result<Response, ApiError> {
    let report = ShipmentReport::apply(&state.pool, &query.order_id, &claims.sub).await;

    match report.classify() {
        ShipmentStatus::NotFound => Err(ApiError::NotFound("Order item")),
        ShipmentStatus::Failed => {
            // 部分失败按写入逐项上报，不合并成一个含糊的错误；
            // 已落盘的一侧保持原样，等待对账修复
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(ApiResponse {
                    code: error_codes::PERSISTENCE_ERROR,
                    msg: "Shipment state not fully propagated".into(),
                    resp_data: Some(report),
                }),
            )
                .into_response())
        }
        ShipmentStatus::Completed => {
            if !report.order_record.matched {
                tracing::warn!(
                    "seller copy marked shipped but canonical order item {} was not matched",
                    query.order_id
                );
            }

            let user = seller_profile(&state, &claims.sub).await?;
            Ok((
                StatusCode::OK,
                success_to_api_response(MarkShippedResponse {
                    message: "Marked as shipped".into(),
                    user,
                }),
            )
                .into_response())
        }
    }
}
