use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::ApiError,
    routes::{account::model::User, product::Product},
    utils::{Claims, success_to_api_response},
};

use super::model::WishlistEntry;

#[derive(Debug, Deserialize)]
pub struct ProductIdQuery {
    #[serde(rename = "productId")]
    pub product_id: String,
}

#[derive(Debug, Serialize)]
pub struct AddToWishlistResponse {
    pub message: String,
    pub user: User,
}

/// 心愿单条目与解析出的商品是两个平行集合，
/// 已下架商品的条目照常返回，只是没有对应的商品记录
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistResponse {
    pub message: String,
    pub wish_list: Vec<WishlistEntry>,
    pub wish_list_items: Vec<Product>,
}

#[axum::debug_handler]
pub async fn add_to_wishlist(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(query): Query<ProductIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    WishlistEntry::add(&state.pool, &claims.sub, &query.product_id).await?;

    let user = User::find_by_id(&state.pool, &claims.sub)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok((
        StatusCode::OK,
        success_to_api_response(AddToWishlistResponse {
            message: "Added to your wish list".into(),
            user,
        }),
    ))
}

#[axum::debug_handler]
pub async fn get_wishlist(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let wish_list = WishlistEntry::list_for_user(&state.pool, &claims.sub).await?;
    let wish_list_items =
        Product::find_by_ids(&state.pool, &WishlistEntry::product_ids(&wish_list)).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(WishlistResponse {
            message: "User wishlist info".into(),
            wish_list,
            wish_list_items,
        }),
    ))
}

#[axum::debug_handler]
pub async fn remove_from_wishlist(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(query): Query<ProductIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    WishlistEntry::remove(&state.pool, &claims.sub, &query.product_id).await?;

    let wish_list = WishlistEntry::list_for_user(&state.pool, &claims.sub).await?;
    let wish_list_items =
        Product::find_by_ids(&state.pool, &WishlistEntry::product_ids(&wish_list)).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(WishlistResponse {
            message: "Deleted successfully".into(),
            wish_list,
            wish_list_items,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn add_response_carries_only_message_and_user() {
        let response = AddToWishlistResponse {
            message: "Added to your wish list".into(),
            user: User {
                user_id: "u-1".into(),
                username: "ab".into(),
                email: "j@x.com".into(),
                password_hash: "$2b$10$stored".into(),
                first_name: "Jo".into(),
                last_name: "Doe".into(),
                gender: None,
                nationality: None,
                birth_date: None,
                creation_date: Utc::now(),
                is_admin: false,
                is_seller: false,
                is_customer: true,
            },
        };

        let value = serde_json::to_value(&response).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"message"));
        assert!(keys.contains(&"user"));
    }
}
