use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    AppState,
    error::ApiError,
    utils::{Claims, generate_token, success_to_api_response},
};

use super::model::{CreateAccountRequest, EditAccountRequest, LoginRequest, User};

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub token: String,
    pub message: String,
    pub user: User,
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::create(&state.pool, req).await?;
    let token = generate_token(&user.user_id, user.role_flags(), &state.config)?;

    Ok((
        StatusCode::CREATED,
        success_to_api_response(AccountResponse {
            token,
            message: "Registered successfully".into(),
            user,
        }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_username(&state.pool, &req.username)
        .await?
        .ok_or(ApiError::InvalidUsername)?;

    if !user.verify_login(&req.password)? {
        return Err(ApiError::InvalidPassword);
    }

    // 角色声明永远取自数据库里的当前记录
    let token = generate_token(&user.user_id, user.role_flags(), &state.config)?;

    Ok((
        StatusCode::OK,
        success_to_api_response(AccountResponse {
            token,
            message: "Logged in successfully".into(),
            user,
        }),
    ))
}

#[axum::debug_handler]
pub async fn get_self(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_id(&state.pool, &claims.sub)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok((StatusCode::OK, success_to_api_response(user)))
}

#[axum::debug_handler]
pub async fn edit_account(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<EditAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::edit(&state.pool, &claims.sub, req).await?;

    // 编辑可能把账户提升为卖家，旧令牌里的角色声明随即失效，
    // 必须基于更新后的记录重新签发
    let token = generate_token(&user.user_id, user.role_flags(), &state.config)?;

    Ok((
        StatusCode::OK,
        success_to_api_response(AccountResponse {
            token,
            message: "Account settings updated".into(),
            user,
        }),
    ))
}
