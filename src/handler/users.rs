use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::userdtos::{
        FilterUserDto, PreferencesResponseDto, UpdatePreferencesDto, UpdateProfileDto, UserData,
        UserResponseDto,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    utils::text,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/preferences", get(get_preferences).put(update_preferences))
}

pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user.user),
        },
    }))
}

pub async fn update_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    body.first_name = text::sanitize_opt(body.first_name);
    body.last_name = text::sanitize_opt(body.last_name);
    body.address = text::sanitize_opt(body.address);

    let updated = app_state
        .db_client
        .update_profile(user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&updated),
        },
    }))
}

pub async fn get_preferences(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let preferences = app_state
        .db_client
        .get_preferences(user.user.id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(PreferencesResponseDto {
        status: "success".to_string(),
        data: preferences,
    }))
}

pub async fn update_preferences(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdatePreferencesDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let preferences = app_state
        .db_client
        .update_preferences(user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(PreferencesResponseDto {
        status: "success".to_string(),
        data: preferences,
    }))
}
