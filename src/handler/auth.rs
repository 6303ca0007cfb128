use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use validator::Validate;

use crate::{
    db::userdb::{NewUser, UserExt},
    dtos::userdtos::{
        FilterUserDto, LoginUserDto, RegisterUserDto, Response, UserData, UserLoginResponseDto,
        UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    models::usermodel::UserRole,
    utils::{password, text, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

fn cookie_headers(cookie: Cookie<'_>) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );
    Ok(headers)
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let email = body.email.trim().to_lowercase();

    let existing = app_state
        .db_client
        .get_user(None, None, Some(&email))
        .await
        .map_err(HttpError::from_db)?;
    if existing.is_some() {
        return Err(HttpError::field("email", ErrorMessage::EmailExist.to_string()));
    }

    let existing = app_state
        .db_client
        .get_user(None, Some(body.username.trim()), None)
        .await
        .map_err(HttpError::from_db)?;
    if existing.is_some() {
        return Err(HttpError::field("username", ErrorMessage::UsernameExist.to_string()));
    }

    let hashed_password =
        password::hash(&body.password).map_err(|e| HttpError::server_error(e.to_string()))?;

    let user = app_state
        .db_client
        .save_user(NewUser {
            username: body.username.trim().to_string(),
            email,
            password: hashed_password,
            first_name: text::sanitize(&body.first_name),
            last_name: text::sanitize(&body.last_name),
            phone: body.phone,
            role: body.role.unwrap_or(UserRole::Client),
        })
        .await
        .map_err(HttpError::from_db)?;

    tracing::info!("registered user {} as {}", user.username, user.role.to_str());

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: UserData {
                user: FilterUserDto::filter_user(&user),
            },
        }),
    ))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let result = app_state
        .db_client
        .get_user_by_identifier(body.email.trim())
        .await
        .map_err(HttpError::from_db)?;

    let user = result.ok_or(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &user.password)
        .map_err(|_| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    if !password_matched {
        return Err(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()));
    }

    let token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cookie = Cookie::build(("token", token.clone()))
        .path("/")
        .max_age(time::Duration::minutes(app_state.env.jwt_maxage))
        .http_only(true)
        .build();

    let response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token,
        user: FilterUserDto::filter_user(&user),
    });

    let mut response = response.into_response();
    response.headers_mut().extend(cookie_headers(cookie)?);

    Ok(response)
}

pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let cookie = Cookie::build(("token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    let mut response = Json(Response {
        status: "success",
        message: "Logged out".to_string(),
    })
    .into_response();
    response.headers_mut().extend(cookie_headers(cookie)?);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logout_expires_the_cookie() {
        let response = logout().await.unwrap().into_response();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("Max-Age=0"));
    }
}
