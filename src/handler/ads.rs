use std::{net::IpAddr, sync::Arc};

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::addb::{AdEvent, AdExt, AdVisitor, NewAdvertisement},
    dtos::{
        addtos::{
            check_window, AdQueryDto, AdvertisementDto, BannerDto, CreateAdvertisementDto,
            CreateBannerDto, CreatePromotionDto, PromotionDto, ReviewAdDto,
        },
        userdtos::ListResponse,
    },
    error::HttpError,
    handler::media::managed_property,
    middleware::{auth, optional_auth, role_check, JWTAuthMiddeware},
    models::usermodel::{User, UserRole},
    service::error::ServiceError,
    utils::text,
    AppState,
};

pub fn ads_handler() -> Router {
    let admin_only = Router::new()
        .route("/:ad_id/review", put(review_advertisement))
        .route("/banners", post(create_banner))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn(auth));

    let signed_in = Router::new()
        .route("/", post(create_advertisement))
        .route("/mine", get(get_my_advertisements))
        .route("/:ad_id", get(get_advertisement))
        .route("/promotions", post(create_promotion))
        .layer(middleware::from_fn(auth));

    let tracking = Router::new()
        .route("/:ad_id/impression", post(record_impression))
        .route("/:ad_id/click", post(record_click))
        .route("/:ad_id/conversion", post(record_conversion))
        .layer(middleware::from_fn(optional_auth));

    Router::new()
        .route("/", get(get_running_advertisements))
        .route("/packages", get(get_ad_packages))
        .route("/banners", get(get_live_banners))
        .route("/promotions", get(get_live_promotions))
        .merge(admin_only)
        .merge(signed_in)
        .merge(tracking)
}

fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), HttpError> {
    check_window(start, end).map_err(|err| {
        let message = err
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "Invalid date range".to_string());
        HttpError::field("end_date", message)
    })
}

/// Client address from the proxy headers, first hop wins. Values that do
/// not parse as an address are dropped.
fn visitor(headers: &HeaderMap, user: Option<&User>) -> AdVisitor {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let parse_ip = |raw: &str| raw.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string());

    let ip_address = header_text("x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next().and_then(parse_ip))
        .or_else(|| header_text("x-real-ip").as_deref().and_then(parse_ip));

    AdVisitor {
        user_id: user.map(|u| u.id),
        ip_address,
        user_agent: header_text(header::USER_AGENT.as_str()),
    }
}

pub async fn get_ad_packages(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let packages = app_state
        .db_client
        .get_ad_packages()
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(packages)))
}

pub async fn get_running_advertisements(
    Query(query): Query<AdQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let ads = app_state
        .db_client
        .get_running_advertisements(query.placement)
        .await
        .map_err(HttpError::from_db)?;

    let now = Utc::now();
    let results: Vec<AdvertisementDto> = ads
        .into_iter()
        .map(|ad| AdvertisementDto::at(ad, now))
        .collect();

    Ok(Json(ListResponse::all(results)))
}

pub async fn create_advertisement(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateAdvertisementDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let package = app_state
        .db_client
        .get_ad_package(body.package_id)
        .await
        .map_err(HttpError::from_db)?
        .filter(|package| package.is_active)
        .ok_or_else(|| HttpError::field("package_id", "Unknown advertising package"))?;

    let end_date = body
        .end_date
        .unwrap_or_else(|| body.start_date + Duration::days(i64::from(package.duration_days)));
    window(body.start_date, end_date)?;

    if let Some(property_id) = body.property_id {
        managed_property(&app_state, property_id, &user.user).await?;
    }

    let ad = app_state
        .db_client
        .create_advertisement(NewAdvertisement {
            property_id: body.property_id,
            advertiser_id: user.user.id,
            package,
            title: text::sanitize(&body.title),
            description: text::sanitize(&body.description),
            start_date: body.start_date,
            end_date,
        })
        .await
        .map_err(HttpError::from_db)?;

    tracing::info!("{} submitted advertisement {}", user.user.username, ad.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": AdvertisementDto::at(ad, Utc::now()),
        })),
    ))
}

pub async fn get_my_advertisements(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let ads = app_state
        .db_client
        .get_user_advertisements(user.user.id)
        .await
        .map_err(HttpError::from_db)?;

    let now = Utc::now();
    let results: Vec<AdvertisementDto> = ads
        .into_iter()
        .map(|ad| AdvertisementDto::at(ad, now))
        .collect();

    Ok(Json(ListResponse::all(results)))
}

pub async fn get_advertisement(
    Path(ad_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let ad = app_state
        .db_client
        .get_advertisement(ad_id)
        .await
        .map_err(HttpError::from_db)?
        .ok_or(ServiceError::NotFound("Advertisement"))?;

    if ad.advertiser_id != user.user.id && !user.user.is_admin() {
        return Err(ServiceError::NotOwner(user.user.id, "advertisement").into());
    }

    Ok(Json(json!({
        "status": "success",
        "data": AdvertisementDto::at(ad, Utc::now()),
    })))
}

async fn record_event(
    app_state: &AppState,
    ad_id: Uuid,
    event: AdEvent,
    visitor: AdVisitor,
) -> Result<impl IntoResponse, HttpError> {
    let recorded = app_state
        .db_client
        .record_ad_event(ad_id, event, visitor)
        .await
        .map_err(HttpError::from_db)?;

    if !recorded {
        return Err(ServiceError::NotFound("Advertisement").into());
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_impression(
    Path(ad_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    user: Option<Extension<JWTAuthMiddeware>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let visitor = visitor(&headers, user.as_ref().map(|u| &u.user));
    record_event(&app_state, ad_id, AdEvent::Impression, visitor).await
}

pub async fn record_click(
    Path(ad_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    user: Option<Extension<JWTAuthMiddeware>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let visitor = visitor(&headers, user.as_ref().map(|u| &u.user));
    record_event(&app_state, ad_id, AdEvent::Click, visitor).await
}

pub async fn record_conversion(
    Path(ad_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    user: Option<Extension<JWTAuthMiddeware>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let visitor = visitor(&headers, user.as_ref().map(|u| &u.user));
    record_event(&app_state, ad_id, AdEvent::Conversion, visitor).await
}

pub async fn review_advertisement(
    Path(ad_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<ReviewAdDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let status = body.resulting_status();
    let ad = app_state
        .db_client
        .review_advertisement(
            ad_id,
            user.user.id,
            status,
            text::sanitize_opt(body.rejection_reason),
        )
        .await
        .map_err(HttpError::from_db)?
        .ok_or(ServiceError::NotFound("Advertisement"))?;

    tracing::info!("{} set advertisement {} to {:?}", user.user.username, ad.id, status);

    Ok(Json(json!({
        "status": "success",
        "data": AdvertisementDto::at(ad, Utc::now()),
    })))
}

pub async fn get_live_banners(
    Query(query): Query<AdQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let banners = app_state
        .db_client
        .get_live_banners(query.placement)
        .await
        .map_err(HttpError::from_db)?;

    let now = Utc::now();
    let results: Vec<BannerDto> = banners
        .into_iter()
        .map(|banner| BannerDto::at(banner, now))
        .collect();

    Ok(Json(ListResponse::all(results)))
}

pub async fn create_banner(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<CreateBannerDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;
    window(body.start_date, body.end_date)?;

    body.title = text::sanitize(&body.title);

    let banner = app_state
        .db_client
        .create_banner(user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": BannerDto::at(banner, Utc::now()),
        })),
    ))
}

pub async fn get_live_promotions(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let promotions = app_state
        .db_client
        .get_live_promotions()
        .await
        .map_err(HttpError::from_db)?;

    let now = Utc::now();
    let results: Vec<PromotionDto> = promotions
        .into_iter()
        .map(|promotion| PromotionDto::at(promotion, now))
        .collect();

    Ok(Json(ListResponse::all(results)))
}

pub async fn create_promotion(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<CreatePromotionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;
    window(body.start_date, body.end_date)?;

    managed_property(&app_state, body.property_id, &user.user).await?;

    body.badge_text = text::sanitize_opt(body.badge_text);

    let promotion = app_state
        .db_client
        .create_promotion(user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": PromotionDto::at(promotion, Utc::now()),
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{state, user_with_role};
    use axum::{body::Body, http::{HeaderValue, Request}};
    use tower::ServiceExt;

    #[test]
    fn visitor_takes_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("41.202.1.9, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        let user = user_with_role(UserRole::Client);
        let seen = visitor(&headers, Some(&user));

        assert_eq!(seen.ip_address.as_deref(), Some("41.202.1.9"));
        assert_eq!(seen.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(seen.user_id, Some(user.id));
    }

    #[test]
    fn anonymous_visitor_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("41.202.1.9"));

        let seen = visitor(&headers, None);
        assert_eq!(seen.ip_address.as_deref(), Some("41.202.1.9"));
        assert!(seen.user_agent.is_none());
        assert!(seen.user_id.is_none());
    }

    #[test]
    fn forged_forwarded_header_is_not_recorded() {
        let mut headers = HeaderMap::new();
        let forged = format!("{}, 10.0.0.2", "x".repeat(80));
        headers.insert("x-forwarded-for", HeaderValue::from_str(&forged).unwrap());

        assert!(visitor(&headers, None).ip_address.is_none());

        headers.insert("x-real-ip", HeaderValue::from_static("2c0f:f5c0:a1::7"));
        assert_eq!(
            visitor(&headers, None).ip_address.as_deref(),
            Some("2c0f:f5c0:a1::7")
        );
    }

    #[test]
    fn backwards_window_is_an_end_date_error() {
        let now = Utc::now();
        let err = window(now, now - Duration::days(1)).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.errors.unwrap().get("end_date").is_some());
    }

    #[tokio::test]
    async fn reviewing_ads_is_for_admins() {
        let app = Router::new()
            .route("/:ad_id/review", put(review_advertisement))
            .layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin])
            }))
            .layer(Extension(JWTAuthMiddeware {
                user: user_with_role(UserRole::Agent),
            }))
            .layer(Extension(state()));

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/{}/review", Uuid::new_v4()))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"decision":"approve"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
