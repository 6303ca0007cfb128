use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::tariffdb::{SubscriptionRow, TariffExt},
    dtos::{
        tariffdtos::{
            initial_terms, CancelSubscriptionDto, PlanDto, PlanQueryDto, SubscribeDto,
            SubscriptionDto,
        },
        userdtos::ListResponse,
    },
    error::HttpError,
    middleware::{auth, JWTAuthMiddeware},
    models::tariffmodel::SubscriptionStatus,
    service::error::ServiceError,
    utils::text,
    AppState,
};

pub fn tariffs_handler() -> Router {
    let subscriptions = Router::new()
        .route("/subscriptions", get(get_my_subscriptions).post(subscribe))
        .route("/subscriptions/:subscription_id/cancel", post(cancel_subscription))
        .route("/subscriptions/:subscription_id/usage", get(get_subscription_usage))
        .layer(middleware::from_fn(auth));

    Router::new()
        .route("/categories", get(get_categories))
        .route("/plans", get(get_plans))
        .route("/plans/:slug", get(get_plan))
        .merge(subscriptions)
}

pub async fn get_categories(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state
        .db_client
        .get_tariff_categories()
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(categories)))
}

pub async fn get_plans(
    Query(query): Query<PlanQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let plans = app_state
        .db_client
        .get_plans(&query)
        .await
        .map_err(HttpError::from_db)?;

    let results: Vec<PlanDto> = plans.into_iter().map(PlanDto::from).collect();
    Ok(Json(ListResponse::all(results)))
}

pub async fn get_plan(
    Path(slug): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let plan = app_state
        .db_client
        .get_plan(None, Some(&slug))
        .await
        .map_err(HttpError::from_db)?
        .ok_or(ServiceError::NotFound("Plan"))?;

    Ok(Json(json!({
        "status": "success",
        "data": PlanDto::from(plan),
    })))
}

pub async fn subscribe(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<SubscribeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let plan = app_state
        .db_client
        .get_plan(Some(body.plan_id), None)
        .await
        .map_err(HttpError::from_db)?
        .ok_or_else(|| HttpError::field("plan_id", "Unknown or inactive plan"))?;

    let start = Utc::now();
    let (status, end) = initial_terms(&plan, start);

    let subscription = app_state
        .db_client
        .create_subscription(user.user.id, &plan, status, start, end, body.auto_renew)
        .await
        .map_err(HttpError::from_db)?;

    tracing::info!(
        "{} subscribed to {} ({:?})",
        user.user.username,
        plan.slug,
        subscription.status
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": SubscriptionDto::at(subscription, plan.name, start),
        })),
    ))
}

pub async fn get_my_subscriptions(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let rows = app_state
        .db_client
        .get_user_subscriptions(user.user.id)
        .await
        .map_err(HttpError::from_db)?;

    let now = Utc::now();
    let results: Vec<SubscriptionDto> = rows
        .into_iter()
        .map(|row| SubscriptionDto::at(row.subscription, row.plan_name, now))
        .collect();

    Ok(Json(ListResponse::all(results)))
}

async fn own_subscription(
    app_state: &AppState,
    subscription_id: Uuid,
    user_id: Uuid,
) -> Result<SubscriptionRow, HttpError> {
    app_state
        .db_client
        .get_subscription(subscription_id)
        .await
        .map_err(HttpError::from_db)?
        .filter(|row| row.subscription.user_id == user_id)
        .ok_or_else(|| ServiceError::NotFound("Subscription").into())
}

pub async fn get_subscription_usage(
    Path(subscription_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    own_subscription(&app_state, subscription_id, user.user.id).await?;

    let usage = app_state
        .db_client
        .get_subscription_usage(subscription_id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(usage)))
}

pub async fn cancel_subscription(
    Path(subscription_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    body: Option<Json<CancelSubscriptionDto>>,
) -> Result<impl IntoResponse, HttpError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    body.validate()?;

    let row = own_subscription(&app_state, subscription_id, user.user.id).await?;

    if matches!(
        row.subscription.status,
        SubscriptionStatus::Cancelled | SubscriptionStatus::Expired
    ) {
        return Err(HttpError::field(
            "status",
            "This subscription is no longer running",
        ));
    }

    let cancelled = app_state
        .db_client
        .cancel_subscription(subscription_id, text::sanitize_opt(body.reason))
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(json!({
        "status": "success",
        "data": SubscriptionDto::at(cancelled, row.plan_name, Utc::now()),
    })))
}
