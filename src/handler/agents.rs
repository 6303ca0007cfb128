use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{agentdb::AgentExt, propertydb::PropertyExt},
    dtos::{
        agentdtos::{
            AgentDto, AgentQueryDto, CertificationListDto, CreateCertificationDto,
            CreateReviewDto, RegisterAgentDto, ReviewDto, UpdateAgentDto,
        },
        propertydtos::PropertyListDto,
        userdtos::ListResponse,
    },
    error::HttpError,
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::{agentmodel::AgentProfile, usermodel::UserRole},
    service::error::ServiceError,
    utils::text,
    AppState,
};

pub fn agents_handler() -> Router {
    let agent_only = Router::new()
        .route("/me", get(get_my_profile).put(update_my_profile))
        .route("/me/properties", get(get_my_properties))
        .route("/me/certifications", post(add_certification))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Agent, UserRole::Admin])
        }))
        .layer(middleware::from_fn(auth));

    let signed_in = Router::new()
        .route("/register", post(register_agent))
        .layer(middleware::from_fn(auth));

    Router::new()
        .route("/", get(list_agents))
        .route("/:agent_id", get(get_agent))
        .route("/:agent_id/certifications", get(get_certifications))
        .route(
            "/:agent_id/reviews",
            get(get_reviews).merge(post(create_review).layer(middleware::from_fn(auth))),
        )
        .merge(agent_only)
        .merge(signed_in)
}

/// The caller's own agent profile, or 404.
pub(crate) async fn require_agent(
    app_state: &AppState,
    user_id: Uuid,
) -> Result<AgentProfile, HttpError> {
    app_state
        .db_client
        .get_agent_by_user(user_id)
        .await
        .map_err(HttpError::from_db)?
        .ok_or_else(|| ServiceError::AgentProfileNotFound(user_id).into())
}

async fn agent_dto(app_state: &AppState, agent_id: Uuid) -> Result<AgentDto, HttpError> {
    let db = &app_state.db_client;
    let (summary, area_ids) = futures::try_join!(
        db.get_agent_summary(Some(agent_id), None, false),
        db.get_service_area_ids(agent_id),
    )
    .map_err(HttpError::from_db)?;

    let summary = summary.ok_or_else(|| HttpError::not_found("Agent not found"))?;
    Ok(AgentDto::from_summary(&summary, area_ids))
}

pub async fn list_agents(
    Query(query): Query<AgentQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()?;

    let page = query.page.unwrap_or(1) as u32;
    let limit = query.limit.unwrap_or(20);

    let (agents, count) = app_state
        .db_client
        .list_agents(&query, page, limit)
        .await
        .map_err(HttpError::from_db)?;

    let results: Vec<AgentDto> = agents
        .iter()
        .map(|agent| AgentDto::from_summary(agent, Vec::new()))
        .collect();

    Ok(Json(ListResponse::new(count, results)))
}

pub async fn get_agent(
    Path(agent_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;
    let (summary, area_ids) = futures::try_join!(
        db.get_agent_summary(Some(agent_id), None, true),
        db.get_service_area_ids(agent_id),
    )
    .map_err(HttpError::from_db)?;

    let summary = summary.ok_or_else(|| HttpError::not_found("Agent not found"))?;

    Ok(Json(json!({
        "status": "success",
        "data": AgentDto::from_summary(&summary, area_ids),
    })))
}

pub async fn register_agent(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<RegisterAgentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let existing = app_state
        .db_client
        .get_agent_by_user(user.user.id)
        .await
        .map_err(HttpError::from_db)?;
    if existing.is_some() {
        return Err(HttpError::field("user", "You already have an agent profile"));
    }

    body.license_number = body.license_number.trim().to_string();
    body.agency_name = text::sanitize_opt(body.agency_name);
    body.agency_address = text::sanitize_opt(body.agency_address);
    body.bio = text::sanitize_opt(body.bio);

    let profile = app_state
        .db_client
        .register_agent(user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    tracing::info!("user {} registered agent profile {}", user.user.username, profile.id);

    let dto = agent_dto(&app_state, profile.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": dto,
        })),
    ))
}

pub async fn get_my_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = require_agent(&app_state, user.user.id).await?;
    let dto = agent_dto(&app_state, profile.id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": dto,
    })))
}

pub async fn update_my_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<UpdateAgentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let profile = require_agent(&app_state, user.user.id).await?;

    body.agency_name = text::sanitize_opt(body.agency_name);
    body.agency_address = text::sanitize_opt(body.agency_address);
    body.bio = text::sanitize_opt(body.bio);

    app_state
        .db_client
        .update_agent(profile.id, body)
        .await
        .map_err(HttpError::from_db)?;

    let dto = agent_dto(&app_state, profile.id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": dto,
    })))
}

pub async fn get_my_properties(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = require_agent(&app_state, user.user.id).await?;

    let records = app_state
        .db_client
        .get_agent_properties(profile.id)
        .await
        .map_err(HttpError::from_db)?;

    let results: Vec<PropertyListDto> = records.iter().map(PropertyListDto::from_record).collect();
    Ok(Json(ListResponse::all(results)))
}

pub async fn get_certifications(
    Path(agent_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let certifications = app_state
        .db_client
        .get_certifications(agent_id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(CertificationListDto {
        status: "success",
        results: certifications,
    }))
}

pub async fn add_certification(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateCertificationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    if let Some(expiry) = body.expiry_date {
        if expiry < body.issue_date {
            return Err(HttpError::field(
                "expiry_date",
                "Expiry date cannot be before the issue date",
            ));
        }
    }

    let profile = require_agent(&app_state, user.user.id).await?;

    let certification = app_state
        .db_client
        .add_certification(profile.id, body)
        .await
        .map_err(HttpError::from_db)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": certification,
        })),
    ))
}

pub async fn get_reviews(
    Path(agent_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let reviews = app_state
        .db_client
        .get_reviews(agent_id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(reviews)))
}

pub async fn create_review(
    Path(agent_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let agent = app_state
        .db_client
        .get_agent_summary(Some(agent_id), None, false)
        .await
        .map_err(HttpError::from_db)?
        .ok_or_else(|| HttpError::not_found("Agent not found"))?;

    if agent.profile.user_id == user.user.id {
        return Err(HttpError::field("agent", "You cannot review yourself"));
    }

    body.comment = text::sanitize(&body.comment);

    let review = app_state
        .db_client
        .create_review(agent_id, user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewDto {
            status: "success",
            data: review,
        }),
    ))
}
