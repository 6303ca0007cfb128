use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put, MethodRouter},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        locationdb::LocationExt, mediadb::MediaExt, propertydb::PropertyExt, tariffdb::TariffExt,
    },
    dtos::{
        propertydtos::{
            CreatePropertyDto, CreateViewingDto, PropertyDetailDto, PropertyListDto,
            PropertyResponseDto, UpdatePropertyDto,
        },
        userdtos::{ListResponse, Response},
    },
    error::HttpError,
    handler::agents::require_agent,
    middleware::{auth, optional_auth, role_check, JWTAuthMiddeware},
    models::{
        propertymodel::{Property, PropertyRecord},
        tariffmodel::UsageKind,
        usermodel::{User, UserRole},
    },
    service::{error::ServiceError, property_filter::PropertyFilter, slug::assign_unique_slug},
    utils::text,
    AppState,
};

const SLUG_CONSTRAINT: &str = "properties_slug_key";

pub fn properties_handler() -> Router {
    Router::new()
        .route(
            "/",
            get(search_properties).merge(create_route().layer(middleware::from_fn(auth))),
        )
        .route("/search", get(search_properties))
        .route("/types", get(get_property_types))
        .route("/statuses", get(get_property_statuses))
        .route(
            "/:slug",
            get(get_property)
                .layer(middleware::from_fn(optional_auth))
                .merge(
                    put(update_property)
                        .delete(delete_property)
                        .layer(middleware::from_fn(auth)),
                ),
        )
        .route(
            "/:slug/viewings",
            post(schedule_viewing).layer(middleware::from_fn(auth)),
        )
}

/// Listing creation, gated on the agent role before the body is read.
fn create_route() -> MethodRouter {
    post(create_property).layer(middleware::from_fn(|state, req, next| {
        role_check(state, req, next, vec![UserRole::Agent])
    }))
}

fn can_manage(owner_id: Uuid, user: &User) -> bool {
    owner_id == user.id || user.is_admin()
}

fn is_slug_collision(err: &sqlx::Error) -> bool {
    err.as_database_error().map_or(false, |db_err| {
        db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(SLUG_CONSTRAINT)
    })
}

async fn find_record(app_state: &AppState, slug: &str) -> Result<PropertyRecord, HttpError> {
    app_state
        .db_client
        .get_property_record(slug)
        .await
        .map_err(HttpError::from_db)?
        .ok_or_else(|| HttpError::not_found("Property not found"))
}

async fn owned_record(
    app_state: &AppState,
    slug: &str,
    user: &User,
) -> Result<PropertyRecord, HttpError> {
    let record = find_record(app_state, slug).await?;
    if !can_manage(record.agent_user_id, user) {
        return Err(ServiceError::NotOwner(user.id, "property").into());
    }
    Ok(record)
}

/// Usage is counted against the caller's current subscription when there is
/// one. Failures here never undo the action that was metered.
pub(crate) async fn meter_usage(app_state: &AppState, user_id: Uuid, kind: UsageKind, what: &str) {
    match app_state.db_client.record_usage(user_id, kind, 1, what).await {
        Ok(Some(subscription_id)) => {
            tracing::debug!("recorded {:?} usage on subscription {}", kind, subscription_id)
        }
        Ok(None) => {}
        Err(e) => tracing::error!("failed to record {:?} usage for {}: {}", kind, user_id, e),
    }
}

pub async fn search_properties(
    Query(params): Query<HashMap<String, String>>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = PropertyFilter::from_params(&params)?;

    let (records, count) = app_state
        .db_client
        .search_properties(&filter)
        .await
        .map_err(HttpError::from_db)?;

    let results: Vec<PropertyListDto> = records.iter().map(PropertyListDto::from_record).collect();
    Ok(Json(ListResponse::new(count, results)))
}

pub async fn get_property_types(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let types = app_state
        .db_client
        .get_property_types()
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(types)))
}

pub async fn get_property_statuses(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let statuses = app_state
        .db_client
        .get_property_statuses()
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(statuses)))
}

pub async fn get_property(
    Path(slug): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    user: Option<Extension<JWTAuthMiddeware>>,
) -> Result<impl IntoResponse, HttpError> {
    let mut record = find_record(&app_state, &slug).await?;
    let db = &app_state.db_client;

    if user.is_none() {
        let property_id = record.property.id;
        let area_id = record.property.area_id;
        futures::try_join!(db.increment_views(property_id), db.record_area_view(area_id))
            .map_err(HttpError::from_db)?;
        record.property.views_count += 1;
    }

    let (features, images) = futures::try_join!(
        db.get_features(record.property.id),
        db.get_property_images(record.property.id),
    )
    .map_err(HttpError::from_db)?;

    Ok(Json(PropertyResponseDto::success(
        PropertyDetailDto::from_record(record, features, images),
    )))
}

async fn insert_with_slug(
    app_state: &AppState,
    agent_id: Uuid,
    body: &CreatePropertyDto,
    area_name: &str,
) -> Result<Property, HttpError> {
    let db = &app_state.db_client;

    let slug = assign_unique_slug(db, &body.title, area_name).await?;
    match db.create_property(agent_id, slug, body).await {
        Ok(property) => Ok(property),
        Err(err) if is_slug_collision(&err) => {
            tracing::warn!("slug for \"{}\" was taken concurrently, retrying", body.title);
            let slug = assign_unique_slug(db, &body.title, area_name).await?;
            db.create_property(agent_id, slug, body)
                .await
                .map_err(HttpError::from_db)
        }
        Err(err) => Err(HttpError::from_db(err)),
    }
}

pub async fn create_property(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<CreatePropertyDto>,
) -> Result<impl IntoResponse, HttpError> {
    let agent = require_agent(&app_state, user.user.id).await?;

    body.validate_all()?;
    body.title = text::sanitize(&body.title);
    body.description = text::sanitize(&body.description);
    body.other_documentation = text::sanitize_opt(body.other_documentation);

    let area = app_state
        .db_client
        .get_area(body.area_id)
        .await
        .map_err(HttpError::from_db)?
        .ok_or_else(|| ServiceError::validation("area_id", "Unknown area"))?;

    let property = insert_with_slug(&app_state, agent.id, &body, &area.area.name).await?;

    tracing::info!("agent {} listed property {}", user.user.username, property.slug);
    meter_usage(
        &app_state,
        user.user.id,
        UsageKind::Property,
        &format!("Listed {}", property.slug),
    )
    .await;

    Ok((StatusCode::CREATED, Json(PropertyResponseDto::success(property))))
}

pub async fn update_property(
    Path(slug): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<UpdatePropertyDto>,
) -> Result<impl IntoResponse, HttpError> {
    let record = owned_record(&app_state, &slug, &user.user).await?;

    body.title = body.title.map(|t| text::sanitize(&t));
    body.description = body.description.map(|d| text::sanitize(&d));
    body.other_documentation = text::sanitize_opt(body.other_documentation);

    let mut property = record.property;
    let features = body.apply(&mut property)?;

    let updated = app_state
        .db_client
        .update_property(&property, features)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(PropertyResponseDto::success(updated)))
}

pub async fn delete_property(
    Path(slug): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let record = owned_record(&app_state, &slug, &user.user).await?;

    app_state
        .db_client
        .deactivate_property(record.property.id)
        .await
        .map_err(HttpError::from_db)?;

    tracing::info!("{} deactivated property {}", user.user.username, slug);

    Ok(Json(Response {
        status: "success",
        message: "Property deactivated".to_string(),
    }))
}

pub async fn schedule_viewing(
    Path(slug): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<CreateViewingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let record = find_record(&app_state, &slug).await?;
    body.notes = text::sanitize_opt(body.notes);

    let viewing = app_state
        .db_client
        .schedule_viewing(record.property.id, user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    Ok((StatusCode::CREATED, Json(PropertyResponseDto::success(viewing))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{state, user_with_role};
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn create_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn non_agent_create_is_forbidden_before_the_body_is_read() {
        let app = Router::new()
            .route("/", create_route())
            .layer(Extension(JWTAuthMiddeware {
                user: user_with_role(UserRole::Client),
            }))
            .layer(Extension(state()));

        // An empty object would fail validation if it ever reached the handler.
        let response = app.oneshot(create_request("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admins_do_not_create_listings_without_the_agent_role() {
        let app = Router::new()
            .route("/", create_route())
            .layer(Extension(JWTAuthMiddeware {
                user: user_with_role(UserRole::Admin),
            }))
            .layer(Extension(state()));

        let response = app.oneshot(create_request("not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn anonymous_create_is_unauthorized() {
        let app = Router::new()
            .route("/", create_route())
            .layer(Extension(state()));

        let response = app.oneshot(create_request("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn search_action_shares_the_listing_filter() {
        let app = properties_handler().layer(Extension(state()));

        let request = Request::builder()
            .uri("/search?no_of_bedrooms__gte=many")
            .body(Body::empty())
            .unwrap();
        // Rejected by the filter before any query runs, so never routed as a slug.
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn owners_and_admins_manage_listings() {
        let owner = user_with_role(UserRole::Agent);
        let stranger = user_with_role(UserRole::Agent);
        let admin = user_with_role(UserRole::Admin);

        assert!(can_manage(owner.id, &owner));
        assert!(can_manage(owner.id, &admin));
        assert!(!can_manage(owner.id, &stranger));
    }

    #[tokio::test]
    #[ignore = "needs Postgres at TEST_DATABASE_URL"]
    async fn racing_creates_with_one_title_get_distinct_slugs() {
        use crate::db::fixtures::{create_test_agent, listing, reference, setup_test_database};
        use crate::handler::test_support::state_with;
        use crate::service::slug::base_slug;

        let app_state = state_with(setup_test_database().await);
        let refs = reference(&app_state.db_client).await;
        let (_, agent) = create_test_agent(&app_state.db_client).await;

        let title = format!("Duplex {}", &Uuid::new_v4().simple().to_string()[..8]);
        let body = listing(&refs, &title, "rent", 150_000);

        let (first, second) = tokio::join!(
            insert_with_slug(&app_state, agent.id, &body, &refs.area_name),
            insert_with_slug(&app_state, agent.id, &body, &refs.area_name),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        let base = base_slug(&title, &refs.area_name);
        let mut slugs = vec![first.slug, second.slug];
        slugs.sort();
        assert_eq!(slugs, vec![base.clone(), format!("{}-1", base)]);
    }
}

