use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::locationdb::LocationExt,
    dtos::{
        locationdtos::{build_location_tree, AreaDto, AreaQueryDto, CityQueryDto, RegionQueryDto},
        userdtos::ListResponse,
    },
    error::HttpError,
    AppState,
};

const POPULAR_LOCATIONS: i64 = 10;

pub fn locations_handler() -> Router {
    Router::new()
        .route("/countries", get(get_countries))
        .route("/regions", get(get_regions))
        .route("/cities", get(get_cities))
        .route("/areas", get(get_areas))
        .route("/areas/:area_id", get(get_area))
        .route("/tree", get(get_location_tree))
        .route("/popular", get(get_popular_locations))
}

pub async fn get_countries(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let countries = app_state
        .db_client
        .get_countries()
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(countries)))
}

pub async fn get_regions(
    Query(query): Query<RegionQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let regions = app_state
        .db_client
        .get_regions(query.country)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(regions)))
}

pub async fn get_cities(
    Query(query): Query<CityQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let cities = app_state
        .db_client
        .get_cities(query.region)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(cities)))
}

pub async fn get_areas(
    Query(query): Query<AreaQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let areas = app_state
        .db_client
        .get_areas(query.city)
        .await
        .map_err(HttpError::from_db)?;

    let results: Vec<AreaDto> = areas.into_iter().map(AreaDto::from_area).collect();
    Ok(Json(ListResponse::all(results)))
}

pub async fn get_area(
    Path(area_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let area = app_state
        .db_client
        .get_area(area_id)
        .await
        .map_err(HttpError::from_db)?
        .ok_or_else(|| HttpError::not_found("Area not found"))?;

    Ok(Json(json!({
        "status": "success",
        "data": AreaDto::from_area(area),
    })))
}

pub async fn get_location_tree(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;
    let (countries, regions, cities, areas) = futures::try_join!(
        db.get_countries(),
        db.get_regions(None),
        db.get_cities(None),
        db.get_areas(None),
    )
    .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(build_location_tree(
        countries, regions, cities, areas,
    ))))
}

pub async fn get_popular_locations(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let popular = app_state
        .db_client
        .get_popular_locations(POPULAR_LOCATIONS)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(popular)))
}
