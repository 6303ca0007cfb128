use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::{agentdb::AgentExt, mediadb::MediaExt, propertydb::PropertyExt},
    dtos::{
        mediadtos::{ImageUploadDto, MediaQueryDto, MediaUploadDto, UploadFields},
        userdtos::{ListResponse, Response},
    },
    error::HttpError,
    handler::properties::meter_usage,
    middleware::{auth, JWTAuthMiddeware},
    models::{
        mediamodel::{check_upload, MediaFileType, MAX_UPLOAD_BYTES},
        propertymodel::Property,
        tariffmodel::UsageKind,
        usermodel::User,
    },
    service::{error::ServiceError, file_store::StoredFile},
    AppState,
};

// Room for the text parts next to a file at the size ceiling.
const BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn media_handler() -> Router {
    let uploads = Router::new()
        .route("/", post(upload_media))
        .route("/:media_id", delete(delete_media))
        .route("/images", post(upload_image))
        .route("/images/:image_id/primary", put(set_primary_image))
        .layer(middleware::from_fn(auth));

    Router::new()
        .route("/", get(get_media))
        .route("/images", get(get_images))
        .merge(uploads)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

/// The active listing behind `property_id`, provided `user` is its agent or
/// an admin.
pub(crate) async fn managed_property(
    app_state: &AppState,
    property_id: Uuid,
    user: &User,
) -> Result<Property, HttpError> {
    let property = app_state
        .db_client
        .get_property(property_id)
        .await
        .map_err(HttpError::from_db)?
        .ok_or(ServiceError::PropertyNotFound(property_id))?;

    if user.is_admin() {
        return Ok(property);
    }

    let agent = app_state
        .db_client
        .get_agent_by_user(user.id)
        .await
        .map_err(HttpError::from_db)?;

    match agent {
        Some(agent) if agent.id == property.agent_id => Ok(property),
        _ => Err(ServiceError::NotOwner(user.id, "property").into()),
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadFields, HttpError> {
    let mut upload = UploadFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            upload.file_name = field.file_name().map(str::to_string);
            upload.bytes = field
                .bytes()
                .await
                .map_err(|e| HttpError::bad_request(e.body_text()))?
                .to_vec();
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| HttpError::bad_request(e.body_text()))?;
            upload.text.insert(name, value);
        }
    }

    Ok(upload)
}

async fn store_file(
    app_state: &AppState,
    file_type: MediaFileType,
    property_id: Uuid,
    file_name: &str,
    bytes: &[u8],
) -> Result<StoredFile, HttpError> {
    let extension =
        check_upload(file_type, file_name, bytes.len()).map_err(|msg| HttpError::field("file", msg))?;

    let folder = format!("properties/{}", property_id);
    Ok(app_state.file_store.save(&folder, &extension, bytes).await?)
}

/// Removes bytes that were written for a row that never made it to the
/// database.
async fn discard(app_state: &AppState, stored: &StoredFile) {
    if let Err(e) = app_state.file_store.delete(&stored.path).await {
        tracing::warn!("could not remove orphaned upload {}: {}", stored.path, e);
    }
}

pub async fn upload_media(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let upload = MediaUploadDto::from_fields(read_upload(multipart).await?)?;

    managed_property(&app_state, upload.property_id, &user.user).await?;

    let stored = store_file(
        &app_state,
        upload.file_type,
        upload.property_id,
        &upload.file_name,
        &upload.bytes,
    )
    .await?;

    let media = match app_state
        .db_client
        .save_media_file(user.user.id, &upload, stored.clone())
        .await
    {
        Ok(media) => media,
        Err(e) => {
            discard(&app_state, &stored).await;
            return Err(HttpError::from_db(e));
        }
    };

    let usage = match media.file_type {
        MediaFileType::Image => Some(UsageKind::Photo),
        MediaFileType::Video => Some(UsageKind::Video),
        _ => None,
    };
    if let Some(kind) = usage {
        meter_usage(&app_state, user.user.id, kind, &media.original_name).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": media,
        })),
    ))
}

pub async fn get_media(
    Query(query): Query<MediaQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let files = app_state
        .db_client
        .get_media_files(query.property_id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(files)))
}

pub async fn delete_media(
    Path(media_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .db_client
        .deactivate_media_file(media_id, user.user.id)
        .await
        .map_err(HttpError::from_db)?;

    if !deleted {
        return Err(ServiceError::NotFound("Media file").into());
    }

    Ok(Json(Response {
        status: "success",
        message: "Media file deleted".to_string(),
    }))
}

pub async fn upload_image(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let upload = ImageUploadDto::from_fields(read_upload(multipart).await?)?;

    managed_property(&app_state, upload.property_id, &user.user).await?;

    let stored = store_file(
        &app_state,
        MediaFileType::Image,
        upload.property_id,
        &upload.file_name,
        &upload.bytes,
    )
    .await?;

    let image = match app_state
        .db_client
        .save_property_image(user.user.id, &upload, stored.clone())
        .await
    {
        Ok(image) => image,
        Err(e) => {
            discard(&app_state, &stored).await;
            return Err(HttpError::from_db(e));
        }
    };

    meter_usage(&app_state, user.user.id, UsageKind::Photo, &upload.file_name).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": image,
        })),
    ))
}

pub async fn get_images(
    Query(query): Query<MediaQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let images = app_state
        .db_client
        .get_property_images(query.property_id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(images)))
}

pub async fn set_primary_image(
    Path(image_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let image = app_state
        .db_client
        .get_property_image(image_id)
        .await
        .map_err(HttpError::from_db)?
        .ok_or(ServiceError::NotFound("Image"))?;

    managed_property(&app_state, image.property_id, &user.user).await?;

    let image = app_state
        .db_client
        .set_primary_image(&image)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(json!({
        "status": "success",
        "data": image,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{state, user_with_role};
    use crate::models::usermodel::UserRole;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn uploads_need_a_signed_in_user() {
        let app = media_handler().layer(Extension(state()));

        let request = Request::builder()
            .method("POST")
            .uri("/images")
            .header("content-type", "multipart/form-data; boundary=x")
            .body(Body::from("--x--\r\n"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_any_lookup() {
        let app = Router::new()
            .route("/", post(upload_media))
            .layer(Extension(JWTAuthMiddeware {
                user: user_with_role(UserRole::Agent),
            }))
            .layer(Extension(state()));

        let body = "--x\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            Front\r\n\
            --x--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "multipart/form-data; boundary=x")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
