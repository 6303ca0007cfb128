use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    handler::{
        ads::ads_handler, agents::agents_handler, auth::auth_handler,
        locations::locations_handler, media::media_handler, payments::payments_handler,
        properties::properties_handler, tariffs::tariffs_handler, users::users_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let users_routes = auth_handler().merge(users_handler().layer(middleware::from_fn(auth)));

    let api_route = Router::new()
        .nest("/users", users_routes)
        .nest("/locations", locations_handler())
        .nest("/agents", agents_handler())
        .nest("/properties", properties_handler())
        .nest("/media", media_handler())
        .nest("/ads", ads_handler())
        .nest("/tariffs", tariffs_handler())
        .nest("/payments", payments_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state.clone()));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route);

    // Uploaded files are served locally unless they live behind another host.
    let media_url = &app_state.env.media_base_url;
    if media_url.starts_with('/') {
        router = router.nest_service(media_url, ServeDir::new(&app_state.env.media_root));
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::state;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_check_is_public() {
        let app = create_router(state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
    }

    #[tokio::test]
    async fn profile_needs_a_token() {
        let app = create_router(state());

        let response = app
            .oneshot(Request::builder().uri("/api/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn listing_creation_needs_a_token() {
        let app = create_router(state());

        let request = Request::builder()
            .method("POST")
            .uri("/api/properties")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
