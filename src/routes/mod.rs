use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod presentations;
pub mod runs;
pub mod sections;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(presentations::router())
        .merge(sections::router())
        .merge(runs::router());

    api_router.merge(docs::router()).with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::AppConfig, dao::presentation_store::MemoryPresentationStore, state::AppState,
    };

    fn app() -> Router<()> {
        router(AppState::with_store(
            AppConfig::default(),
            Arc::new(MemoryPresentationStore::new()),
        ))
    }

    async fn call(app: &Router<()>, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let (status, body) = call(&app(), Method::GET, "/healthcheck", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "live_runs": 0}));
    }

    #[tokio::test]
    async fn presentation_lifecycle() {
        let app = app();
        let (status, created) = call(
            &app,
            Method::POST,
            "/presentations",
            Some(json!({"name": "Quarterly review"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();

        let (status, listed) = call(&app, Method::GET, "/presentations?sort_by=-name", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["page_info"], json!({"total_pages": 1, "total_items": 1}));
        assert_eq!(listed["data"][0]["name"], "Quarterly review");

        let uri = format!("/presentations/{id}");
        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn invalid_payloads_are_unprocessable() {
        let app = app();
        let (status, _) = call(
            &app,
            Method::POST,
            "/presentations",
            Some(json!({"name": "Demo"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            &app,
            Method::POST,
            "/presentations/77/sections",
            Some(json!({"name": "Opening", "duration_ms": 2000})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn paging_parameters_are_checked() {
        let (status, body) = call(&app(), Method::GET, "/presentations?page=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("page"));

        let (status, _) = call(&app(), Method::GET, "/presentations?sort_by=duration", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sections_can_be_edited_and_moved() {
        let app = app();
        let (_, presentation) = call(
            &app,
            Method::POST,
            "/presentations",
            Some(json!({"name": "Weekly sync"})),
        )
        .await;
        let sections_uri = format!("/presentations/{}/sections", presentation["id"]);

        let (status, first) = call(
            &app,
            Method::POST,
            &sections_uri,
            Some(json!({"name": "Opening", "duration_ms": 2000})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, second) = call(
            &app,
            Method::POST,
            &sections_uri,
            Some(json!({"name": "Closing", "duration_ms": 3000})),
        )
        .await;
        assert_eq!(second["position"], 1);

        let (status, _) = call(
            &app,
            Method::PATCH,
            &format!("/sections/{}", first["id"]),
            Some(json!({"duration_ms": 2500})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, moved) = call(
            &app,
            Method::POST,
            &format!("/sections/{}/move", second["id"]),
            Some(json!({"move": -1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved[0]["id"], second["id"]);
        assert_eq!(moved[1]["duration_ms"], 2500);

        let (status, _) = call(
            &app,
            Method::PUT,
            "/sections/999",
            Some(json!({"name": "Opening", "duration_ms": 2000, "position": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn degraded_mode_returns_service_unavailable() {
        let app = router(AppState::new(AppConfig::default()));
        let (status, _) = call(&app, Method::GET, "/presentations", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (_, body) = call(&app, Method::GET, "/healthcheck", None).await;
        assert_eq!(body["status"], "degraded");
    }
}
