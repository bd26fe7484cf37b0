use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::StorageConfig;
use crate::state::AppState;
use crate::{auth, dinners, meals, nutrition, subscriptions};

pub fn build_app(state: AppState) -> Router {
    let mut router = Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(meals::router())
                .merge(subscriptions::router())
                .merge(dinners::router())
                .merge(nutrition::router()),
        )
        .route("/health", get(|| async { "ok" }));

    // previews and charts written by LocalStorage are served from here
    if let StorageConfig::Local { root } = &state.config.storage {
        router = router.nest_service("/static", ServeDir::new(root));
    }

    router
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::JwtKeys;
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn bearer(state: &AppState) -> String {
        let keys = JwtKeys::from_ref(state);
        format!("Bearer {}", keys.sign_access(Uuid::new_v4(), 0).unwrap())
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_authentication() {
        let cases = [
            ("GET", "/api/v1/account"),
            ("GET", "/api/v1/account/subscriptions"),
            ("GET", "/api/v1/account/dinners?from=2024-01-01&to=2024-01-02"),
            ("POST", "/api/v1/account/dinners"),
            ("GET", "/api/v1/account/cpfc?from=2024-01-01&to=2024-01-02"),
            ("POST", "/api/v1/meals"),
            ("POST", "/api/v1/auth/logout"),
        ];
        for (method, uri) in cases {
            let app = build_app(AppState::fake());
            let resp = app
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn cpfc_with_malformed_dates_is_bad_request() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let app = build_app(state);
        let resp = app
            .oneshot(
                Request::get("/api/v1/account/cpfc?from=yesterday&to=2024-01-02")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cpfc_with_inverted_range_returns_empty_report() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let app = build_app(state);
        let resp = app
            .oneshot(
                Request::get("/api/v1/account/cpfc?from=2024-02-01&to=2024-01-01")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["from"], "2024-02-01");
        assert_eq!(v["to"], "2024-01-01");
        assert_eq!(v["days"].as_array().unwrap().len(), 0);
        assert_eq!(v["totals"]["calories"], 0.0);
        assert!(v["chart_url"]
            .as_str()
            .unwrap()
            .ends_with("2024-02-01-2024-01-01.png"));
    }

    #[tokio::test]
    async fn blank_dinner_name_is_rejected_before_lookup() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let app = build_app(state);
        let resp = app
            .oneshot(
                Request::post("/api/v1/account/dinners")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Name of meal is required");
    }

    #[tokio::test]
    async fn meal_ids_must_be_uuids() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/api/v1/meals/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recent_limit_is_bounded() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(
                Request::get("/api/v1/meals/recent?limit=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
