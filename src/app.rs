use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::users;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(users::router())
                .route("/health", get(|| async { "ok" })),
        )
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
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::storage::fake::FakeStorage;
    use crate::users::repo::memory::InMemoryUserRepo;

    const BOUNDARY: &str = "X-VIDTUBE-BOUNDARY";

    fn app() -> (Router, InMemoryUserRepo, Arc<FakeStorage>) {
        let repo = InMemoryUserRepo::default();
        let storage = Arc::new(FakeStorage::default());
        let state = AppState::for_tests(Arc::new(repo.clone()), storage.clone());
        (build_app(state), repo, storage)
    }

    fn json_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(texts: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in texts {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, content_type, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/users/register")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn read_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _, _) = app();
        let resp = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn json_registration_returns_created_envelope() {
        let (app, repo, _) = app();
        let resp = app
            .oneshot(json_request(serde_json::json!({
                "username": "Alice",
                "email": "Alice@Example.com",
                "fullName": "Alice Doe",
                "password": "correct horse",
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = read_json(resp).await;
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "User registered Successfully");
        let data = body["data"].as_object().unwrap();
        assert_eq!(data["username"], "alice");
        assert_eq!(data["email"], "alice@example.com");
        assert!(!data.contains_key("password"));
        assert!(!data.contains_key("passwordHash"));
        assert!(!data.contains_key("refreshToken"));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let (app, repo, _) = app();
        let resp = app
            .oneshot(json_request(serde_json::json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "pw",
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = read_json(resp).await;
        assert_eq!(body["message"], "All fields are required");
        assert_eq!(body["success"], false);
        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (app, _, _) = app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/users/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_is_conflict() {
        let (app, repo, _) = app();
        let body = serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "fullName": "Alice",
            "password": "pw",
        });
        let first = app.clone().oneshot(json_request(body)).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(json_request(serde_json::json!({
                "username": "someone",
                "email": "ALICE@example.com",
                "fullName": "Someone",
                "password": "pw",
            })))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(read_json(second).await["statusCode"], 409);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn multipart_registration_uploads_files() {
        let (app, repo, storage) = app();
        let req = multipart_request(
            &[
                ("username", "bob"),
                ("email", "bob@example.com"),
                ("fullName", "Bob Builder"),
                ("password", "can-we-fix-it"),
            ],
            &[
                ("avatar", "image/png", &b"\x89PNG\r\n"[..]),
                ("coverImage", "image/webp", &b"RIFF0000WEBP"[..]),
            ],
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = read_json(resp).await;
        let avatar = body["data"]["avatar"].as_str().unwrap();
        let cover = body["data"]["coverImage"].as_str().unwrap();
        assert!(avatar.starts_with("https://fake.local/users/avatars/") && avatar.ends_with(".png"));
        assert!(cover.starts_with("https://fake.local/users/covers/") && cover.ends_with(".webp"));
        assert_eq!(storage.stored.lock().unwrap().len(), 2);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn empty_file_part_is_ignored() {
        let (app, _, storage) = app();
        let req = multipart_request(
            &[
                ("username", "carol"),
                ("email", "carol@example.com"),
                ("fullName", "Carol"),
                ("password", "pw"),
            ],
            &[("avatar", "application/octet-stream", &b""[..])],
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(read_json(resp).await["data"]["avatar"], "");
        assert!(storage.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_avatar_upload_is_bad_request() {
        let repo = InMemoryUserRepo::default();
        let storage = Arc::new(FakeStorage::failing(&["users/avatars"]));
        let app = build_app(AppState::for_tests(Arc::new(repo.clone()), storage));
        let req = multipart_request(
            &[
                ("username", "dan"),
                ("email", "dan@example.com"),
                ("fullName", "Dan"),
                ("password", "pw"),
            ],
            &[("avatar", "image/jpeg", &b"\xff\xd8\xff"[..])],
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(resp).await["message"], "Avatar file upload failed");
        assert_eq!(repo.len().await, 0);
    }
}
