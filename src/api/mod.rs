//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for Coursechat:
//! - Session endpoints (register, login, renew, logout)
//! - Course and post endpoints
//! - User profile and enrollment endpoints

pub mod auth;
pub mod courses;
pub mod middleware;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a valid session token)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(courses::protected_router())
        .merge(users::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(auth::public_router())
        .merge(courses::public_router())
        .merge(users::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let allow_origin = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin, cross-origin requests disabled");
            AllowOrigin::list(std::iter::empty())
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    build_api_router(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{create_test_pool, migrations};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let mut config = Config::default();
        config.auth.admin_netid = Some("admin1".to_string());
        config.auth.password.memory_kib = 1024;
        config.auth.password.iterations = 1;
        config.auth.password.parallelism = 1;

        let state = AppState::new(pool, &config).expect("Failed to build state");
        build_router(state, &config.server.cors_origin)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(app: &Router, netid: &str) -> Value {
        let (status, body) = send(
            app,
            "POST",
            "/api/register/",
            None,
            Some(json!({
                "netid": netid,
                "password": "hunter2",
                "name": "Ada",
                "college": "Engineering",
                "major": "CS",
                "class_year": "2026",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body
    }

    async fn create_course(app: &Router) -> i64 {
        let (status, body) = send(
            app,
            "POST",
            "/api/courses/",
            None,
            Some(json!({"code": "CS 1110", "name": "Intro"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    fn token<'a>(body: &'a Value, field: &str) -> &'a str {
        body[field].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = test_app().await;

        let tokens = register(&app, "abc123").await;
        assert_eq!(token(&tokens, "session_token").len(), 64);
        assert_ne!(token(&tokens, "session_token"), token(&tokens, "update_token"));
        assert!(tokens["session_expiration"].is_string());

        // Renew with the update token rotates both tokens
        let (status, renewed) =
            send(&app, "POST", "/session/", Some(token(&tokens, "update_token")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(token(&renewed, "session_token"), token(&tokens, "session_token"));
        assert_ne!(token(&renewed, "update_token"), token(&tokens, "update_token"));

        // The old session token no longer authenticates
        let (status, _) =
            send(&app, "POST", "/logout/", Some(token(&tokens, "session_token")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Old update token cannot be replayed
        let (status, _) =
            send(&app, "POST", "/session/", Some(token(&tokens, "update_token")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&app, "POST", "/logout/", Some(token(&renewed, "session_token")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "You have successfully logged out");

        let (status, _) =
            send(&app, "POST", "/logout/", Some(token(&renewed, "session_token")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_after_logout_mints_new_pair() {
        let app = test_app().await;
        let tokens = register(&app, "abc123").await;

        let login = json!({"netid": "abc123", "password": "hunter2"});
        let (status, same) = send(&app, "POST", "/login/", None, Some(login.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(same["session_token"], tokens["session_token"]);

        send(&app, "POST", "/logout/", Some(token(&tokens, "session_token")), None).await;

        let (status, fresh) = send(&app, "POST", "/login/", None, Some(login)).await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(fresh["session_token"], tokens["session_token"]);
        assert_eq!(token(&fresh, "session_token").len(), 64);
    }

    #[tokio::test]
    async fn test_register_errors() {
        let app = test_app().await;
        register(&app, "abc123").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/register/",
            None,
            Some(json!({
                "netid": "abc123",
                "password": "other",
                "name": "Bob",
                "college": "Arts",
                "major": "History",
                "class_year": "2025",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        let (status, body) = send(
            &app,
            "POST",
            "/api/register/",
            None,
            Some(json!({"netid": "xyz9", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_login_failures_are_unauthorized() {
        let app = test_app().await;
        register(&app, "abc123").await;

        let (status, wrong) = send(
            &app,
            "POST",
            "/login/",
            None,
            Some(json!({"netid": "abc123", "password": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, unknown) = send(
            &app,
            "POST",
            "/login/",
            None,
            Some(json!({"netid": "nobody", "password": "hunter2"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);

        let (status, _) =
            send(&app, "POST", "/login/", None, Some(json!({"netid": "abc123"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_bearer() {
        let app = test_app().await;

        let (status, missing) = send(&app, "POST", "/logout/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method("POST")
            .uri("/logout/")
            .header(header::AUTHORIZATION, "Bearer   ")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (status, unknown) = send(&app, "POST", "/logout/", Some("deadbeef"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing, unknown);

        let (status, _) = send(&app, "POST", "/session/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_course_and_post_routes() {
        let app = test_app().await;

        let (status, body) = send(&app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"courses": []}));

        let course_id = create_course(&app).await;

        let (status, body) = send(&app, "GET", "/api/courses/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["courses"][0]["code"], "CS 1110");

        let (status, post) = send(
            &app,
            "POST",
            &format!("/api/courses/{}/post/", course_id),
            None,
            Some(json!({"comment": "Welcome"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let post_id = post["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/courses/{}/post/{}/", course_id, post_id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comment"], "Welcome");

        let (status, detail) =
            send(&app, "GET", &format!("/api/courses/{}/", course_id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["posts"].as_array().unwrap().len(), 1);
        assert_eq!(detail["students"], json!([]));

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/courses/{}/post/{}/", course_id, post_id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, deleted) =
            send(&app, "DELETE", &format!("/api/courses/{}/", course_id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["id"], course_id);

        let (status, body) =
            send(&app, "GET", &format!("/api/courses/{}/", course_id), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_bad_json_body_uses_error_shape() {
        let app = test_app().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/courses/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let request = Request::builder()
            .method("POST")
            .uri("/login/")
            .body(Body::from(r#"{"netid":"abc123","password":"pw"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_course_validation() {
        let app = test_app().await;
        let (status, _) =
            send(&app, "POST", "/api/courses/", None, Some(json!({"code": "CS 1110"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_enroll_and_ban() {
        let app = test_app().await;
        let admin = register(&app, "admin1").await;
        let student = register(&app, "stu1").await;
        let course_id = create_course(&app).await;
        let student_token = token(&student, "session_token");
        let admin_token = token(&admin, "session_token");

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/user/{}/add/", course_id),
            Some(student_token),
            Some(json!({"type": "instructor"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Did not choose between student or ta");

        let (status, detail) = send(
            &app,
            "POST",
            &format!("/api/user/{}/add/", course_id),
            Some(student_token),
            Some(json!({"type": "student"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let student_id = detail["students"][0]["id"].as_i64().unwrap();

        // Only the administrator may ban
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/courses/{}/ban/", course_id),
            Some(student_token),
            Some(json!({"user_id": student_id})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, detail) = send(
            &app,
            "POST",
            &format!("/api/courses/{}/ban/", course_id),
            Some(admin_token),
            Some(json!({"user_id": student_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["students"], json!([]));
        assert_eq!(detail["banned"][0]["id"], student_id);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/user/{}/add/", course_id),
            Some(student_token),
            Some(json!({"type": "ta"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, profile) =
            send(&app, "GET", &format!("/api/user/{}/", student_id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["netid"], "stu1");
        assert_eq!(profile["courses"][0]["id"], course_id);
    }

    #[tokio::test]
    async fn test_edit_profile() {
        let app = test_app().await;
        let tokens = register(&app, "abc123").await;
        let session = token(&tokens, "session_token");

        let (status, _) = send(
            &app,
            "POST",
            "/api/user/edit/",
            None,
            Some(json!({"major": "Math"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            "POST",
            "/api/user/edit/",
            Some(session),
            Some(json!({"major": "Math"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());

        let (status, _) = send(
            &app,
            "POST",
            "/api/user/edit/",
            Some(session),
            Some(json!({"name": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, login) = send(
            &app,
            "POST",
            "/login/",
            None,
            Some(json!({"netid": "abc123", "password": "hunter2"})),
        )
        .await;
        assert_eq!(login["session_token"], tokens["session_token"]);
    }
}
