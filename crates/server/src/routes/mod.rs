use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod auth;
mod bot;
mod guard;
mod health;
mod mentor;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Mentor-only routes; the auth layer below wraps this one
    let mentor_routes = Router::new()
        .route("/mentor/students", get(mentor::students))
        .route_layer(middleware::from_fn(guard::require_mentor));

    let protected = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/bot/ask", post(bot::ask))
        .merge(mentor_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_auth,
        ));

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(protected)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        answer::testing::{Reply, StubAnswers},
        chat::SummaryQueue,
        config::Config,
        db::Database,
    };
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        db: Database,
    }

    async fn test_app(reply: Reply) -> TestApp {
        let db = Database::in_memory().await.unwrap();
        let (summaries, _jobs) = SummaryQueue::channel();
        let state = AppState::with_summaries(
            db.clone(),
            &Config::default(),
            Arc::new(StubAnswers::new(reply)),
            summaries,
        );
        TestApp {
            router: create_router(state),
            db,
        }
    }

    impl TestApp {
        async fn send(
            &self,
            method: Method,
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

            let response = self.router.clone().oneshot(request).await.unwrap();
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

        async fn register(&self, body: Value) -> (StatusCode, Value) {
            self.send(Method::POST, "/register", None, Some(body)).await
        }

        async fn login(&self, email: &str) -> String {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/login",
                    None,
                    Some(json!({ "email": email, "password": "secret1" })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            body["token"]["token"].as_str().unwrap().to_string()
        }
    }

    fn student(email: &str, school: &str) -> Value {
        json!({
            "email": email,
            "password": "secret1",
            "role": "student",
            "fullName": "Zani Park",
            "grade": "8",
            "className": "8A",
            "school": school,
        })
    }

    fn mentor(email: &str, school: &str) -> Value {
        json!({
            "email": email,
            "password": "secret1",
            "role": "mentor",
            "fullName": "Sarah Wilson",
            "department": "Math",
            "experience": 5,
            "school": school,
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(Reply::Answer("x".into())).await;
        let (status, body) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_register_returns_created_user_without_password() {
        let app = test_app(Reply::Answer("x".into())).await;
        let (status, body) = app.register(student("zani@test.io", "S")).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "zani@test.io");
        assert_eq!(body["user"]["role"], "student");
        assert_eq!(body["user"]["fullName"], "Zani Park");
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn test_register_errors() {
        let app = test_app(Reply::Answer("x".into())).await;
        app.register(student("zani@test.io", "S")).await;

        let (status, body) = app.register(mentor("zani@test.io", "S")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already registered");

        let (status, _) = app
            .register(json!({ "email": "bad", "password": "1", "role": "admin" }))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(app.db.count_rows("users", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_bodies_get_json_errors() {
        let app = test_app(Reply::Answer("x".into())).await;

        let (status, body) = app
            .register(json!({ "email": "a@b.io", "password": "secret1" }))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().contains("missing fields"));
        assert!(!body.to_string().contains("line 1"));

        let (status, body) = app
            .register(json!({
                "email": "a@b.io",
                "password": "secret1",
                "role": "mentor",
                "experience": "5",
            }))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].is_string());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Request body is not valid JSON");

        assert_eq!(app.db.count_rows("users", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ask_without_question_field_is_json_422() {
        let app = test_app(Reply::Answer("x".into())).await;
        app.register(student("zani@test.io", "S")).await;
        let token = app.login("zani@test.io").await;

        let (status, body) = app
            .send(Method::POST, "/bot/ask", Some(&token), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].is_string());
        assert_eq!(app.db.count_rows("student_chats", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_login_then_me_is_idempotent() {
        let app = test_app(Reply::Answer("x".into())).await;
        app.register(student("zani@test.io", "S")).await;
        let token = app.login("zani@test.io").await;

        let (status, first) = app.send(Method::GET, "/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["user"]["email"], "zani@test.io");

        let (_, second) = app.send(Method::GET, "/me", Some(&token), None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = test_app(Reply::Answer("x".into())).await;
        app.register(student("zani@test.io", "S")).await;

        let (status, body) = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({ "email": "zani@test.io", "password": "not-it-at-all" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());
        assert_eq!(app.db.count_rows("access_tokens", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_token() {
        let app = test_app(Reply::Answer("x".into())).await;
        for (method, uri) in [
            (Method::GET, "/me"),
            (Method::POST, "/logout"),
            (Method::GET, "/mentor/students"),
        ] {
            let (status, _) = app.send(method, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        }

        let (status, _) = app
            .send(
                Method::POST,
                "/bot/ask",
                Some("oat_1.not-a-real-token"),
                Some(json!({ "question": "hi" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_only_revokes_the_used_token() {
        let app = test_app(Reply::Answer("x".into())).await;
        app.register(student("zani@test.io", "S")).await;
        let first = app.login("zani@test.io").await;
        let second = app.login("zani@test.io").await;

        let (status, body) = app.send(Method::POST, "/logout", Some(&first), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");

        let (status, _) = app.send(Method::POST, "/logout", Some(&first), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.send(Method::GET, "/me", Some(&second), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_roster_is_mentor_only_and_school_scoped() {
        let app = test_app(Reply::Answer("x".into())).await;
        app.register(student("zani@test.io", "S")).await;
        app.register(student("lira@test.io", "S")).await;
        app.register(student("kai@test.io", "T")).await;
        app.register(mentor("sarah@test.io", "S")).await;

        let student_token = app.login("zani@test.io").await;
        let (status, _) = app
            .send(Method::GET, "/mentor/students", Some(&student_token), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let mentor_token = app.login("sarah@test.io").await;
        let (status, body) = app
            .send(Method::GET, "/mentor/students", Some(&mentor_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let students = body["students"].as_array().unwrap();
        assert_eq!(students.len(), 2);
        assert!(students.iter().all(|s| s["grade"] == "8"));
    }

    #[tokio::test]
    async fn test_ask_returns_answer_and_records_chat() {
        let app = test_app(Reply::Answer("A controller is the robot's brain.".into())).await;
        app.register(student("zani@test.io", "S")).await;
        let token = app.login("zani@test.io").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/bot/ask",
                Some(&token),
                Some(json!({ "question": "What is a controller?" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "A controller is the robot's brain.");
        assert_eq!(app.db.count_rows("student_chats", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ask_with_service_down_is_503_fallback() {
        let app = test_app(Reply::Unavailable).await;
        app.register(student("zani@test.io", "S")).await;
        let token = app.login("zani@test.io").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/bot/ask",
                Some(&token),
                Some(json!({ "question": "What is a controller?" })),
            )
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["answer"], crate::error::UNAVAILABLE_ANSWER);
        assert_eq!(app.db.count_rows("student_chats", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ask_with_service_error_is_500_fallback() {
        let app = test_app(Reply::Upstream).await;
        app.register(mentor("sarah@test.io", "S")).await;
        let token = app.login("sarah@test.io").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/bot/ask",
                Some(&token),
                Some(json!({ "question": "How is everyone?" })),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["answer"], crate::error::INTERNAL_ANSWER);
        assert!(!body.to_string().contains("status 500"));
    }

    #[tokio::test]
    async fn test_blank_question_is_unprocessable() {
        let app = test_app(Reply::Answer("x".into())).await;
        app.register(student("zani@test.io", "S")).await;
        let token = app.login("zani@test.io").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/bot/ask",
                Some(&token),
                Some(json!({ "question": "  " })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
