use axum::{routing::get, Router};

use appointment_cell::router::{appointment_routes, AppointmentState};

pub fn create_router(state: AppointmentState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic appointment API is running!" }))
        .nest("/api/appointments", appointment_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use appointment_cell::services::InMemoryAppointmentStore;
    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn app() -> (Router, String) {
        let config = TestConfig::default();
        let secret = config.jwt_secret.clone();
        let state = AppointmentState::new(config.to_arc(), Arc::new(InMemoryAppointmentStore::new()));
        (create_router(state), secret)
    }

    #[tokio::test]
    async fn test_root_is_public() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_appointments_are_nested_and_protected() {
        let (app, secret) = app();

        let anonymous = app
            .clone()
            .oneshot(Request::builder().uri("/api/appointments").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let patient = TestUser::patient("p@example.com");
        let token = JwtTestUtils::create_test_token(&patient, &secret, Some(1));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/appointments")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let list: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(list, serde_json::json!([]));
    }
}
