use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::{lazy_pool, test_app, ApiTestHelpers};
use tsness::auth::{JwtService, UserRole};

#[cfg(test)]
mod api_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_endpoint() {
        let app = test_app(lazy_pool());

        let response = app
            .oneshot(ApiTestHelpers::request(Method::GET, "/health", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );

        let body = ApiTestHelpers::body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "tsness");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        for uri in [
            "/api/challenges",
            "/api/users",
            "/api/profile",
            "/api/badges/user/my-badges",
            "/api/themes/my-theme",
        ] {
            let response = test_app(lazy_pool())
                .oneshot(ApiTestHelpers::request(Method::GET, uri, None, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_malformed_authorization_header_is_rejected() {
        let response = test_app(lazy_pool())
            .oneshot(ApiTestHelpers::request(
                Method::GET,
                "/api/challenges",
                Some("Basic dXNlcjpwYXNz"),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let token = JwtService::new("some-other-secret")
            .create_token(Uuid::new_v4(), "intruder", UserRole::SuperAdmin)
            .unwrap();

        let response = test_app(lazy_pool())
            .oneshot(ApiTestHelpers::request(
                Method::GET,
                "/api/users",
                Some(&format!("Bearer {}", token)),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verify_token_returns_claims() {
        let user_id = Uuid::new_v4();
        let auth = ApiTestHelpers::bearer(user_id, "client1", UserRole::Client);

        let response = test_app(lazy_pool())
            .oneshot(ApiTestHelpers::request(
                Method::GET,
                "/api/auth/verify-token",
                Some(&auth),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = ApiTestHelpers::body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["sub"], user_id.to_string());
        assert_eq!(body["data"]["role"], "client");
    }

    #[tokio::test]
    async fn test_signin_validates_before_lookup() {
        let response = test_app(lazy_pool())
            .oneshot(ApiTestHelpers::request(
                Method::POST,
                "/api/auth/signin",
                None,
                Some(json!({ "username": "", "password": "" })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = ApiTestHelpers::body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_signin_with_missing_fields_is_bad_request() {
        let response = test_app(lazy_pool())
            .oneshot(ApiTestHelpers::request(
                Method::POST,
                "/api/auth/signin",
                None,
                Some(json!({ "username": "client1" })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_room_management_paths_are_routed() {
        let auth = ApiTestHelpers::bearer(Uuid::new_v4(), "client1", UserRole::Client);
        let room_id = Uuid::new_v4();

        for (path, body) in [
            ("set-difficulty", json!({ "difficulty_level": "advanced" })),
            ("change-owner", json!({ "gym_id": Uuid::new_v4() })),
        ] {
            let uri = format!("/api/training-rooms/{}/{}", room_id, path);
            let response = test_app(lazy_pool())
                .oneshot(ApiTestHelpers::request(Method::PATCH, &uri, Some(&auth), Some(body)))
                .await
                .unwrap();
            // Routed, then refused by the role layer.
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_progress_accepts_patch() {
        let auth = ApiTestHelpers::bearer(Uuid::new_v4(), "owner1", UserRole::GymOwner);
        let uri = format!("/api/challenges/{}/progress", Uuid::new_v4());

        let response = test_app(lazy_pool())
            .oneshot(ApiTestHelpers::request(
                Method::PATCH,
                &uri,
                Some(&auth),
                Some(json!({ "progress": 10.0, "calories_burned": 50.0 })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invitations_of_another_user_are_forbidden() {
        let auth = ApiTestHelpers::bearer(Uuid::new_v4(), "client1", UserRole::Client);
        let uri = format!("/api/challenges/invitations/{}", Uuid::new_v4());

        let response = test_app(lazy_pool())
            .oneshot(ApiTestHelpers::request(Method::GET, &uri, Some(&auth), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
