use axum::http::{Method, StatusCode};
use serde_json::json;
use serial_test::serial;
use tower::ServiceExt;

use crate::common::{test_app, ApiTestHelpers, MockDataGenerator, TestDatabase};
use tsness::auth::UserRole;
use tsness::services::UserService;

#[cfg(test)]
mod auth_integration_tests {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_signin_then_fetch_profile() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let users = UserService::new(db.pool.clone());
        let request = MockDataGenerator::create_user_request();
        let username = request.username.clone();
        users.create_user(request, UserRole::Client).await.unwrap();

        let response = test_app(db.pool.clone())
            .oneshot(ApiTestHelpers::request(
                Method::POST,
                "/api/auth/signin",
                None,
                Some(json!({ "username": username, "password": "password123" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = ApiTestHelpers::body_json(response).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["token_type"], "Bearer");
        assert_eq!(body["data"]["user"]["role"], "client");
        assert!(body["data"]["user"].get("password_hash").is_none());

        let response = test_app(db.pool.clone())
            .oneshot(ApiTestHelpers::request(
                Method::GET,
                "/api/profile",
                Some(&format!("Bearer {}", token)),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = ApiTestHelpers::body_json(response).await;
        assert_eq!(body["data"]["user"]["username"], username.as_str());
        assert_eq!(body["data"]["theme"]["slug"], "default");
        assert_eq!(body["data"]["stats"]["total_badges"], 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_signin_rejects_bad_credentials() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let users = UserService::new(db.pool.clone());
        let request = MockDataGenerator::create_user_request();
        let username = request.username.clone();
        users.create_user(request, UserRole::Client).await.unwrap();

        for (username, password) in [(username.as_str(), "wrong-password"), ("nobody_here", "password123")] {
            let response = test_app(db.pool.clone())
                .oneshot(ApiTestHelpers::request(
                    Method::POST,
                    "/api/auth/signin",
                    None,
                    Some(json!({ "username": username, "password": password })),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_deactivated_user_token_stops_working() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let users = UserService::new(db.pool.clone());
        let admin = users
            .create_user(MockDataGenerator::create_user_request(), UserRole::SuperAdmin)
            .await
            .unwrap();
        let client = users
            .create_user(MockDataGenerator::create_user_request(), UserRole::Client)
            .await
            .unwrap();
        let auth = ApiTestHelpers::bearer(client.id, &client.username, client.role);

        users.set_active(admin.id, client.id, false).await.unwrap();

        let response = test_app(db.pool.clone())
            .oneshot(ApiTestHelpers::request(Method::GET, "/api/profile", Some(&auth), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_admin_routes_are_role_gated() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let users = UserService::new(db.pool.clone());
        let admin = users
            .create_user(MockDataGenerator::create_user_request(), UserRole::SuperAdmin)
            .await
            .unwrap();
        let client = users
            .create_user(MockDataGenerator::create_user_request(), UserRole::Client)
            .await
            .unwrap();

        let client_auth = ApiTestHelpers::bearer(client.id, &client.username, client.role);
        let response = test_app(db.pool.clone())
            .oneshot(ApiTestHelpers::request(Method::GET, "/api/users", Some(&client_auth), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin_auth = ApiTestHelpers::bearer(admin.id, &admin.username, admin.role);
        let new_owner = MockDataGenerator::create_user_request();
        let response = test_app(db.pool.clone())
            .oneshot(ApiTestHelpers::request(
                Method::POST,
                "/api/users/create-gym-owner",
                Some(&admin_auth),
                Some(json!({
                    "username": new_owner.username,
                    "email": new_owner.email,
                    "password": new_owner.password,
                    "first_name": new_owner.first_name,
                    "last_name": new_owner.last_name,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = ApiTestHelpers::body_json(response).await;
        assert_eq!(body["data"]["role"], "gym_owner");
    }
}
