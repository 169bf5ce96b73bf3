//! HTTP-level integration tests for auth and the role/permission gate.
//!
//! Each test gets a fresh database from `#[sqlx::test]`, so `DATABASE_URL`
//! must point at a server where the test user may create databases.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, delete_auth, get_auth, json_request, post_json};
use keystone_api::auth::password::hash_password;
use keystone_core::messages::MessageService;
use keystone_core::roles::{ROLE_ADMIN, ROLE_USER};
use keystone_db::models::role::CreateRole;
use keystone_db::models::user::{CreateUser, User};
use keystone_db::repositories::{RoleRepo, UserRepo};
use serde_json::{json, Value};
use sqlx::PgPool;

const PASSWORD: &str = "s3cure-passphrase";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn message(key: &str) -> String {
    MessageService::new("en").get(key)
}

async fn create_user(pool: &PgPool, email: &str, role: &str) -> User {
    let role = RoleRepo::find_by_name(pool, role)
        .await
        .unwrap()
        .expect("role is seeded");
    UserRepo::create(
        pool,
        &CreateUser {
            first_name: "Test".to_string(),
            last_name: None,
            email: email.to_string(),
            mobile_number: None,
            password_hash: hash_password(PASSWORD).unwrap(),
            role_id: role.id,
        },
    )
    .await
    .expect("user creation should succeed")
}

async fn login(pool: &PgPool, email: &str, password: &str) -> (StatusCode, Value) {
    let body = json!({ "email": email, "password": password });
    let response = post_json(build_test_app(pool.clone()), "/api/v1/auth/login", body).await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn access_token(pool: &PgPool, email: &str) -> String {
    let (status, json) = login(pool, email, PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "login failed: {json}");
    json["data"]["accessToken"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Auth flow
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn signup_login_and_me(pool: PgPool) {
    let body = json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "Ada@Example.com",
        "password": PASSWORD,
    });
    let response = post_json(build_test_app(pool.clone()), "/api/v1/auth/signup", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["statusCode"], 201);
    assert_eq!(json["message"], message("auth.signup"));
    assert_eq!(json["data"]["email"], "ada@example.com");
    assert_eq!(json["data"]["role"]["name"], ROLE_USER);
    assert!(json["data"].get("passwordHash").is_none());

    let token = access_token(&pool, "ada@example.com").await;
    let response = get_auth(build_test_app(pool.clone()), "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["firstName"], "Ada");
    assert_eq!(json["data"]["permissions"], json!([]));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_signup_email_is_conflict(pool: PgPool) {
    create_user(&pool, "taken@example.com", ROLE_USER).await;

    let body = json!({ "firstName": "Dup", "email": "taken@example.com", "password": PASSWORD });
    let response = post_json(build_test_app(pool), "/api/v1/auth/signup", body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["message"], message("user.error.emailExist"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn account_locks_after_repeated_failures(pool: PgPool) {
    create_user(&pool, "locked@example.com", ROLE_USER).await;

    for _ in 0..5 {
        let (status, json) = login(&pool, "locked@example.com", "wrong-password1").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], message("auth.error.credentialsInvalid"));
    }

    let (status, json) = login(&pool, "locked@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["message"], message("auth.error.accountLocked"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn refresh_token_is_single_use(pool: PgPool) {
    create_user(&pool, "rotate@example.com", ROLE_USER).await;
    let (_, json) = login(&pool, "rotate@example.com", PASSWORD).await;
    let refresh_token = json["data"]["refreshToken"].as_str().unwrap().to_string();

    let body = json!({ "refreshToken": refresh_token });
    let app = build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/auth/refresh", body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_ne!(json["data"]["refreshToken"], body["refreshToken"]);

    let response = post_json(build_test_app(pool), "/api/v1/auth/refresh", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], message("auth.error.refreshTokenInvalid"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn change_password_requires_current_password(pool: PgPool) {
    create_user(&pool, "pw@example.com", ROLE_USER).await;
    let token = access_token(&pool, "pw@example.com").await;

    let body = json!({ "oldPassword": "not-it-123", "newPassword": "another-pass-9" });
    let response = json_request(
        build_test_app(pool.clone()),
        Method::PATCH,
        "/api/v1/auth/change-password",
        body,
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json!({ "oldPassword": PASSWORD, "newPassword": "another-pass-9" });
    let response = json_request(
        build_test_app(pool.clone()),
        Method::PATCH,
        "/api/v1/auth/change-password",
        body,
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = login(&pool, "pw@example.com", "another-pass-9").await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Authorization gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn role_without_permission_is_forbidden(pool: PgPool) {
    create_user(&pool, "plain@example.com", ROLE_USER).await;
    let token = access_token(&pool, "plain@example.com").await;

    let response = get_auth(build_test_app(pool), "/api/v1/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["message"], message("permission.error.denied"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_lists_users_with_pagination(pool: PgPool) {
    create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    create_user(&pool, "someone@example.com", ROLE_USER).await;
    let token = access_token(&pool, "admin@example.com").await;

    let response = get_auth(
        build_test_app(pool),
        "/api/v1/users?perPage=1&sort=email@asc",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], message("user.list"));
    assert_eq!(json["totalData"], 2);
    assert_eq!(json["totalPage"], 2);
    assert_eq!(json["currentPage"], 1);
    assert_eq!(json["perPage"], 1);
    assert_eq!(json["data"][0]["email"], "admin@example.com");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn inactive_role_is_forbidden(pool: PgPool) {
    let admin = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let token = access_token(&pool, "admin@example.com").await;
    RoleRepo::set_active(&pool, admin.role_id, false).await.unwrap();

    let response = get_auth(build_test_app(pool), "/api/v1/roles", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["message"], message("role.error.inactive"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn assigned_role_cannot_be_deleted(pool: PgPool) {
    create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let token = access_token(&pool, "admin@example.com").await;
    let role = RoleRepo::find_by_name(&pool, ROLE_ADMIN).await.unwrap().unwrap();

    let uri = format!("/api/v1/roles/{}", role.id);
    let response = delete_auth(build_test_app(pool.clone()), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["message"], message("role.error.inUse"));

    let spare = RoleRepo::create(
        &pool,
        &CreateRole {
            name: "spare".into(),
            permission_ids: vec![],
        },
    )
    .await
    .unwrap();
    let uri = format!("/api/v1/roles/{}", spare.id);
    let response = delete_auth(build_test_app(pool), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], Value::Null);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn role_with_unknown_permission_is_rejected(pool: PgPool) {
    create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let token = access_token(&pool, "admin@example.com").await;

    let body = json!({ "name": "Auditor", "permissionIds": [1, 999999] });
    let response = json_request(
        build_test_app(pool),
        Method::POST,
        "/api/v1/roles",
        body,
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["errors"][0]["field"], "permissionIds");
    assert_eq!(
        json["errors"][0]["message"],
        message("role.error.permissionNotFound")
    );
}
