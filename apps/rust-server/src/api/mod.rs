// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{authorize, Permission, PolicyTable, Role, RoutePolicy},
    state::AppState,
    storage::{AdminGrantRecord, RoleRecord},
};

pub mod admins;
pub mod auth;
pub mod health;
pub mod roles;
pub mod users;

const ADMINS: &[Role] = &[Role::Admin, Role::SuperAdmin];
const SUPERADMIN: &[Role] = &[Role::SuperAdmin];
const USER_MANAGEMENT: &[Permission] = &[Permission::User];

/// Who may call what. Routes not declared here are public.
pub fn policy_table() -> PolicyTable {
    let any_account = RoutePolicy::account();
    let user_managers = any_account.roles(ADMINS).permissions(USER_MANAGEMENT);
    let role_readers = any_account.roles(ADMINS);
    let role_writers = any_account.roles(SUPERADMIN);
    let grant_managers = any_account.roles(SUPERADMIN).permissions(USER_MANAGEMENT);

    PolicyTable::new()
        .declare(Method::POST, "/v1/auth/sync", RoutePolicy::token())
        // Own account
        .declare(Method::GET, "/v1/users/me", any_account)
        .declare(Method::PATCH, "/v1/users/me", any_account)
        // Account management
        .declare(Method::GET, "/v1/users", user_managers)
        .declare(Method::POST, "/v1/users", user_managers)
        .declare(Method::GET, "/v1/users/{id}", user_managers)
        .declare(Method::PATCH, "/v1/users/{id}", user_managers)
        .declare(Method::DELETE, "/v1/users/{id}", user_managers)
        .declare(Method::POST, "/v1/users/{id}/reactivate", user_managers)
        // Roles
        .declare(Method::GET, "/v1/roles", role_readers)
        .declare(Method::GET, "/v1/roles/{id}", role_readers)
        .declare(Method::POST, "/v1/roles", role_writers)
        .declare(Method::PATCH, "/v1/roles/{id}", role_writers)
        .declare(Method::DELETE, "/v1/roles/{id}", role_writers)
        // Admin grants
        .declare(Method::GET, "/v1/admins", grant_managers)
        .declare(Method::POST, "/v1/admins", grant_managers)
        .declare(Method::GET, "/v1/admins/{account_id}", grant_managers)
        .declare(Method::PATCH, "/v1/admins/{account_id}", grant_managers)
        .declare(Method::DELETE, "/v1/admins/{account_id}", grant_managers)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/v1/auth/sync", post(auth::sync_login))
        .route("/v1/users/me", get(users::get_me).patch(users::update_me))
        .route(
            "/v1/users",
            get(users::list_accounts).post(users::create_account),
        )
        .route(
            "/v1/users/{id}",
            get(users::get_account)
                .patch(users::update_account)
                .delete(users::delete_account),
        )
        .route(
            "/v1/users/{id}/reactivate",
            post(users::reactivate_account),
        )
        .route("/v1/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/v1/roles/{id}",
            get(roles::get_role)
                .patch(roles::rename_role)
                .delete(roles::delete_role),
        )
        .route(
            "/v1/admins",
            get(admins::list_grants).post(admins::create_grant),
        )
        .route(
            "/v1/admins/{account_id}",
            get(admins::get_grant)
                .patch(admins::update_grant)
                .delete(admins::delete_grant),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::sync_login,
        users::get_me,
        users::update_me,
        users::list_accounts,
        users::create_account,
        users::get_account,
        users::update_account,
        users::delete_account,
        users::reactivate_account,
        roles::list_roles,
        roles::get_role,
        roles::create_role,
        roles::rename_role,
        roles::delete_role,
        admins::list_grants,
        admins::create_grant,
        admins::get_grant,
        admins::update_grant,
        admins::delete_grant
    ),
    components(
        schemas(
            RoleRecord,
            AdminGrantRecord,
            users::AccountResponse,
            users::AccountListResponse,
            users::CreateAccountRequest,
            users::UpdateAccountRequest,
            users::UpdateProfileRequest,
            roles::RoleNameRequest,
            roles::RoleListResponse,
            roles::DeleteRoleResponse,
            admins::CreateGrantRequest,
            admins::UpdateGrantRequest,
            admins::GrantListResponse,
            health::ReadyResponse,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Login synchronisation"),
        (name = "Users", description = "Account lifecycle"),
        (name = "Roles", description = "Role management"),
        (name = "Admins", description = "Admin permission grants")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestContext;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Request, StatusCode,
        },
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(bearer) = bearer {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn superadmin(ctx: &TestContext) -> String {
        ctx.seed_account("auth0|root", "root@x.com", Role::SuperAdmin);
        ctx.grant("auth0|root", true, true, true);
        ctx.bearer("auth0|root")
    }

    #[test]
    fn every_routed_path_is_declared_or_public() {
        let table = policy_table();
        assert_eq!(table.len(), 19);
        assert!(table.lookup(&Method::GET, "/health").is_none());
        assert!(table.lookup(&Method::GET, "/v1/users/{id}").is_some());
    }

    #[tokio::test]
    async fn health_routes_are_public() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());

        let (status, body) = send(&app, Method::GET, "/health/live", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(&app, Method::GET, "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["store"], "ok");
        assert_eq!(body["checks"]["jwks"], "ok");
    }

    #[tokio::test]
    async fn readiness_fails_before_store_is_ready() {
        let ctx = TestContext::new();
        let mut state = ctx.state.clone();
        state.readiness = crate::accounts::Readiness::new();
        let app = router(state);

        let (status, body) = send(&app, Method::GET, "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["checks"]["store"], "starting");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());

        let (status, body) = send(&app, Method::GET, "/api-doc/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/v1/users/{id}"].is_object());
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthenticated() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());

        let (status, body) = send(&app, Method::GET, "/v1/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Unauthenticated", "error_code": "unauthenticated"}));

        let (status, _) = send(&app, Method::GET, "/v1/users/me", Some("Bearer junk"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sync_provisions_then_returns_existing_account() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());
        let bearer = ctx.bearer("auth0|reader");

        let (status, _) = send(&app, Method::GET, "/v1/users/me", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, Method::POST, "/v1/auth/sync", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], "auth0|reader");
        assert_eq!(body["role"]["name"], "registered");

        let (status, _) = send(&app, Method::POST, "/v1/auth/sync", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Method::GET, "/v1/users/me", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "auth0-reader@example.com");
    }

    #[tokio::test]
    async fn registered_account_cannot_manage_users() {
        let ctx = TestContext::new();
        ctx.seed_account("auth0|reader", "reader@x.com", Role::Registered);
        let app = router(ctx.state.clone());

        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/users",
            Some(&ctx.bearer("auth0|reader")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "role_not_allowed");
    }

    #[tokio::test]
    async fn admin_grant_flags_gate_routes() {
        let ctx = TestContext::new();
        ctx.seed_account("auth0|mod", "mod@x.com", Role::Admin);
        ctx.grant("auth0|mod", true, false, true);
        let bearer = ctx.bearer("auth0|mod");
        let app = router(ctx.state.clone());

        let (status, body) = send(&app, Method::GET, "/v1/users", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "insufficient_permissions");

        let (status, _) = send(&app, Method::GET, "/v1/roles", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/roles",
            Some(&bearer),
            Some(json!({"name": "editor"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn account_lifecycle_over_http() {
        let ctx = TestContext::new();
        let admin = superadmin(&ctx);
        let app = router(ctx.state.clone());
        let reader = ctx.bearer("ext|123");

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/users",
            Some(&admin),
            Some(json!({"id": "ext|123", "name": "Reader", "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"]["name"], "registered");

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/users",
            Some(&admin),
            Some(json!({"id": "ext|999", "name": "Other", "email": "A@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::GET, "/v1/users/me", Some(&reader), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::DELETE, "/v1/users/ext%7C123", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::DELETE, "/v1/users/ext%7C123", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::GET, "/v1/users/me", Some(&reader), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthenticated");

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/users/ext%7C123/reactivate",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"]["name"], "registered");

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/users/ext%7C123/reactivate",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/v1/users/me", Some(&reader), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_cannot_change_email() {
        let ctx = TestContext::new();
        let admin = superadmin(&ctx);
        let app = router(ctx.state.clone());

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/v1/users/auth0%7Croot",
            Some(&admin),
            Some(json!({"email": "new@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/v1/users/auth0%7Croot",
            Some(&admin),
            Some(json!({"name": "Root"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Root");
        assert_eq!(body["email"], "root@x.com");
    }

    #[tokio::test]
    async fn protected_role_deletion_is_bad_request() {
        let ctx = TestContext::new();
        let admin = superadmin(&ctx);
        let app = router(ctx.state.clone());

        let (_, body) = send(&app, Method::GET, "/v1/roles", Some(&admin), None).await;
        let registered_id = body["roles"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["name"] == "registered")
            .unwrap()["id"]
            .as_u64()
            .unwrap();

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/v1/roles/{registered_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = send(
            &app,
            Method::POST,
            "/v1/roles",
            Some(&admin),
            Some(json!({"name": "editor"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/v1/roles/{}", created["id"]),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reassigned_accounts"], 0);
    }

    #[tokio::test]
    async fn grant_management_requires_active_account() {
        let ctx = TestContext::new();
        let admin = superadmin(&ctx);
        ctx.seed_account("auth0|editor", "editor@x.com", Role::Admin);
        let app = router(ctx.state.clone());

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/admins",
            Some(&admin),
            Some(json!({"account_id": "auth0|ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/admins",
            Some(&admin),
            Some(json!({"account_id": "auth0|editor", "can_manage_users": false})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["can_manage_content"], true);
        assert_eq!(body["can_manage_users"], false);

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/admins",
            Some(&admin),
            Some(json!({"account_id": "auth0|editor"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::DELETE, "/v1/users/auth0%7Ceditor", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, "/v1/admins/auth0%7Ceditor", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
