//! Admin API: authentication, inspection and runtime lifecycle changes.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use version_router::admin::handlers::{GroupStatus, RouteStatus, SystemStatus, VersionStatus};
use version_router::dispatch::{DEPRECATION, X_API_VERSION};

mod common;
use common::{health_config, send, server, versions, ADMIN_KEY};

async fn admin(router: &Router, method: Method, path: &str, body: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY));
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let server = server(health_config(None, Vec::new()));
    let router = server.admin_router();

    let response = router
        .clone()
        .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(
            Request::get("/admin/status")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_versions_and_routes() {
    let server = server(health_config(Some("1.0.0"), versions(&["1.0.0", "2.0.0"])));
    let router = server.admin_router();

    let status: SystemStatus = json(admin(&router, Method::GET, "/admin/status", None).await).await;
    assert_eq!(status.status, "operational");
    assert_eq!(status.generation, 0);
    assert_eq!(status.bindings, 3);

    let groups: Vec<GroupStatus> =
        json(admin(&router, Method::GET, "/admin/versions", None).await).await;
    let health = groups.iter().find(|g| g.group == "health").unwrap();
    assert_eq!(health.default.as_ref().map(ToString::to_string).as_deref(), Some("1.0.0"));
    assert_eq!(health.latest.as_ref().map(ToString::to_string).as_deref(), Some("2.0.0"));
    assert_eq!(health.versions.len(), 2);

    let routes: Vec<RouteStatus> =
        json(admin(&router, Method::GET, "/admin/routes", None).await).await;
    assert_eq!(routes.len(), 3);
    assert!(routes.iter().any(|r| r.path == "/health/{component}" && r.method == "GET"));
}

#[tokio::test]
async fn test_deprecate_then_undeprecate() {
    let server = server(health_config(Some("1.0.0"), versions(&["1.0.0", "2.0.0"])));
    let admin_router = server.admin_router();
    let router = server.router();

    let response = admin(
        &admin_router,
        Method::POST,
        "/admin/groups/health/versions/1.0.0/deprecate",
        Some(r#"{"sunset_at": "2999-01-01T00:00:00Z"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let status: VersionStatus = json(response).await;
    assert!(status.deprecated);
    assert!(!status.sunset);

    let response = send(&router, Method::GET, "/health", None).await;
    assert_eq!(response.headers()[X_API_VERSION], "1.0.0");
    assert!(response.headers().contains_key(header::WARNING));
    assert!(response.headers().contains_key(DEPRECATION));
    assert_eq!(server.dispatcher().current().generation(), 1);

    let response = admin(
        &admin_router,
        Method::DELETE,
        "/admin/groups/health/versions/1.0.0/deprecate",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&router, Method::GET, "/health", None).await;
    assert!(response.headers().get(header::WARNING).is_none());
}

#[tokio::test]
async fn test_past_sunset_via_admin_returns_gone() {
    let server = server(health_config(Some("1.0.0"), versions(&["1.0.0", "2.0.0"])));
    let admin_router = server.admin_router();
    let router = server.router();

    let response = admin(
        &admin_router,
        Method::POST,
        "/admin/groups/health/versions/1.0.0/deprecate",
        Some(r#"{"deprecated_at": "2020-01-01T00:00:00Z", "sunset_at": "2021-01-01T00:00:00Z"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&router, Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::GONE);

    let response = send(
        &router,
        Method::GET,
        "/health",
        Some("application/vnd.svc.v2.0.0+json"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_errors() {
    let server = server(health_config(None, Vec::new()));
    let router = server.admin_router();

    let response = admin(
        &router,
        Method::POST,
        "/admin/groups/missing/versions/1.0.0/deprecate",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = admin(
        &router,
        Method::POST,
        "/admin/groups/health/versions/9.0.0/deprecate",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = admin(
        &router,
        Method::POST,
        "/admin/groups/health/versions/one/deprecate",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = admin(
        &router,
        Method::POST,
        "/admin/groups/health/versions/1.0.0/deprecate",
        Some(r#"{"deprecated_at": "2030-01-01T00:00:00Z", "sunset_at": "2029-01-01T00:00:00Z"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.dispatcher().current().generation(), 0);
}
