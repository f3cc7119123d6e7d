//! HTTP endpoints through the axum router.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use tower::ServiceExt;
use trackerlink::{
    backend::InMemory,
    constants::{HOST_USER_ID_HEADER, RSA_KEY},
    web,
};
use wiremock::MockServer;

use crate::helpers::*;

async fn send(app: Router, method: &str, uri: &str, user: Option<&str>) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header(HOST_USER_ID_HEADER, user);
    }
    app.oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// An app whose backend counts every touch of the RSA key.
async fn key_counting_app() -> (Router, Arc<CountingBackend>) {
    let counting = Arc::new(CountingBackend::new(Arc::new(InMemory::new()), RSA_KEY));
    let app = TestApp::with_backend(test_config(None), counting.clone()).await;
    (web::router(app.state), counting)
}

#[tokio::test]
async fn test_public_key_wrong_method_is_405_without_key_access() {
    let (router, counting) = key_counting_app().await;

    for method in ["POST", "PUT", "DELETE"] {
        let response = send(router.clone(), method, "/oauth1/public_key", Some(ADMIN_ID)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
    assert_eq!(counting.hits(), 0);
}

#[tokio::test]
async fn test_public_key_without_identity_is_401_without_key_access() {
    let (router, counting) = key_counting_app().await;

    let response = send(router, "GET", "/oauth1/public_key", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(counting.hits(), 0);
}

#[tokio::test]
async fn test_public_key_for_non_admin_is_403_without_key_access() {
    let (router, counting) = key_counting_app().await;

    let response = send(router, "GET", "/oauth1/public_key", Some(USER_ID)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(counting.hits(), 0);
}

#[tokio::test]
async fn test_public_key_for_admin_is_pem() {
    let (router, counting) = key_counting_app().await;

    let response = send(router.clone(), "GET", "/oauth1/public_key", Some(ADMIN_ID)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
    let pem = body_text(response).await;
    assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    assert!(counting.hits() > 0);

    // Same key on the next request
    let again = body_text(send(router, "GET", "/oauth1/public_key", Some(ADMIN_ID)).await).await;
    assert_eq!(pem, again);
}

#[tokio::test]
async fn test_complete_status_codes() {
    let app = TestApp::new(test_config(None)).await;
    let router = web::router(app.state);

    let response = send(
        router.clone(),
        "GET",
        "/oauth1/complete?oauth_token=t",
        Some(USER_ID),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        router,
        "GET",
        &format!("/oauth1/complete?{}", callback_query()),
        Some(USER_ID),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_text(response).await,
        "tracker instance is not configured"
    );
}

#[tokio::test]
async fn test_connect_complete_and_disconnect_over_http() {
    let server = MockServer::start().await;
    mount_tracker(&server, "jdoe", "Jane <Doe>").await;
    let app = TestApp::new(test_config(Some(&server.uri()))).await;
    let router = web::router(app.state.clone());

    let response = send(router.clone(), "GET", "/oauth1/connect", Some(USER_ID)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.contains("/plugins/servlet/oauth/authorize?oauth_token=req-token"));

    let response = send(
        router.clone(),
        "GET",
        &format!("/oauth1/complete?{}", callback_query()),
        Some(USER_ID),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Jane &lt;Doe&gt; (jdoe)"));
    assert!(page.contains("Ada Lovelace"));

    let response = send(router.clone(), "GET", "/api/v1/userinfo", Some(USER_ID)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let info: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(info["is_connected"], true);
    assert_eq!(info["tracker_username"], "jdoe");
    assert_eq!(info["instance_type"], "server");

    let response = send(router.clone(), "POST", "/user/disconnect", Some(USER_ID)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("no longer connected"));

    let response = send(router, "POST", "/user/disconnect", Some(USER_ID)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upstream_failure_is_502() {
    let server = MockServer::start().await;
    // No request-token endpoint mounted: the tracker answers 404
    let app = TestApp::new(test_config(Some(&server.uri()))).await;
    let router = web::router(app.state);

    let response = send(router, "GET", "/oauth1/connect", Some(USER_ID)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_text(response).await, "tracker request failed");
}

#[tokio::test]
async fn test_user_routes_require_identity() {
    let app = TestApp::new(test_config(None)).await;
    let router = web::router(app.state);

    for (method, uri) in [
        ("GET", "/api/v1/userinfo"),
        ("GET", "/oauth1/connect"),
        ("POST", "/user/disconnect"),
    ] {
        let response = send(router.clone(), method, uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_disconnect_requires_post() {
    let app = TestApp::new(test_config(None)).await;
    let response = send(web::router(app.state), "GET", "/user/disconnect", Some(USER_ID)).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health_reports_backend() {
    let app = TestApp::with_backend(test_config(None), Arc::new(InMemory::new())).await;
    let response = send(web::router(app.state), "GET", "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "inmemory");
}
