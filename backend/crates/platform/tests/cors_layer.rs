//! CORS layer behaviour through a real axum router

use std::time::Duration;

use axum::{Router, body::Body, routing::get};
use http::{Method, Request, Response, StatusCode, header};
use platform::cors::{CorsOptions, build_layer, default_layer};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

fn app(layer: CorsLayer) -> Router {
    Router::new().route("/", get(|| async { "ok" })).layer(layer)
}

fn preflight(origin: &str, method: &str, headers: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, method);
    if let Some(headers) = headers {
        builder = builder.header(header::ACCESS_CONTROL_REQUEST_HEADERS, headers);
    }
    builder.body(Body::empty()).unwrap()
}

fn simple_get(origin: &str) -> Request<Body> {
    Request::builder()
        .uri("/")
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap()
}

fn header_value<'a>(response: &'a Response<Body>, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn comma_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[tokio::test]
async fn test_default_layer_preflight() {
    let response = app(default_layer())
        .oneshot(preflight("https://a.com", "PUT", Some("x-custom")))
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_METHODS), Some("*"));
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_HEADERS), Some("*"));
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_MAX_AGE), Some("43200"));
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_CREDENTIALS), None);
}

#[tokio::test]
async fn test_default_layer_simple_request() {
    let response = app(default_layer())
        .oneshot(simple_get("https://a.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_EXPOSE_HEADERS), Some("*"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_unset_options_match_default_layer() {
    let response = app(build_layer(CorsOptions::default()))
        .oneshot(preflight("https://a.com", "DELETE", None))
        .await
        .unwrap();

    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_MAX_AGE), Some("43200"));
}

#[tokio::test]
async fn test_origin_list() {
    let layer = || build_layer(CorsOptions::default().allow_origins(["https://a.com"]));

    let allowed = app(layer()).oneshot(simple_get("https://a.com")).await.unwrap();
    assert_eq!(
        header_value(&allowed, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("https://a.com")
    );

    let denied = app(layer()).oneshot(simple_get("https://evil.com")).await.unwrap();
    assert_eq!(denied.status(), StatusCode::OK);
    assert_eq!(header_value(&denied, header::ACCESS_CONTROL_ALLOW_ORIGIN), None);
}

#[tokio::test]
async fn test_credentials_with_origin_list_mirror_wildcards() {
    let layer = || {
        build_layer(
            CorsOptions::default()
                .allow_origins(["https://a.com"])
                .allow_credentials(true),
        )
    };

    let response = app(layer())
        .oneshot(preflight("https://a.com", "PATCH", Some("x-custom")))
        .await
        .unwrap();

    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("https://a.com")
    );
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
        Some("true")
    );
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_METHODS), Some("PATCH"));
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_HEADERS), Some("x-custom"));

    let response = app(layer()).oneshot(simple_get("https://a.com")).await.unwrap();
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
        Some("true")
    );
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_EXPOSE_HEADERS), None);
}

#[tokio::test]
async fn test_credentials_with_wildcard_origin_do_not_panic() {
    let response = app(build_layer(CorsOptions::default().allow_credentials(true)))
        .oneshot(simple_get("https://a.com"))
        .await
        .unwrap();

    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_CREDENTIALS), None);
}

#[tokio::test]
async fn test_explicit_lists() {
    let layer = build_layer(
        CorsOptions::default()
            .allow_methods(["get", "post"])
            .allow_headers(["Content-Type", "Authorization"])
            .expose_headers(["x-request-id"]),
    );

    let response = app(layer.clone())
        .oneshot(preflight("https://a.com", "POST", Some("content-type")))
        .await
        .unwrap();

    assert_eq!(
        comma_list(header_value(&response, header::ACCESS_CONTROL_ALLOW_METHODS)),
        vec!["GET", "POST"]
    );
    assert_eq!(
        comma_list(header_value(&response, header::ACCESS_CONTROL_ALLOW_HEADERS)),
        vec!["content-type", "authorization"]
    );

    let response = app(layer).oneshot(simple_get("https://a.com")).await.unwrap();
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_EXPOSE_HEADERS),
        Some("x-request-id")
    );
}

#[tokio::test]
async fn test_max_age() {
    let response = app(build_layer(
        CorsOptions::default().max_age(Duration::from_secs(600)),
    ))
    .oneshot(preflight("https://a.com", "GET", None))
    .await
    .unwrap();
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_MAX_AGE), Some("600"));

    let response = app(build_layer(CorsOptions::default().max_age(Duration::ZERO)))
        .oneshot(preflight("https://a.com", "GET", None))
        .await
        .unwrap();
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_MAX_AGE), Some("43200"));
}
