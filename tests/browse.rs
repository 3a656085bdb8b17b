//! End-to-end request handling against a scratch media tree

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header;
use hyper::{Method, Request, Response, StatusCode};
use media_serve::handler::handle_request;
use media_serve::http::Body;
use media_serve::{AppState, Config};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    state: Arc<AppState>,
    clip_len: usize,
}

/// `a.txt`, `Z.mp4`, `.hidden`, `sub/` and `sub/nested file.flac`
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let clip: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    std::fs::write(dir.path().join("a.txt"), b"plain text").expect("write");
    std::fs::write(dir.path().join("Z.mp4"), &clip).expect("write");
    std::fs::write(dir.path().join(".hidden"), b"secret").expect("write");
    std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
    std::fs::write(dir.path().join("sub").join("nested file.flac"), b"flac").expect("write");

    let mut config = Config::default();
    config.media.directory = dir.path().to_string_lossy().into_owned();
    config.logging.access_log = false;
    let state = Arc::new(AppState::new(config).expect("state"));

    Fixture {
        _dir: dir,
        state,
        clip_len: clip.len(),
    }
}

fn request(method: Method, uri: &str) -> Request<Empty<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Empty::new())
        .expect("request")
}

async fn send(fixture: &Fixture, req: Request<Empty<Bytes>>) -> Response<Body> {
    handle_request(req, Arc::clone(&fixture.state), None)
        .await
        .expect("infallible")
}

async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.expect("body").to_bytes()
}

#[tokio::test]
async fn root_listing_orders_and_hides() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::GET, "/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );

    let html = String::from_utf8(body_bytes(response).await.to_vec()).expect("utf-8");
    let sub = html.find(">sub/<").expect("sub listed");
    let a = html.find(">a.txt<").expect("a.txt listed");
    let z = html.find(">Z.mp4<").expect("Z.mp4 listed");
    assert!(sub < a && a < z, "directories first, then case-insensitive");
    assert!(!html.contains(".hidden"));
    assert!(!html.contains("Parent Directory"));
}

#[tokio::test]
async fn nested_listing_links_to_parent() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::GET, "/sub")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await.to_vec()).expect("utf-8");
    assert!(html.contains("Parent Directory"));
    assert!(html.contains("nested file.flac"));
    assert!(html.contains("nested%20file.flac"));
    assert!(html.contains("audio-file"));
}

#[tokio::test]
async fn encoded_link_serves_file() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::GET, "/sub/nested%20file.flac")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/flac");
    assert_eq!(&body_bytes(response).await[..], b"flac");
}

#[tokio::test]
async fn range_request_returns_partial_content() {
    let fixture = fixture();
    let mut req = request(Method::GET, "/Z.mp4");
    req.headers_mut()
        .insert(header::RANGE, "bytes=0-99".parse().expect("header"));

    let response = send(&fixture, req).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE],
        format!("bytes 0-99/{}", fixture.clip_len).as_str()
    );
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "100");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");

    let body = body_bytes(response).await;
    assert_eq!(body.len(), 100);
    assert_eq!(body[0], 0);
    assert_eq!(body[99], 99);
}

#[tokio::test]
async fn full_file_has_media_headers() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::GET, "/Z.mp4")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"Z.mp4\""
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body_bytes(response).await.len(), fixture.clip_len);
}

#[tokio::test]
async fn head_has_headers_but_no_body() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::HEAD, "/Z.mp4")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH],
        fixture.clip_len.to_string().as_str()
    );
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn revalidation_returns_not_modified() {
    let fixture = fixture();
    let first = send(&fixture, request(Method::GET, "/a.txt")).await;
    let etag = first.headers()[header::ETAG].clone();

    let mut req = request(Method::GET, "/a.txt");
    req.headers_mut().insert(header::IF_NONE_MATCH, etag);
    let response = send(&fixture, req).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn missing_path_is_404_without_details() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::GET, "/no/such/file.mkv")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = String::from_utf8(body_bytes(response).await.to_vec()).expect("utf-8");
    assert_eq!(body, "404 Not Found");
    assert!(!body.contains("file.mkv"));
}

#[tokio::test]
async fn traversal_is_forbidden() {
    let fixture = fixture();
    for uri in ["/../../etc/passwd", "/%2e%2e/%2e%2e/etc/passwd", "/sub/../../x"] {
        let response = send(&fixture, request(Method::GET, uri)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn hidden_files_are_still_addressable_by_path() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::GET, "/.hidden")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unsupported_method_is_405() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::DELETE, "/a.txt")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "GET, HEAD, OPTIONS");
    assert!(fixture.state.root.path().join("a.txt").exists());
}

#[tokio::test]
async fn options_preflight() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::OPTIONS, "/Z.mp4")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Range"
    );
}

#[tokio::test]
async fn health_endpoint() {
    let fixture = fixture();
    let response = send(&fixture, request(Method::GET, "/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let json: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn disabled_api_browses_instead() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.media.directory = dir.path().to_string_lossy().into_owned();
    config.http.enable_api = false;
    config.http.enable_cors = false;
    let state = Arc::new(AppState::new(config).expect("state"));

    let response = handle_request(request(Method::GET, "/health"), state, None)
        .await
        .expect("infallible");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
