#![cfg(feature = "api")]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use echoline::api::{build_router, AppState};
use echoline::config::ConfigBuilder;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;
use tower::ServiceExt;

const BOUNDARY: &str = "echoline-test-boundary";
const SRT_EN: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";
const SRT_ZH: &str = "1\n00:00:01,000 --> 00:00:02,000\n你好\n";

struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    body: &'a [u8],
}

fn text(name: &'static str, value: &'static str) -> Part<'static> {
    Part {
        name,
        file_name: None,
        body: value.as_bytes(),
    }
}

fn file<'a>(name: &'a str, file_name: &'a str, body: &'a [u8]) -> Part<'a> {
    Part {
        name,
        file_name: Some(file_name),
        body,
    }
}

fn multipart(method: &str, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(part.body);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn setup() -> (TempDir, Router) {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("index.html"), "<html>EchoLine</html>")
        .await
        .unwrap();

    let config = ConfigBuilder::new()
        .with_root_dir(temp_dir.path().to_path_buf())
        .enable_thumbnails(false)
        .build();
    let state = AppState::from_config(Arc::new(config)).await.unwrap();

    (temp_dir, build_router(state))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_and_empty_catalog() {
    let (_temp_dir, app) = setup().await;

    let (status, body) = send_json(&app, empty("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send_json(&app, empty("GET", "/api/episodes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_add_episode_with_upload() {
    let (temp_dir, app) = setup().await;

    let request = multipart(
        "POST",
        "/api/episode",
        &[
            file("video", "my clip.mov", b"fake video bytes"),
            file("srtEn", "a.srt", SRT_EN.as_bytes()),
            file("srtZh", "b.srt", SRT_ZH.as_bytes()),
        ],
    );
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["index"], 0);
    assert_eq!(body["episode"]["title"], "Episode 1");
    assert_eq!(body["episode"]["subtitle"], "Episode 1");
    assert_eq!(body["episode"]["videoUrl"], "videos/episode_0.mov");
    assert_eq!(body["episode"]["subtitles"]["primary"], "subtitles/episode_0.en.srt");
    assert_eq!(body["episode"]["subtitles"]["secondary"], "subtitles/episode_0.zh.srt");
    assert!(body["episode"].get("thumbUrl").is_none());

    let root = temp_dir.path();
    assert!(root.join("videos/episode_0.mov").exists());
    let stored = fs::read_to_string(root.join("subtitles/episode_0.zh.srt")).await.unwrap();
    assert_eq!(stored, SRT_ZH);

    let (_, listed) = send_json(&app, empty("GET", "/api/episodes")).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_episode_referencing_existing_video() {
    let (temp_dir, app) = setup().await;
    fs::write(temp_dir.path().join("videos/lesson_04.mkv"), b"big video")
        .await
        .unwrap();

    let request = multipart(
        "POST",
        "/api/episode",
        &[
            text("title", "4 Directions"),
            text("subtitle", ""),
            text("videoFilename", "lesson_04.mkv"),
            file("srtPrimary", "a.srt", SRT_EN.as_bytes()),
        ],
    );
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["episode"]["title"], "4 Directions");
    assert_eq!(body["episode"]["subtitle"], "4 Directions");
    assert_eq!(body["episode"]["videoUrl"], "videos/lesson_04.mkv");
    assert_eq!(body["episode"]["subtitles"]["primary"], "subtitles/lesson_04.en.srt");
    assert!(body["episode"]["subtitles"].get("secondary").is_none());
}

#[tokio::test]
async fn test_add_episode_validation() {
    let (_temp_dir, app) = setup().await;

    let (status, body) = send_json(
        &app,
        multipart("POST", "/api/episode", &[text("title", "No video")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("video"));

    let (status, _) = send_json(
        &app,
        multipart("POST", "/api/episode", &[text("videoFilename", "missing.mp4")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        multipart("POST", "/api/episode", &[text("videoFilename", "..")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = send_json(&app, empty("GET", "/api/episodes")).await;
    assert_eq!(listed, serde_json::json!([]));
}

#[tokio::test]
async fn test_update_episode() {
    let (temp_dir, app) = setup().await;
    send(
        &app,
        multipart("POST", "/api/episode", &[file("video", "a.mp4", b"first")]),
    )
    .await;

    let (status, _) = send_json(
        &app,
        multipart("PUT", "/api/episode/3", &[text("title", "Nope")]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = multipart(
        "PUT",
        "/api/episode/0",
        &[
            text("title", "1 Renamed"),
            file("video", "b.webm", b"second"),
            file("srtZh", "b.srt", SRT_ZH.as_bytes()),
        ],
    );
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["episode"]["title"], "1 Renamed");
    assert_eq!(body["episode"]["videoUrl"], "videos/episode_0.webm");
    assert_eq!(body["episode"]["subtitles"]["secondary"], "subtitles/episode_0.zh.srt");

    let root = temp_dir.path();
    assert!(!root.join("videos/episode_0.mp4").exists());
    assert!(root.join("videos/episode_0.webm").exists());
}

#[tokio::test]
async fn test_delete_episode_removes_files() {
    let (temp_dir, app) = setup().await;
    send(
        &app,
        multipart(
            "POST",
            "/api/episode",
            &[
                file("video", "a.mp4", b"video"),
                file("srtEn", "a.srt", SRT_EN.as_bytes()),
            ],
        ),
    )
    .await;

    let (status, body) = send_json(&app, empty("DELETE", "/api/episode/0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let root = temp_dir.path();
    assert!(!root.join("videos/episode_0.mp4").exists());
    assert!(!root.join("subtitles/episode_0.en.srt").exists());

    let (status, _) = send_json(&app, empty("DELETE", "/api/episode/0")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_thumbnails_reports_counts() {
    let (_temp_dir, app) = setup().await;
    for name in ["a.mp4", "b.mp4"] {
        send(
            &app,
            multipart("POST", "/api/episode", &[file("video", name, b"video")]),
        )
        .await;
    }

    let (status, body) = send_json(&app, empty("POST", "/api/generate-thumbnails")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"ok": true, "generated": 0, "total": 2}));
}

#[tokio::test]
async fn test_static_files_and_ranges() {
    let (temp_dir, app) = setup().await;
    fs::write(temp_dir.path().join("videos/clip.mp4"), b"0123456789")
        .await
        .unwrap();

    let (status, body) = send(&app, empty("GET", "/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<html>EchoLine</html>");

    let request = Request::builder()
        .uri("/videos/clip.mp4")
        .header(header::RANGE, "bytes=2-5")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body, b"2345");

    let (status, _) = send(&app, empty("GET", "/videos/nothing.mp4")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
