// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # HTTP Surface Tests
//!
//! Drives the five endpoints through the axum router with
//! `tower::ServiceExt::oneshot`, asserting wire statuses and JSON bodies.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::{md5_hex, png_bytes, split_chunks, TestHarness};
use catalog_ingest_domain::UploadId;

const BOUNDARY: &str = "it-boundary-7f3a";

/// Builds a multipart body for one chunk submission.
fn chunk_form(upload_id: &str, index: u32, total: u32, checksum: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut text_part = |name: &str, value: &str| {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    };
    text_part("upload_id", upload_id);
    text_part("chunk_index", &index.to_string());
    text_part("total_chunks", &total.to_string());
    text_part("chunk_checksum", checksum);
    text_part("file_name", "photo.png");
    text_part("mime_type", "image/png");

    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"chunk\"; filename=\"blob\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_chunk(h: &TestHarness, upload_id: &str, index: u32, total: u32, checksum: &str, bytes: &[u8]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/upload/chunk")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(chunk_form(upload_id, index, total, checksum, bytes)))
        .unwrap();
    let response = h.router().oneshot(request).await.unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

async fn post_json(h: &TestHarness, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = h.router().oneshot(request).await.unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

async fn get(h: &TestHarness, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
    let response = h.router().oneshot(request).await.unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

#[tokio::test]
async fn full_flow_over_http() {
    let h = TestHarness::new().await;
    h.seed_product("HTTP-1", "HTTP Widget").await;

    let source = png_bytes(700, 500);
    let upload_id = UploadId::generate().to_string();
    let chunks = split_chunks(&source, 3);

    // Chunks in order 2, 0, 1
    for &index in &[2usize, 0, 1] {
        let (status, body) = post_chunk(
            &h,
            &upload_id,
            index as u32,
            3,
            &md5_hex(&chunks[index]),
            &chunks[index],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "received_chunk": index }));
    }

    // Status shows uploading, ready is false
    let (status, body) = get(&h, &format!("/upload/{}/status", upload_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "uploading");
    let (_, body) = get(&h, &format!("/upload/{}/ready", upload_id)).await;
    assert_eq!(body, json!({ "ready": false }));

    // Complete
    let (status, body) = post_json(
        &h,
        "/upload/complete",
        json!({ "upload_id": upload_id, "file_checksum": md5_hex(&source) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "assembled", "upload_id": upload_id }));

    // Attach before processing: 202 with backoff hint
    let (status, body) = post_json(
        &h,
        "/upload/attach-to-product",
        json!({ "upload_id": upload_id, "sku": "HTTP-1", "is_primary": true }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "uploading");
    assert!(body["processing_time"].is_i64());

    h.process_pending_jobs().await;

    // Ready flips true, status complete with checksum and size
    let (_, body) = get(&h, &format!("/upload/{}/ready", upload_id)).await;
    assert_eq!(body, json!({ "ready": true }));
    let (_, body) = get(&h, &format!("/upload/{}/status", upload_id)).await;
    assert_eq!(body["status"], "complete");
    assert_eq!(body["file_checksum"], md5_hex(&source));
    assert_eq!(body["file_size"], source.len() as u64);

    // Attach succeeds
    let (status, body) = post_json(
        &h,
        "/upload/attach-to-product",
        json!({ "upload_id": upload_id, "sku": "HTTP-1", "is_primary": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["is_primary"], true);
    assert!(body["image_id"].is_i64());
    assert!(body["product_id"].is_i64());
}

#[tokio::test]
async fn chunk_checksum_mismatch_is_422() {
    let h = TestHarness::new().await;
    let upload_id = UploadId::generate().to_string();

    let (status, body) = post_chunk(&h, &upload_id, 0, 1, &md5_hex(b"other bytes"), b"actual bytes").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "chunk_checksum_mismatch");
}

#[tokio::test]
async fn malformed_chunk_form_is_422() {
    let h = TestHarness::new().await;
    // Missing the chunk file field entirely
    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"upload_id\"\r\n\r\n{}\r\n", UploadId::generate()).as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/upload/chunk")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    let response = h.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "validation_failed");
}

#[tokio::test]
async fn unknown_upload_is_404() {
    let h = TestHarness::new().await;
    let missing = UploadId::generate();

    let (status, body) = get(&h, &format!("/upload/{}/status", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = get(&h, &format!("/upload/{}/ready", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post_json(
        &h,
        "/upload/complete",
        json!({ "upload_id": missing.to_string(), "file_checksum": md5_hex(b"x") }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn completion_error_codes() {
    let h = TestHarness::new().await;
    let upload_id = UploadId::generate();
    // Chunk 1 never arrives
    h.send_chunk(upload_id, 0, 3, b"first").await.unwrap();
    h.send_chunk(upload_id, 2, 3, b"third").await.unwrap();

    let (status, body) = post_json(
        &h,
        "/upload/complete",
        json!({ "upload_id": upload_id.to_string(), "file_checksum": md5_hex(b"firstthird") }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "missing_chunks");

    // The gap failed the upload; a whole-file mismatch path needs a fresh one
    let fresh = UploadId::generate();
    h.send_chunk(fresh, 0, 1, b"whole file").await.unwrap();
    let (status, body) = post_json(
        &h,
        "/upload/complete",
        json!({ "upload_id": fresh.to_string(), "file_checksum": md5_hex(b"some other content") }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "checksum_mismatch");
}

#[tokio::test]
async fn health_and_metrics_respond() {
    let h = TestHarness::new().await;

    let (status, body) = get(&h, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let request = Request::builder().method("GET").uri("/metrics").body(Body::empty()).unwrap();
    let response = h.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("catalog_ingest_chunks_received_total"));
}
