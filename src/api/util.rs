// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Uploads to object storage and cache maintenance.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    auth::{Auth, SuperuserOnly},
    error::ApiError,
    models::{InvalidateCacheRequest, InvalidateCacheResponse, UploadResponse},
    providers::{compress, object_key, CompressionTier},
    state::AppState,
};

const FILE_FIELD: &str = "fileobject";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

struct UploadedFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Pull the `fileobject` part out of a multipart body.
async fn read_file(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
        return Ok(UploadedFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::bad_request(format!("Missing multipart field '{FILE_FIELD}'")))
}

async fn store(
    state: &AppState,
    file: UploadedFile,
    tier: Option<CompressionTier>,
) -> Result<UploadResponse, ApiError> {
    let timestamp = Utc::now().timestamp_micros();
    let (bytes, content_type, tier_label) = match tier.and_then(|t| t.max_dimension().map(|d| (t, d))) {
        Some((tier, max_dimension)) => {
            let source = file.bytes;
            let compressed = tokio::task::spawn_blocking(move || compress(&source, max_dimension))
                .await
                .map_err(|e| ApiError::Internal(format!("image compression task failed: {e}")))??;
            (compressed.bytes, compressed.content_type.to_string(), Some(tier.as_str()))
        }
        None => (file.bytes, file.content_type, None),
    };

    let key = object_key(&state.upload_key_prefix, &file.filename, timestamp, tier_label);
    let image_url = state.object_store.put_object(&key, bytes, &content_type).await?;
    Ok(UploadResponse {
        status: "success".to_string(),
        image_url,
    })
}

#[utoipa::path(
    post,
    path = "/api/util/upload_file",
    request_body(content_type = "multipart/form-data", description = "File in the `fileobject` field"),
    tag = "Util",
    security(("bearer" = [])),
    responses((status = 200, body = UploadResponse), (status = 502))
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Auth(caller): Auth,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file = read_file(multipart).await?;
    tracing::debug!(user_id = caller.id(), filename = %file.filename, "Uploading file");
    Ok(Json(store(&state, file, None).await?))
}

/// Upload an image downscaled to `compression_type` (`xs`, `s`, `m`, `l`
/// or `original`).
#[utoipa::path(
    post,
    path = "/api/util/upload_image/{compression_type}",
    params(("compression_type" = String, Path, description = "xs, s, m, l or original")),
    request_body(content_type = "multipart/form-data", description = "Image in the `fileobject` field"),
    tag = "Util",
    security(("bearer" = [])),
    responses((status = 200, body = UploadResponse), (status = 400), (status = 502))
)]
pub async fn upload_image(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(compression_type): Path<String>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let tier: CompressionTier = compression_type.parse().map_err(ApiError::Validation)?;
    let file = read_file(multipart).await?;
    tracing::debug!(user_id = caller.id(), filename = %file.filename, %tier, "Uploading image");
    Ok(Json(store(&state, file, Some(tier)).await?))
}

#[utoipa::path(
    post,
    path = "/api/util/force_invalidate_cache",
    request_body = InvalidateCacheRequest,
    tag = "Util",
    security(("bearer" = [])),
    responses((status = 200, body = InvalidateCacheResponse), (status = 403))
)]
pub async fn force_invalidate_cache(
    State(state): State<AppState>,
    SuperuserOnly(admin): SuperuserOnly,
    Json(request): Json<InvalidateCacheRequest>,
) -> Json<InvalidateCacheResponse> {
    let detail = state.cache.invalidate(&request.key);
    tracing::info!(key = %request.key, evicted = detail, by = admin.id(), "Cache key invalidated");
    Json(InvalidateCacheResponse {
        status: "success".to_string(),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::api::tests::{send, user_with_token};
    use crate::providers::image::tests::png;
    use crate::providers::{ObjectStore, ObjectStoreError};
    use crate::state::tests::test_state;

    const BOUNDARY: &str = "paideia-test-boundary";

    /// Records every put and answers with a fake URL.
    #[derive(Default)]
    struct RecordingStore {
        puts: Mutex<Vec<(String, Vec<u8>, String)>>,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put_object(
            &self,
            key: &str,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<String, ObjectStoreError> {
            self.puts
                .lock()
                .unwrap()
                .push((key.to_string(), body, content_type.to_string()));
            Ok(format!("https://bucket.example/{key}"))
        }
    }

    fn multipart_body(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"fileobject\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload(state: &AppState, uri: &str, token: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn state_with_store() -> (AppState, Arc<RecordingStore>, tempfile::TempDir) {
        let (state, dir) = test_state();
        let store = Arc::new(RecordingStore::default());
        let state = state.with_object_store(store.clone(), "paideia");
        (state, store, dir)
    }

    #[tokio::test]
    async fn upload_file_stores_public_object() {
        let (state, store, _dir) = state_with_store();
        let (_, token) = user_with_token(&state, "alice", false);

        let (status, body) = upload(
            &state,
            "/api/util/upload_file",
            &token,
            multipart_body("notes.txt", "text/plain", b"hello"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let puts = store.puts.lock().unwrap();
        let (key, bytes, content_type) = &puts[0];
        assert!(key.starts_with("paideia.notes."));
        assert!(key.ends_with(".txt"));
        assert_eq!(bytes, b"hello");
        assert_eq!(content_type, "text/plain");
        assert_eq!(body["image_url"], format!("https://bucket.example/{key}"));
    }

    #[tokio::test]
    async fn original_tier_matches_upload_file() {
        let (state, store, _dir) = state_with_store();
        let (_, token) = user_with_token(&state, "alice", false);
        let image = png(300, 200);

        upload(&state, "/api/util/upload_file", &token, multipart_body("a.png", "image/png", &image)).await;
        upload(
            &state,
            "/api/util/upload_image/original",
            &token,
            multipart_body("a.png", "image/png", &image),
        )
        .await;

        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].1, puts[1].1);
        assert_eq!(puts[0].2, puts[1].2);
        assert!(!puts[1].0.contains(".original."));
    }

    #[tokio::test]
    async fn sized_tier_downscales_and_tags_key() {
        let (state, store, _dir) = state_with_store();
        let (_, token) = user_with_token(&state, "alice", false);

        let (status, _) = upload(
            &state,
            "/api/util/upload_image/s",
            &token,
            multipart_body("logo.png", "image/png", &png(300, 200)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let puts = store.puts.lock().unwrap();
        let (key, bytes, content_type) = &puts[0];
        assert!(key.starts_with("paideia.logo."));
        assert!(key.ends_with(".s.png"));
        assert_eq!(content_type, "image/png");
        let decoded = ::image::load_from_memory(bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
    }

    #[tokio::test]
    async fn unknown_tier_is_rejected_before_storage() {
        let (state, store, _dir) = state_with_store();
        let (_, token) = user_with_token(&state, "alice", false);

        let (status, body) = upload(
            &state,
            "/api/util/upload_image/huge",
            &token,
            multipart_body("logo.png", "image/png", &png(10, 10)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("huge"));
        assert!(store.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn uploads_above_two_megabytes_are_accepted() {
        let (state, store, _dir) = state_with_store();
        let (_, token) = user_with_token(&state, "alice", false);
        let data = vec![7u8; 3 * 1024 * 1024];

        let (status, _) = upload(
            &state,
            "/api/util/upload_file",
            &token,
            multipart_body("video.bin", "application/octet-stream", &data),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.puts.lock().unwrap()[0].1.len(), data.len());
    }

    #[tokio::test]
    async fn uploads_over_the_configured_limit_are_rejected() {
        let (state, store, _dir) = state_with_store();
        let state = state.with_upload_limit(1024);
        let (_, token) = user_with_token(&state, "alice", false);

        let (status, _) = upload(
            &state,
            "/api/util/upload_file",
            &token,
            multipart_body("big.bin", "application/octet-stream", &[1u8; 4096]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn uploads_fail_when_storage_is_not_configured() {
        let (state, _dir) = test_state();
        let (_, token) = user_with_token(&state, "alice", false);
        let (status, _) = upload(
            &state,
            "/api/util/upload_file",
            &token,
            multipart_body("a.txt", "text/plain", b"x"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn force_invalidate_is_superuser_only() {
        let (state, _dir) = test_state();
        let (_, user) = user_with_token(&state, "alice", false);
        let (_, admin) = user_with_token(&state, "root", true);
        state.cache.put("proposal_1", json!({"id": 1}));

        let request = json!({"key": "proposal_1"});
        let (status, _) = send(
            &state,
            Method::POST,
            "/api/util/force_invalidate_cache",
            Some(&user),
            Some(request.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/util/force_invalidate_cache",
            Some(&admin),
            Some(request.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "success", "detail": true}));

        let (_, body) = send(
            &state,
            Method::POST,
            "/api/util/force_invalidate_cache",
            Some(&admin),
            Some(request),
        )
        .await;
        assert_eq!(body["detail"], false);
    }
}
