use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::io::AsyncWriteExt;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{AppError, Result};
use crate::models::{FileListResponse, FileRecord};
use crate::upload::{parse_expiration_hours, StagedUpload};
use crate::AppState;

/// Upload a file
/// POST /api/upload (multipart: `file`, optional `expirationHours`)
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileRecord>> {
    let mut staged: Option<(StagedUpload, String)> = None;
    let mut expiration: Option<String> = None;

    // Process multipart fields
    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to process multipart: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                // A part without a filename is a plain form value, not a file
                let file_name = match field.file_name() {
                    Some(n) if !n.is_empty() => n.to_string(),
                    _ => continue,
                };

                let (upload, mut file) = StagedUpload::create().await.map_err(|e| {
                    AppError::Internal(format!("Failed to create temp file: {}", e))
                })?;

                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file chunk: {}", e))
                })? {
                    file.write_all(&chunk).await.map_err(|e| {
                        AppError::Internal(format!("Failed to write to temp file: {}", e))
                    })?;
                }

                file.flush().await.map_err(|e| {
                    AppError::Internal(format!("Failed to flush temp file: {}", e))
                })?;

                staged = Some((upload, file_name));
            }
            "expirationHours" => {
                expiration = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read expirationHours: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let (upload, file_name) =
        staged.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let ttl_hours = parse_expiration_hours(
        expiration.as_deref(),
        state.config.upload.default_expiration_hours,
    );

    let mut reader = upload
        .open()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {}", e)))?;
    let record = state.store.save(&file_name, &mut reader, ttl_hours).await?;

    Ok(Json(record))
}

/// List all stored files, most recent first
/// GET /api/files
pub async fn list_files(State(state): State<AppState>) -> Json<FileListResponse> {
    let files = state.store.list().await;
    Json(FileListResponse { files })
}

/// Download a file, with range and conditional request support
/// GET /api/download/:id
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response> {
    let (record, path) = state.store.get(&id).await?;

    let mut response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to serve file: {}", e)))?
        .into_response();

    // The blob may have been deleted since the lookup
    if response.status() == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let disposition = HeaderValue::from_str(&content_disposition(&record.name))
        .map_err(|e| AppError::Internal(format!("Invalid content disposition: {}", e)))?;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response)
}

/// Delete a file
/// DELETE /api/delete/:id
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Attachment header carrying an ASCII fallback name and the UTF-8 original
fn content_disposition(name: &str) -> String {
    let fallback_name: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() || c.is_ascii_control() => '_',
            c => c,
        })
        .collect();
    let encoded_name = urlencoding::encode(name);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_name, encoded_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::FileStore;
    use crate::{create_router, AppState};
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use std::sync::Arc;
    use tempfile::TempDir;

    const BOUNDARY: &str = "filedrop-test-boundary";

    async fn test_app() -> (TempDir, Arc<FileStore>, Router) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(dir.path().join("uploads")).await.unwrap());
        let mut config = Config::default();
        config.server.static_dir = dir.path().join("static").to_string_lossy().into_owned();
        let state = AppState {
            store: store.clone(),
            config: Arc::new(config),
            local_ip: "192.168.1.10".to_string(),
        };
        (dir, store, create_router(state))
    }

    fn multipart_body(file: Option<(&str, &[u8])>, expiration: Option<&str>) -> Body {
        let mut body = Vec::new();
        if let Some(hours) = expiration {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"expirationHours\"\r\n\r\n{}\r\n",
                    BOUNDARY, hours
                )
                .as_bytes(),
            );
        }
        if let Some((name, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Body::from(body)
    }

    fn upload_request(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body)
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("a.txt"),
            "attachment; filename=\"a.txt\"; filename*=UTF-8''a.txt"
        );
        assert_eq!(
            content_disposition("say \"hi\".txt"),
            "attachment; filename=\"say _hi_.txt\"; filename*=UTF-8''say%20%22hi%22.txt"
        );
        assert!(content_disposition("résumé.pdf").starts_with("attachment; filename=\"r_sum_.pdf\""));
    }

    #[tokio::test]
    async fn test_upload_list_download_delete() {
        let (_dir, _store, app) = test_app().await;

        let response = app
            .clone()
            .oneshot(upload_request(multipart_body(Some(("a.txt", b"hello")), Some("2"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        let id = record["id"].as_str().unwrap().to_string();
        assert_eq!(record["name"], "a.txt");
        assert_eq!(record["size"], 5);

        let response = app
            .clone()
            .oneshot(Request::get("/api/files").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listing: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(listing["files"][0]["id"], id.as_str());

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/download/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"a.txt\""));
        assert_eq!(body_bytes(response).await, b"hello");

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/delete/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::get(format!("/api/download/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_honours_expiration_field() {
        let (_dir, store, app) = test_app().await;

        let response = app
            .oneshot(upload_request(multipart_body(Some(("b.txt", b"")), Some("3"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let files = store.list().await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 0);
        assert_eq!(files[0].expires_at - files[0].uploaded_at, chrono::Duration::hours(3));
    }

    #[tokio::test]
    async fn test_upload_invalid_expiration_uses_default() {
        let (_dir, store, app) = test_app().await;

        let response = app
            .oneshot(upload_request(multipart_body(Some(("c.txt", b"x")), Some("soon"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let files = store.list().await;
        assert_eq!(files[0].expires_at - files[0].uploaded_at, chrono::Duration::hours(24));
    }

    #[tokio::test]
    async fn test_upload_huge_expiration_uses_default() {
        let (_dir, store, app) = test_app().await;

        let response = app
            .oneshot(upload_request(multipart_body(Some(("d.txt", b"x")), Some("4294967295"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let files = store.list().await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].expires_at - files[0].uploaded_at, chrono::Duration::hours(24));
    }

    #[tokio::test]
    async fn test_download_range_request() {
        let (_dir, store, app) = test_app().await;
        let mut reader: &[u8] = b"hello world";
        let record = store.save("greeting.txt", &mut reader, 1).await.unwrap();

        let response = app
            .oneshot(
                Request::get(format!("/api/download/{}", record.id))
                    .header(header::RANGE, "bytes=6-10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"greeting.txt\""));
        assert_eq!(body_bytes(response).await, b"world");
    }

    #[tokio::test]
    async fn test_download_with_missing_blob_is_not_found() {
        let (dir, store, app) = test_app().await;
        let mut reader: &[u8] = b"hello";
        let record = store.save("a.txt", &mut reader, 1).await.unwrap();
        std::fs::remove_file(dir.path().join("uploads").join(&record.id)).unwrap();

        let response = app
            .oneshot(
                Request::get(format!("/api/download/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_truncated_expiration_is_bad_request() {
        let (_dir, store, app) = test_app().await;

        // The form ends in the middle of the expirationHours part
        let body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"expirationHours\"\r\n\r\n12",
            BOUNDARY
        );
        let response = app.oneshot(upload_request(Body::from(body))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_file_is_bad_request() {
        let (_dir, store, app) = test_app().await;

        let response = app
            .oneshot(upload_request(multipart_body(None, Some("1"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let (_dir, _store, app) = test_app().await;

        let response = app
            .oneshot(
                Request::delete("/api/delete/0123456789abcdef0123456789abcdef")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
