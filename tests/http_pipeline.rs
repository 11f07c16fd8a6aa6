use std::{io::Cursor, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use docembed::{
    api::{SharedSecret, create_router},
    config::DEFAULT_MAX_UPLOAD_BYTES,
    embedding::{EMBEDDING_DIMENSION, OpenAiEmbeddingClient},
    gateway::HttpBackend,
    processing::IngestionPipeline,
    source::HttpDocumentFetcher,
};
use docx_rs::{Docx, Paragraph, Run};
use httpmock::{Method::GET, Method::POST, Mock, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "pipeline-secret";
const STORAGE_KEY: &str = "storage-key";

/// Storage API and embedding provider served from one mock server.
struct Harness {
    server: MockServer,
}

impl Harness {
    async fn start() -> Self {
        Self {
            server: MockServer::start_async().await,
        }
    }

    fn router(&self, max_chunk_size: usize) -> Router {
        let base = self.server.base_url();
        let pipeline = IngestionPipeline::new(
            Arc::new(OpenAiEmbeddingClient::new("sk-test".into(), &base, "test-model").unwrap()),
            Arc::new(HttpBackend::with_base_url(&base, Some(STORAGE_KEY.into())).unwrap()),
            Arc::new(HttpBackend::with_base_url(&base, Some(STORAGE_KEY.into())).unwrap()),
            Arc::new(HttpDocumentFetcher::new(Some("fetch-token".into())).unwrap()),
            max_chunk_size,
        );
        create_router(
            Arc::new(pipeline),
            SharedSecret::new(SECRET),
            DEFAULT_MAX_UPLOAD_BYTES,
        )
    }

    async fn status_mock(&self, id: &str, partial: Value) -> Mock<'_> {
        let path = format!("/files/{id}/status");
        self.server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(path)
                    .header("authorization", format!("Bearer {STORAGE_KEY}"))
                    .json_body_partial(partial.to_string());
                then.status(200).json_body(json!({ "ok": true }));
            })
            .await
    }

    async fn chunk_mock(&self, id: &str) -> Mock<'_> {
        let path = format!("/files/{id}/chunks");
        self.server
            .mock_async(|when, then| {
                when.method(POST).path(path);
                then.status(200).json_body(json!({ "success": true }));
            })
            .await
    }

    async fn embedding_mock(&self, fragment: &str) -> Mock<'_> {
        self.server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .header("authorization", "Bearer sk-test")
                    .body_contains(fragment);
                then.status(200).json_body(json!({
                    "data": [{ "embedding": vec![0.25_f32; EMBEDDING_DIMENSION] }]
                }));
            })
            .await
    }
}

fn process_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/process")
        .header("authorization", format!("Bearer {SECRET}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn three_sentence_docx() -> Vec<u8> {
    let docx = ["Alpha revenue grew.", "Beta costs fell.", "Gamma margin held."]
        .into_iter()
        .fold(Docx::new(), |docx, sentence| {
            docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(sentence)))
        });
    let mut cursor = Cursor::new(Vec::new());
    docx.build().pack(&mut cursor).unwrap();
    cursor.into_inner()
}

#[tokio::test]
async fn middle_chunk_failure_still_reaches_ready() {
    let harness = Harness::start().await;
    let processing = harness
        .status_mock("doc-c", json!({ "status": "processing" }))
        .await;
    let ready = harness
        .status_mock(
            "doc-c",
            json!({
                "status": "ready",
                "metadata": { "totalChunks": 3, "successfulEmbeddings": 2, "format": "word" }
            }),
        )
        .await;
    let chunks = harness.chunk_mock("doc-c").await;
    let first = harness.embedding_mock("Alpha revenue grew").await;
    let last = harness.embedding_mock("Gamma margin held").await;
    let failing = harness
        .server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/embeddings")
                .json_body_partial(r#"{ "input": "Beta costs fell" }"#);
            then.status(500).body("provider unavailable");
        })
        .await;

    // Sentences are 15-18 chars; a 20-char limit keeps each in its own chunk.
    let response = harness
        .router(20)
        .oneshot(process_request(json!({
            "fileId": "doc-c",
            "fileName": "quarterly.docx",
            "fileType": "word",
            "fileContent": BASE64.encode(three_sentence_docx()),
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "success": true, "chunksCreated": 3, "embeddingsCreated": 2 })
    );
    processing.assert_hits_async(1).await;
    ready.assert_hits_async(1).await;
    chunks.assert_hits_async(2).await;
    first.assert_hits_async(1).await;
    failing.assert_hits_async(1).await;
    last.assert_hits_async(1).await;
}

#[tokio::test]
async fn extraction_failure_reports_failed_status() {
    let harness = Harness::start().await;
    let processing = harness
        .status_mock("doc-d", json!({ "status": "processing" }))
        .await;
    let failed = harness
        .status_mock("doc-d", json!({ "status": "failed" }))
        .await;
    let chunks = harness.chunk_mock("doc-d").await;

    let response = harness
        .router(1000)
        .oneshot(process_request(json!({
            "fileId": "doc-d",
            "fileName": "broken.pdf",
            "fileType": "pdf",
            "fileContent": BASE64.encode(b"this is not a pdf"),
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to extract pdf content from 'broken.pdf'")
    );
    processing.assert_hits_async(1).await;
    failed.assert_hits_async(1).await;
    chunks.assert_hits_async(0).await;
}

#[tokio::test]
async fn unauthorized_request_touches_nothing() {
    let harness = Harness::start().await;
    let status = harness.status_mock("doc-e", json!({})).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/process")
        .header("authorization", "Bearer wrong")
        .body(Body::from(
            json!({
                "fileId": "doc-e",
                "fileName": "deck.pptx",
                "fileType": "powerpoint",
                "fileContent": "AAAA",
            })
            .to_string(),
        ))
        .unwrap();
    let response = harness.router(1000).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    status.assert_hits_async(0).await;
}

#[tokio::test]
async fn remote_document_is_downloaded_with_token() {
    let harness = Harness::start().await;
    let download = harness
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/downloads/deck.pptx")
                .header("authorization", "Bearer fetch-token");
            then.status(200).body("deck bytes");
        })
        .await;
    let ready = harness
        .status_mock("doc-r", json!({ "status": "ready" }))
        .await;
    harness
        .status_mock("doc-r", json!({ "status": "processing" }))
        .await;
    harness.chunk_mock("doc-r").await;
    harness.embedding_mock("deck").await;

    let response = harness
        .router(1000)
        .oneshot(process_request(json!({
            "fileId": "doc-r",
            "fileName": "deck.pptx",
            "fileType": "powerpoint",
            "fileUrl": harness.server.url("/downloads/deck.pptx"),
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["chunksCreated"], body["embeddingsCreated"]);
    download.assert_hits_async(1).await;
    ready.assert_hits_async(1).await;
}

#[tokio::test]
async fn missing_download_fails_request() {
    let harness = Harness::start().await;
    let failed = harness
        .status_mock("doc-m", json!({ "status": "failed" }))
        .await;
    harness
        .status_mock("doc-m", json!({ "status": "processing" }))
        .await;

    let response = harness
        .router(1000)
        .oneshot(process_request(json!({
            "fileId": "doc-m",
            "fileName": "gone.pdf",
            "fileType": "pdf",
            "fileUrl": harness.server.url("/downloads/gone.pdf"),
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to fetch document")
    );
    failed.assert_hits_async(1).await;
}
