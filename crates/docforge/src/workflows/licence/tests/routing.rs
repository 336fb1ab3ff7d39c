use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use crate::workflows::licence::licence_router;

const MAX_UPLOAD: usize = 1024 * 1024;

#[tokio::test]
async fn generate_pdf_streams_attachment_and_removes_signature() {
    let root = scratch_dir("generate-ok");
    let router = licence_router(build_service(&root, true), MAX_UPLOAD);

    let response = router
        .oneshot(multipart_request(
            "/generate-pdf",
            &applicant_parts(b"signature-png"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"generated_document.pdf\""
    );
    assert_eq!(read_body(response).await, RENDERED_PDF);
    assert_eq!(file_count(&root.join("uploads")).await, 0);

    tokio::fs::remove_dir_all(&root).await.ok();
}

#[tokio::test]
async fn failed_job_returns_plain_500_without_vendor_detail() {
    let root = scratch_dir("generate-failed");
    let router = licence_router(build_service(&root, false), MAX_UPLOAD);

    let response = router
        .oneshot(multipart_request(
            "/generate-pdf",
            &applicant_parts(b"signature-png"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_text_body(response).await;
    assert_eq!(body, "Failed to generate PDF");
    assert!(!body.contains("vendor-detail"));
    assert_eq!(file_count(&root.join("uploads")).await, 0);

    tokio::fs::remove_dir_all(&root).await.ok();
}

#[tokio::test]
async fn missing_name_is_a_generation_failure() {
    let root = scratch_dir("generate-missing");
    let router = licence_router(build_service(&root, true), MAX_UPLOAD);
    let parts = vec![
        Part::Text("lastName", "Smith"),
        Part::File {
            field: "signature",
            file_name: "sig.png",
            content_type: "image/png",
            bytes: b"signature-png",
        },
    ];

    let response = router
        .oneshot(multipart_request("/generate-pdf", &parts))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_text_body(response).await, "Failed to generate PDF");

    tokio::fs::remove_dir_all(&root).await.ok();
}

#[tokio::test]
async fn missing_signature_is_a_generation_failure() {
    let root = scratch_dir("generate-nosig");
    let router = licence_router(build_service(&root, true), MAX_UPLOAD);
    let parts = vec![
        Part::Text("firstName", "Jane"),
        Part::Text("lastName", "Smith"),
    ];

    let response = router
        .oneshot(multipart_request("/generate-pdf", &parts))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    tokio::fs::remove_dir_all(&root).await.ok();
}

#[tokio::test]
async fn non_multipart_generate_request_is_a_generation_failure() {
    let root = scratch_dir("generate-json");
    let router = licence_router(build_service(&root, true), MAX_UPLOAD);

    let response = router
        .oneshot(
            Request::post("/generate-pdf")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_text_body(response).await, "Failed to generate PDF");
}

#[tokio::test]
async fn upload_stores_file_under_id_prefix() {
    let root = scratch_dir("upload-ok");
    let router = licence_router(build_service(&root, true), MAX_UPLOAD);
    let parts = vec![Part::File {
        field: "file",
        file_name: "result.pdf",
        content_type: "application/pdf",
        bytes: b"%PDF-1.4 client",
    }];

    let response = router
        .oneshot(multipart_request("/upload?id=42", &parts))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_text_body(response).await,
        "File uploaded successfully with ID 42: 42_result.pdf"
    );
    let stored = tokio::fs::read(root.join("responses").join("42_result.pdf"))
        .await
        .expect("stored file");
    assert_eq!(stored, b"%PDF-1.4 client");

    tokio::fs::remove_dir_all(&root).await.ok();
}

#[tokio::test]
async fn upload_without_id_is_rejected() {
    let root = scratch_dir("upload-noid");
    let router = licence_router(build_service(&root, true), MAX_UPLOAD);
    let parts = vec![Part::File {
        field: "file",
        file_name: "result.pdf",
        content_type: "application/pdf",
        bytes: b"%PDF-1.4 client",
    }];

    let response = router
        .oneshot(multipart_request("/upload", &parts))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_text_body(response).await, "No ID provided.");
    assert_eq!(file_count(&root.join("responses")).await, 0);
}

#[tokio::test]
async fn upload_with_id_reduced_to_nothing_is_rejected_like_a_missing_id() {
    let root = scratch_dir("upload-slashid");
    let router = licence_router(build_service(&root, true), MAX_UPLOAD);
    let parts = vec![Part::File {
        field: "file",
        file_name: "result.pdf",
        content_type: "application/pdf",
        bytes: b"%PDF-1.4 client",
    }];

    let response = router
        .oneshot(multipart_request("/upload?id=%2F", &parts))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_text_body(response).await, "No ID provided.");
    assert_eq!(file_count(&root.join("responses")).await, 0);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let root = scratch_dir("upload-nofile");
    let router = licence_router(build_service(&root, true), MAX_UPLOAD);
    let parts = vec![Part::Text("note", "no attachment")];

    let response = router
        .oneshot(multipart_request("/upload?id=42", &parts))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_text_body(response).await, "No file uploaded.");
}

#[tokio::test]
async fn oversized_upload_is_not_stored() {
    let root = scratch_dir("upload-large");
    let router = licence_router(build_service(&root, true), 64);
    let large = vec![b'x'; 4096];
    let parts = vec![Part::File {
        field: "file",
        file_name: "big.bin",
        content_type: "application/octet-stream",
        bytes: &large,
    }];

    let response = router
        .oneshot(multipart_request("/upload?id=7", &parts))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(file_count(&root.join("responses")).await, 0);
}
