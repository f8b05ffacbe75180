use batiserver::pdf::{PdfRenderer, RendererError};

#[tokio::test]
async fn failing_health_check_aborts_before_generation() {
    let mut server = mockito::Server::new_async().await;
    let health = server
        .mock("GET", "/health")
        .with_status(500)
        .create_async()
        .await;
    let generate = server
        .mock("POST", "/generate-pdf")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let renderer = PdfRenderer::with_base_url(&server.url());
    let result = renderer.render_guarded("<html></html>").await;

    assert!(matches!(result, Err(RendererError::Unavailable)));
    health.assert_async().await;
    generate.assert_async().await;
}

#[tokio::test]
async fn unreachable_renderer_reports_unavailable() {
    // Nothing listens on this port.
    let renderer = PdfRenderer::with_base_url("http://127.0.0.1:1");
    let result = renderer.render_guarded("<html></html>").await;
    assert!(matches!(result, Err(RendererError::Unavailable)));
}

#[tokio::test]
async fn healthy_renderer_returns_pdf_bytes() {
    let mut server = mockito::Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(200)
        .create_async()
        .await;
    let generate = server
        .mock("POST", "/generate-pdf")
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .with_body(b"%PDF-1.4 fake")
        .create_async()
        .await;

    let renderer = PdfRenderer::with_base_url(&server.url());
    let bytes = renderer.render_guarded("<html></html>").await.unwrap();

    assert!(bytes.starts_with(b"%PDF"));
    generate.assert_async().await;
}

#[tokio::test]
async fn generation_error_is_surfaced_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(200)
        .create_async()
        .await;
    let generate = server
        .mock("POST", "/generate-pdf")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let renderer = PdfRenderer::with_base_url(&server.url());
    let result = renderer.render_guarded("<html></html>").await;

    assert!(matches!(result, Err(RendererError::Failed { status: 500 })));
    generate.assert_async().await;
}
