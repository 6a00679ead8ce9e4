use std::time::{Duration, Instant};

use wiremock::http::Method;
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn pool(max_connections: usize, pending_acquire_timeout: Duration) -> ReqwestClient {
    ReqwestClient::from_config(&PoolConfig {
        max_connections,
        pending_acquire_timeout,
        request_timeout: None,
    })
    .unwrap()
}

#[test]
fn test_pool_config_defaults() {
    let config = PoolConfig::default();
    assert_eq!(config.max_connections, 40);
    assert_eq!(config.pending_acquire_timeout, Duration::from_secs(600));
    assert_eq!(config.request_timeout, None);
}

#[tokio::test]
async fn test_send_multipart_form_with_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method(Method::POST))
        .and(path("/sign"))
        .and(header("X-SIGNBOX-TRANSACTION-ID", "corr-1"))
        .and(header_regex("content-type", "^multipart/form-data; boundary=.+"))
        .and(body_string_contains(
            r#"name="file"; filename="corr-1""#,
        ))
        .and(body_string_contains("application/octet-stream"))
        .and(body_string_contains("document-bytes"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-SIGNBOX-TRANSACTION-ID", "corr-1")
                .set_body_bytes(b"signed".to_vec()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = pool(2, Duration::from_secs(5));
    let form = MultipartForm::default()
        .file(
            "file",
            "corr-1",
            "application/octet-stream",
            b"document-bytes".to_vec(),
        )
        .text("level", "BES");

    let response = client
        .post(&format!("{}/sign", mock_server.uri()))
        .header("X-SIGNBOX-TRANSACTION-ID", "corr-1")
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"signed");
    assert_eq!(
        response.header_get("x-signbox-transaction-id").map(String::as_str),
        Some("corr-1")
    );
    assert_eq!(client.available_connections(), 2);
}

#[tokio::test]
async fn test_non_ascii_response_header_is_kept_lossily() {
    let mock_server = MockServer::start().await;

    Mock::given(method(Method::POST))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "X-Server-Note",
                    reqwest::header::HeaderValue::from_bytes(b"caf\xe9").unwrap(),
                )
                .set_body_bytes(b"signed".to_vec()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = pool(1, Duration::from_secs(5));
    let response = client.post(&mock_server.uri()).send().await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"signed");
    assert_eq!(
        response.header_get("x-server-note").map(String::as_str),
        Some("caf\u{fffd}")
    );
}

#[tokio::test]
async fn test_connection_refused_is_io_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = pool(1, Duration::from_secs(5));
    let error = client
        .post(&format!("http://127.0.0.1:{port}/sign"))
        .send()
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Io(_)), "{error:?}");
    assert!(error.is_transient());
}

#[tokio::test]
async fn test_invalid_url_is_not_transient() {
    let client = pool(1, Duration::from_secs(5));
    let error = client.post("").send().await.unwrap_err();

    assert!(matches!(error, Error::HttpError(_)), "{error:?}");
    assert!(!error.is_transient());
}

#[tokio::test]
async fn test_invalid_header_value() {
    let client = pool(1, Duration::from_secs(5));
    let error = client
        .post("http://127.0.0.1:1/sign")
        .header("X-SIGNBOX-EASYSIGN", "line\nbreak")
        .send()
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Other(_)), "{error:?}");
}

#[tokio::test]
async fn test_request_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method(Method::POST))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let client = ReqwestClient::from_config(&PoolConfig {
        max_connections: 1,
        pending_acquire_timeout: Duration::from_secs(5),
        request_timeout: Some(Duration::from_millis(200)),
    })
    .unwrap();

    let error = client.post(&mock_server.uri()).send().await.unwrap_err();

    assert!(matches!(error, Error::Timeout(_)), "{error:?}");
    assert_eq!(client.available_connections(), 1);
}

#[tokio::test]
async fn test_requests_beyond_limit_are_queued() {
    let mock_server = MockServer::start().await;
    Mock::given(method(Method::POST))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .expect(6)
        .mount(&mock_server)
        .await;

    let client = pool(2, Duration::from_secs(30));
    let url = mock_server.uri();

    let started = Instant::now();
    let responses =
        futures::future::join_all((0..6).map(|_| client.post(&url).send())).await;

    assert!(responses.iter().all(|r| r.as_ref().is_ok_and(|r| r.status.is_success())));
    // three waves of two requests
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(client.available_connections(), 2);
}

#[tokio::test]
async fn test_pending_acquire_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method(Method::POST))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1000)))
        .mount(&mock_server)
        .await;

    let client = pool(1, Duration::from_millis(100));
    let url = mock_server.uri();

    let (first, second) = tokio::join!(client.post(&url).send(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.post(&url).send().await
    });

    assert!(first.is_ok());
    let error = second.unwrap_err();
    assert!(matches!(error, Error::PoolAcquireTimeout(_)), "{error:?}");
    assert!(error.is_transient());
}

#[tokio::test]
async fn test_dropped_request_releases_connection() {
    let mock_server = MockServer::start().await;
    Mock::given(method(Method::POST))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let client = pool(1, Duration::from_secs(5));
    let url = mock_server.uri();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), client.post(&url).send()).await;
    assert!(abandoned.is_err());
    assert_eq!(client.available_connections(), 1);
}
