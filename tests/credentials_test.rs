use serde_json::json;
use story_memory_node::credentials::CredentialStatus;
use story_memory_node::{
    Error, HttpClientConfig, StoryMemoryApi, StoryMemoryClient, StoryMemoryCredentials,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> StoryMemoryClient {
    StoryMemoryClient::new(&HttpClientConfig::default()).unwrap()
}

#[tokio::test]
async fn test_healthy_credential_passes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("authorization", "Bearer valid-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = StoryMemoryCredentials::new("valid-key", server.uri()).unwrap();
    let result = StoryMemoryApi.test(&client(), &credentials).await;

    assert!(result.is_valid(), "{:?}", result.status);
    assert_eq!(result.details["url"], format!("{}/health", server.uri()));
    assert!(result.into_result().is_ok());
}

#[tokio::test]
async fn test_degraded_status_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "degraded"})))
        .mount(&server)
        .await;

    let credentials = StoryMemoryCredentials::new("key", server.uri()).unwrap();
    let result = StoryMemoryApi.test(&client(), &credentials).await;

    match &result.status {
        CredentialStatus::Invalid { reason } => assert!(reason.contains("degraded"), "{reason}"),
        CredentialStatus::Valid => panic!("degraded service must not validate"),
    }
    assert!(matches!(result.into_result(), Err(Error::CredentialTest(_))));
}

#[tokio::test]
async fn test_non_success_status_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;

    let credentials = StoryMemoryCredentials::new("key", server.uri()).unwrap();
    let result = StoryMemoryApi.test(&client(), &credentials).await;
    assert!(!result.is_valid());
}

#[tokio::test]
async fn test_unreachable_api_fails() {
    // nothing listens on the discard port
    let credentials = StoryMemoryCredentials::new("key", "http://127.0.0.1:9").unwrap();
    let result = StoryMemoryApi.test(&client(), &credentials).await;
    assert!(!result.is_valid());
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    use story_memory_node::RequestHelper;

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/children/1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid API key"})))
        .mount(&server)
        .await;

    let credentials = StoryMemoryCredentials::new("wrong", server.uri()).unwrap();
    let err = client()
        .get_json(&format!("{}/children/1", server.uri()), &credentials)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed(ref message) if message == "Invalid API key"));
}
