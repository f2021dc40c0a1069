//! Integration tests for the metadata client using wiremock

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prepatch_rs::imds::Imds;
use prepatch_rs::PrepatchError;

/// Token-authenticated lookup (IMDSv2)
#[tokio::test]
async fn fetch_uses_imdsv2_token_when_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .and(header("X-aws-ec2-metadata-token-ttl-seconds", "300"))
        .respond_with(ResponseTemplate::new(200).set_body_string("test-token-12345"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/latest/meta-data/instance-id"))
        .and(header("X-aws-ec2-metadata-token", "test-token-12345"))
        .respond_with(ResponseTemplate::new(200).set_body_string("i-1234567890abcdef0"))
        .mount(&mock_server)
        .await;

    let imds = Imds::with_base_url(mock_server.uri());
    let value = imds.fetch("instance-id").await;
    assert_eq!(value.as_deref(), Some("i-1234567890abcdef0"));
}

/// IMDSv1 fallback when the token endpoint is disabled
#[tokio::test]
async fn fetch_falls_back_to_imdsv1() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/latest/meta-data/instance-id"))
        .respond_with(ResponseTemplate::new(200).set_body_string("i-imdsv1instance"))
        .mount(&mock_server)
        .await;

    let imds = Imds::with_base_url(mock_server.uri());
    let value = imds.fetch("instance-id").await;
    assert_eq!(value.as_deref(), Some("i-imdsv1instance"));
}

/// Total failure yields no value rather than an error
#[tokio::test]
async fn fetch_returns_none_when_both_protocols_fail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/latest/meta-data/instance-id"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let imds = Imds::with_base_url(mock_server.uri());
    assert!(imds.fetch("instance-id").await.is_none());
}

/// Full identity resolution from id and region paths
#[tokio::test]
async fn resolve_identity_reads_id_and_region() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("token"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/latest/meta-data/instance-id"))
        .and(header("X-aws-ec2-metadata-token", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("i-1234567890abcdef0"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/latest/meta-data/placement/region"))
        .and(header("X-aws-ec2-metadata-token", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("us-east-1"))
        .mount(&mock_server)
        .await;

    let imds = Imds::with_base_url(mock_server.uri());
    let identity = imds.resolve_identity().await.unwrap();
    assert_eq!(identity.instance_id, "i-1234567890abcdef0");
    assert_eq!(identity.region, "us-east-1");
}

/// Identity resolution is fatal when the endpoint is unreachable
#[tokio::test]
async fn resolve_identity_fails_without_metadata() {
    let mock_server = MockServer::start().await;

    let imds = Imds::with_base_url(mock_server.uri());
    let result = imds.resolve_identity().await;
    assert!(matches!(result, Err(PrepatchError::Metadata(_))));
}
