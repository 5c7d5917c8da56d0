//! `/auth` and `/auth/refresh` round trips against a mock Connect server.

use connect_auth::{AuthError, CredentialProvider, SecretString, SignatureCredentials};
use connect_http::{HttpClient, HttpClientBuilder, HttpClientConfig};
use httpmock::prelude::*;
use serde_json::json;

fn test_client() -> HttpClient {
    HttpClientBuilder::with_config(HttpClientConfig::for_testing())
        .build()
        .unwrap()
}

fn credentials(server: &MockServer) -> SignatureCredentials {
    SignatureCredentials::with_client(
        test_client(),
        format!("{}/", server.base_url()),
        "fake_key",
        SecretString::new("fake_secret"),
    )
}

fn token_body(access: &str, access_exp: &str, refresh: &str, refresh_exp: &str) -> serde_json::Value {
    json!({
        "data": {
            "type": "tokens",
            "attributes": {
                "access_token": {"token": access, "expires_at": access_exp},
                "refresh_token": {"token": refresh, "expires_at": refresh_exp}
            }
        }
    })
}

#[tokio::test]
async fn valid_token_is_fetched_once() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST)
            .path("/auth")
            .header("content-type", "application/json")
            .body_includes(r#""api_key":"fake_key""#)
            .body_includes(r#""signature":""#)
            .body_includes(r#""timestamp":"#);
        then.status(200).json_body(token_body(
            "access-1",
            "2999-01-01 00:00:00",
            "refresh-1",
            "2999-01-01 00:00:00",
        ));
    });

    let creds = credentials(&server);
    let first = creds.get_valid_token().await.unwrap();
    let second = creds.get_valid_token().await.unwrap();

    assert_eq!(first.expose(), "access-1");
    assert_eq!(second.expose(), "access-1");
    auth.assert_calls(1);
}

#[tokio::test]
async fn expired_tokens_refreshed_once() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST).path("/auth");
        then.status(200).json_body(token_body(
            "access-1",
            "2000-01-01T00:00:00Z",
            "refresh-1",
            "2000-01-01T00:00:00Z",
        ));
    });
    let refresh = server.mock(|when, then| {
        when.method(POST)
            .path("/auth/refresh")
            .json_body(json!({"data": {"refresh_token": "refresh-1"}}));
        then.status(200).json_body(token_body(
            "access-2",
            "2999-01-01T00:00:00Z",
            "refresh-2",
            "2999-01-01T00:00:00Z",
        ));
    });

    let creds = credentials(&server);
    assert_eq!(creds.get_valid_token().await.unwrap().expose(), "access-1");
    assert_eq!(creds.get_valid_token().await.unwrap().expose(), "access-2");
    assert_eq!(creds.get_valid_token().await.unwrap().expose(), "access-2");

    auth.assert_calls(1);
    refresh.assert_calls(1);
}

#[tokio::test]
async fn concurrent_callers_share_one_acquisition() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST).path("/auth");
        then.status(200).json_body(token_body(
            "access-1",
            "2999-01-01T00:00:00Z",
            "refresh-1",
            "2999-01-01T00:00:00Z",
        ));
    });

    let creds = std::sync::Arc::new(credentials(&server));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let creds = creds.clone();
            tokio::spawn(async move { creds.get_valid_token().await.unwrap() })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().expose(), "access-1");
    }

    auth.assert_calls(1);
}

#[tokio::test]
async fn missing_refresh_token_is_reported() {
    let server = MockServer::start();
    let _auth = server.mock(|when, then| {
        when.method(POST).path("/auth");
        then.status(200).json_body(json!({
            "data": {"attributes": {
                "access_token": {"token": "a", "expires_at": "2999-01-01T00:00:00Z"}
            }}
        }));
    });

    let err = credentials(&server).get_valid_token().await.unwrap_err();
    assert!(matches!(err, AuthError::MissingToken("refresh_token")));
    assert_eq!(err.to_string(), "refresh_token not found");
}

#[tokio::test]
async fn rejected_signature_is_http_error() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST).path("/auth");
        then.status(401)
            .json_body(json!({"errors": [{"status": "401", "title": "Invalid signature"}]}));
    });

    let err = credentials(&server).get_valid_token().await.unwrap_err();
    assert!(
        matches!(err, AuthError::Http(ref msg) if msg.contains("401")),
        "unexpected error: {err}"
    );
    auth.assert_calls(1);
}
