#![allow(dead_code)]

use async_trait::async_trait;
use httpmock::MockServer;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vacasa_connect::{
    AuthError, CredentialProvider, HttpClientConfig, SecretString, VacasaConnect,
};

/// Hands out a fixed token and counts how often it was asked.
#[derive(Default)]
pub struct StaticToken {
    calls: AtomicUsize,
}

impl StaticToken {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn get_valid_token(&self) -> Result<SecretString, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SecretString::from("test-token"))
    }
}

/// Client pointed at `server` with retries disabled.
pub fn connect(server: &MockServer) -> (VacasaConnect, Arc<StaticToken>) {
    connect_with(server, HttpClientConfig::for_testing())
}

pub fn connect_with(
    server: &MockServer,
    config: HttpClientConfig,
) -> (VacasaConnect, Arc<StaticToken>) {
    let token = Arc::new(StaticToken::default());
    let client = VacasaConnect::builder(token.clone())
        .endpoint(format!("{}/", server.base_url()))
        .http_config(config)
        .allow_insecure_http()
        .build()
        .unwrap();
    (client, token)
}
