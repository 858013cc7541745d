use std::time::Duration;

use async_trait::async_trait;
use pestpro_core::config::ApiConfig;
use pestpro_core::import::{
    BulkUploadResponse, CustomerBatchGateway, GatewayError, ValidatedBatch,
};
use pestpro_core::SessionUser;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("no user is registered with email `{0}`")]
    UnknownUser(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// REST backend client for the endpoints the CLI depends on.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    bulk_upload_path: String,
    login_path: String,
    auth_token: Option<SecretString>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    user: SessionUser,
}

impl HttpBackend {
    pub fn from_config(config: &ApiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bulk_upload_path: config.bulk_upload_path.clone(),
            login_path: config.login_path.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    pub async fn login(&self, email: &str) -> Result<SessionUser, LoginError> {
        let url = self.url(&self.login_path);
        let response = self
            .authorize(self.client.post(&url))
            .json(&LoginRequest { email })
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LoginError::UnknownUser(email.to_string()));
        }
        let response = ensure_success(response).await?;
        let body: LoginResponse =
            response.json().await.map_err(|error| GatewayError::Decode(error.to_string()))?;

        debug!(event_name = "api.login.succeeded", email = %body.user.email, "login accepted");
        Ok(body.user)
    }

    /// Returns the status of a plain GET against the users listing. Any HTTP
    /// answer means the backend is reachable.
    pub async fn probe(&self) -> Result<u16, GatewayError> {
        let response = self
            .authorize(self.client.get(self.url("/api/users")))
            .send()
            .await
            .map_err(transport_error)?;
        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl CustomerBatchGateway for HttpBackend {
    async fn bulk_upload(
        &self,
        batch: &ValidatedBatch,
    ) -> Result<BulkUploadResponse, GatewayError> {
        let url = self.url(&self.bulk_upload_path);
        debug!(
            event_name = "api.bulk_upload.sending",
            url = %url,
            batch_size = batch.len(),
            "posting customer batch"
        );

        let response = self
            .authorize(self.client.post(&url))
            .json(batch)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;

        response.json::<BulkUploadResponse>().await.map_err(|error| {
            error!(
                event_name = "api.bulk_upload.decode_failed",
                error = %error,
                "bulk upload response could not be decoded"
            );
            GatewayError::Decode(error.to_string())
        })
    }
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    GatewayError::Transport(error.to_string())
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}
