//! HTTP client for the remote order API

use crate::{ClientConfig, ClientError, ClientResult};
use async_trait::async_trait;
use cashier_engine::{OrderApi, RemoteError};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::ApiResponse;
use shared::ErrorCode;
use shared::order::OrderContext;
use shared::order::wire::{
    CheckoutReceipt, CheckoutRequest, CreateLinesRequest, CreateLinesResponse,
    DiscountCodeGrant, RemoteOrderLine, StatusUpdateRequest, TransferRequest, VoidLinesRequest,
};

pub const CREATE_LINES_PATH: &str = "api/orders/lines";
pub const FETCH_ORDER_PATH: &str = "api/orders/current";
pub const UPDATE_STATUS_PATH: &str = "api/orders/lines/status";
pub const VOID_LINES_PATH: &str = "api/orders/lines/void";
pub const TRANSFER_PATH: &str = "api/tables/transfer";
pub const VALIDATE_DISCOUNT_PATH: &str = "api/discount-codes/validate";

/// HTTP client for making requests to the remote order API
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    /// Make a POST request with JSON body, returning the envelope payload
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<Option<T>> {
        let mut request = self.client.post(self.url(path)).json(body);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        tracing::debug!(path, "POST");
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// POST whose payload is required
    async fn post_data<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.post(path, body)
            .await?
            .ok_or_else(|| ClientError::InvalidResponse(format!("Missing data from {}", path)))
    }

    /// POST whose payload is ignored
    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<()> {
        self.post::<serde_json::Value, _>(path, body).await?;
        Ok(())
    }

    /// Unwrap the `ApiResponse` envelope
    ///
    /// A failure envelope wins over the bare HTTP status.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> ClientResult<Option<T>> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
                && let Err(err) = envelope.into_result()
            {
                return Err(ClientError::Api(err));
            }

            tracing::warn!(status = %status, "Remote API request failed");
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(ClientError::Validation(text))
                }
                _ => Err(ClientError::Internal(text)),
            };
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&text)?;
        envelope.into_result().map_err(ClientError::Api)
    }
}

fn no_open_order(err: &ClientError) -> bool {
    match err {
        ClientError::NotFound(_) => true,
        ClientError::Api(app) => matches!(app.code, ErrorCode::OrderNotFound | ErrorCode::NotFound),
        _ => false,
    }
}

#[async_trait]
impl OrderApi for HttpClient {
    async fn create_lines(
        &self,
        req: CreateLinesRequest,
    ) -> Result<CreateLinesResponse, RemoteError> {
        Ok(self.post_data(CREATE_LINES_PATH, &req).await?)
    }

    async fn fetch_order(
        &self,
        context: &OrderContext,
    ) -> Result<Vec<RemoteOrderLine>, RemoteError> {
        match self.post::<Vec<RemoteOrderLine>, _>(FETCH_ORDER_PATH, context).await {
            Ok(lines) => Ok(lines.unwrap_or_default()),
            Err(e) if no_open_order(&e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status(&self, req: StatusUpdateRequest) -> Result<(), RemoteError> {
        Ok(self.post_unit(UPDATE_STATUS_PATH, &req).await?)
    }

    async fn void_lines(&self, req: VoidLinesRequest) -> Result<(), RemoteError> {
        Ok(self.post_unit(VOID_LINES_PATH, &req).await?)
    }

    async fn transfer(&self, req: TransferRequest) -> Result<(), RemoteError> {
        Ok(self.post_unit(TRANSFER_PATH, &req).await?)
    }

    async fn checkout(&self, req: CheckoutRequest) -> Result<CheckoutReceipt, RemoteError> {
        Ok(self.post_data(req.endpoint.path(), &req).await?)
    }

    async fn validate_discount_code(
        &self,
        context: &OrderContext,
        code: &str,
    ) -> Result<DiscountCodeGrant, RemoteError> {
        let body = serde_json::json!({ "context": context, "code": code });
        Ok(self.post_data(VALIDATE_DISCOUNT_PATH, &body).await?)
    }
}
