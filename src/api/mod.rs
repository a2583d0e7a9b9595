use std::fmt;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::admin::{AdminTab, PageQuery};
use crate::config::Config;
use crate::error::ClientError;
use crate::model::{CandidateFile, FileType, GuideRequest, UploadItem};
use crate::session::Session;

pub mod model;

pub use model::{
    AuthResponse, DashboardResponse, GenerateResponse, GuideEnvelope, RedeemResponse,
    UploadResponse,
};

use model::ErrorBody;

/// Everything the coordinators need from the backend.
#[async_trait]
pub trait PrepApi: Send + Sync {
    async fn upload(
        &self,
        session: &Session,
        file: &CandidateFile,
        file_type: FileType,
    ) -> Result<UploadItem, ClientError>;

    async fn generate(
        &self,
        session: &Session,
        request: &GuideRequest,
    ) -> Result<GenerateResponse, ClientError>;

    async fn dashboard(&self, session: &Session) -> Result<DashboardResponse, ClientError>;

    async fn redeem_promo(&self, session: &Session, code: &str) -> Result<String, ClientError>;

    async fn admin_fetch(
        &self,
        session: &Session,
        tab: AdminTab,
        query: &PageQuery,
    ) -> Result<Value, ClientError>;

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError>;

    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn with_base_url(base_url: Url) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("prep101-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ClientError> {
        Self::with_base_url(cfg.api_base_url()?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Contract(format!("invalid API URL for {path}: {e}")))
    }

    /// Build the JSON generation request; no timeout is set here, the caller owns it.
    pub fn build_generate_request(
        &self,
        session: &Session,
        body: &GuideRequest,
    ) -> Result<reqwest::Request, ClientError> {
        let endpoint = self.endpoint("api/guides/generate")?;
        Ok(self
            .http
            .post(endpoint)
            .header(AUTHORIZATION, session.bearer())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .build()?)
    }

    pub fn build_admin_request(
        &self,
        session: &Session,
        tab: AdminTab,
        query: &PageQuery,
    ) -> Result<reqwest::Request, ClientError> {
        let endpoint = self.endpoint(tab.path())?;
        let mut req = self.http.get(endpoint).header(AUTHORIZATION, session.bearer());
        if tab.is_paginated() {
            req = req.query(&query.params());
        }
        Ok(req.build()?)
    }

    async fn send(&self, request: reqwest::Request) -> Result<Response, ClientError> {
        debug!(method = %request.method(), url = %request.url(), "sending API request");
        let res = self.http.execute(request).await?;
        if res.status().is_success() {
            return Ok(res);
        }
        Err(error_from_response(res).await)
    }
}

/// Map a non-2xx response to the error taxonomy.
async fn error_from_response(res: Response) -> ClientError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    warn!(%status, "API request failed");
    error_for_status(status, &body)
}

/// A 403 keeps the server's wording here; only admin calls turn it into
/// [`ClientError::Forbidden`].
fn error_for_status(status: StatusCode, body: &str) -> ClientError {
    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        _ => ClientError::Server {
            status: status.as_u16(),
            message: error_message(status, body),
        },
    }
}

fn admin_denied(err: ClientError) -> ClientError {
    match err {
        ClientError::Server { status: 403, .. } => ClientError::Forbidden,
        other => other,
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Some(text) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::text)
    {
        return text;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}

#[async_trait]
impl PrepApi for ApiClient {
    async fn upload(
        &self,
        session: &Session,
        file: &CandidateFile,
        file_type: FileType,
    ) -> Result<UploadItem, ClientError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("fileType", file_type.as_str());
        let request = self
            .http
            .post(self.endpoint("api/upload")?)
            .header(AUTHORIZATION, session.bearer())
            .multipart(form)
            .build()?;
        let payload: UploadResponse = self.send(request).await?.json().await?;
        payload.into_item(&file.filename, file_type)
    }

    async fn generate(
        &self,
        session: &Session,
        request: &GuideRequest,
    ) -> Result<GenerateResponse, ClientError> {
        let request = self.build_generate_request(session, request)?;
        let res = self.send(request).await?;
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        let body = res.text().await?;
        GenerateResponse::parse(content_type.as_deref(), body)
    }

    async fn dashboard(&self, session: &Session) -> Result<DashboardResponse, ClientError> {
        let request = self
            .http
            .get(self.endpoint("api/auth/dashboard")?)
            .header(AUTHORIZATION, session.bearer())
            .build()?;
        Ok(self.send(request).await?.json().await?)
    }

    async fn redeem_promo(&self, session: &Session, code: &str) -> Result<String, ClientError> {
        let request = self
            .http
            .post(self.endpoint("api/promo-codes/redeem")?)
            .header(AUTHORIZATION, session.bearer())
            .json(&json!({ "code": code }))
            .build()?;
        let payload: RedeemResponse = self.send(request).await?.json().await?;
        Ok(payload.message)
    }

    async fn admin_fetch(
        &self,
        session: &Session,
        tab: AdminTab,
        query: &PageQuery,
    ) -> Result<Value, ClientError> {
        let request = self.build_admin_request(session, tab, query)?;
        let res = self.send(request).await.map_err(admin_denied)?;
        Ok(res.json().await?)
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let request = self
            .http
            .post(self.endpoint("api/auth/login")?)
            .json(&json!({ "email": email, "password": password }))
            .build()?;
        Ok(self.send(request).await?.json().await?)
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let request = self
            .http
            .post(self.endpoint("api/auth/register")?)
            .json(&json!({ "name": name, "email": email, "password": password }))
            .build()?;
        Ok(self.send(request).await?.json().await?)
    }
}
