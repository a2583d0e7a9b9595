#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prep101_client::admin::{AdminTab, PageQuery};
use prep101_client::api::{AuthResponse, DashboardResponse, GenerateResponse, PrepApi};
use prep101_client::delivery::{DocumentOpener, OpenTarget, OpenedDocument};
use prep101_client::model::{
    CandidateFile, ExtractionConfidence, ExtractionMethod, FileType, GuideRequest, UploadItem,
    PDF_MIME,
};
use prep101_client::notify::{Notice, Notifier};
use prep101_client::session::{Session, UserProfile};
use prep101_client::ClientError;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub fn session() -> Session {
    Session::new(
        "test-token",
        Some(UserProfile {
            id: "user-1".into(),
            email: "actor@example.com".into(),
            name: Some("Sam".into()),
            subscription: None,
            is_admin: false,
        }),
    )
}

pub fn pdf(name: &str, size: usize) -> CandidateFile {
    CandidateFile::new(name, PDF_MIME, vec![b'%'; size])
}

pub fn item(id: &str, filename: &str, words: u64, names: &[&str]) -> UploadItem {
    UploadItem {
        upload_id: id.into(),
        filename: filename.into(),
        text_length: words * 6,
        word_count: words,
        extraction_method: ExtractionMethod::Basic,
        extraction_confidence: ExtractionConfidence::High,
        character_names: names.iter().map(|n| n.to_string()).collect(),
        preview: format!("{filename} preview"),
        file_type: FileType::Sides,
    }
}

pub fn dashboard(plan: &str, used: u32, limit: Option<u32>) -> DashboardResponse {
    serde_json::from_value(serde_json::json!({
        "user": { "subscription": plan, "guidesUsed": used, "guidesLimit": limit },
        "subscription": { "renewsAt": "2026-11-01T00:00:00Z" }
    }))
    .unwrap()
}

#[derive(Debug, Clone)]
pub struct UploadCall {
    pub filename: String,
    pub file_type: FileType,
    pub token: String,
}

/// Records every backend call; responses are queued per endpoint.
#[derive(Clone, Default)]
pub struct RecordingApi {
    pub upload_responses: Arc<Mutex<VecDeque<Result<UploadItem, ClientError>>>>,
    pub generate_responses: Arc<Mutex<VecDeque<Result<GenerateResponse, ClientError>>>>,
    pub dashboard_responses: Arc<Mutex<VecDeque<Result<DashboardResponse, ClientError>>>>,
    pub redeem_responses: Arc<Mutex<VecDeque<Result<String, ClientError>>>>,
    pub admin_responses: Arc<Mutex<VecDeque<Result<Value, ClientError>>>>,
    pub auth_responses: Arc<Mutex<VecDeque<Result<AuthResponse, ClientError>>>>,
    pub upload_delay: Option<Duration>,
    pub generate_delay: Option<Duration>,
    pub upload_calls: Arc<Mutex<Vec<UploadCall>>>,
    pub generate_calls: Arc<Mutex<Vec<GuideRequest>>>,
    pub dashboard_calls: Arc<Mutex<usize>>,
    pub redeem_calls: Arc<Mutex<Vec<String>>>,
    pub admin_calls: Arc<Mutex<Vec<AdminTab>>>,
    pub auth_calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingApi {
    pub async fn push_upload(&self, r: Result<UploadItem, ClientError>) {
        self.upload_responses.lock().await.push_back(r);
    }

    pub async fn push_generate(&self, r: Result<GenerateResponse, ClientError>) {
        self.generate_responses.lock().await.push_back(r);
    }

    pub async fn push_dashboard(&self, r: Result<DashboardResponse, ClientError>) {
        self.dashboard_responses.lock().await.push_back(r);
    }

    pub async fn push_redeem(&self, r: Result<String, ClientError>) {
        self.redeem_responses.lock().await.push_back(r);
    }

    pub async fn push_admin(&self, r: Result<Value, ClientError>) {
        self.admin_responses.lock().await.push_back(r);
    }

    pub async fn push_auth(&self, r: Result<AuthResponse, ClientError>) {
        self.auth_responses.lock().await.push_back(r);
    }

    pub async fn upload_calls(&self) -> Vec<UploadCall> {
        self.upload_calls.lock().await.clone()
    }

    pub async fn generate_calls(&self) -> Vec<GuideRequest> {
        self.generate_calls.lock().await.clone()
    }

    pub async fn dashboard_calls(&self) -> usize {
        *self.dashboard_calls.lock().await
    }

    pub async fn redeem_calls(&self) -> Vec<String> {
        self.redeem_calls.lock().await.clone()
    }

    pub async fn admin_calls(&self) -> Vec<AdminTab> {
        self.admin_calls.lock().await.clone()
    }

    pub async fn auth_calls(&self) -> Vec<String> {
        self.auth_calls.lock().await.clone()
    }
}

fn exhausted<T>() -> Result<T, ClientError> {
    Err(ClientError::Transport("no queued response".into()))
}

#[async_trait]
impl PrepApi for RecordingApi {
    async fn upload(
        &self,
        session: &Session,
        file: &CandidateFile,
        file_type: FileType,
    ) -> Result<UploadItem, ClientError> {
        self.upload_calls.lock().await.push(UploadCall {
            filename: file.filename.clone(),
            file_type,
            token: session.token().to_string(),
        });
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        self.upload_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(exhausted)
    }

    async fn generate(
        &self,
        _session: &Session,
        request: &GuideRequest,
    ) -> Result<GenerateResponse, ClientError> {
        self.generate_calls.lock().await.push(request.clone());
        if let Some(delay) = self.generate_delay {
            tokio::time::sleep(delay).await;
        }
        self.generate_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(exhausted)
    }

    async fn dashboard(&self, _session: &Session) -> Result<DashboardResponse, ClientError> {
        *self.dashboard_calls.lock().await += 1;
        self.dashboard_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(exhausted)
    }

    async fn redeem_promo(&self, _session: &Session, code: &str) -> Result<String, ClientError> {
        self.redeem_calls.lock().await.push(code.to_string());
        self.redeem_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(exhausted)
    }

    async fn admin_fetch(
        &self,
        _session: &Session,
        tab: AdminTab,
        _query: &PageQuery,
    ) -> Result<Value, ClientError> {
        self.admin_calls.lock().await.push(tab);
        self.admin_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(exhausted)
    }

    async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse, ClientError> {
        self.auth_calls.lock().await.push(format!("login:{email}"));
        self.auth_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(exhausted)
    }

    async fn register(
        &self,
        _name: &str,
        email: &str,
        _password: &str,
    ) -> Result<AuthResponse, ClientError> {
        self.auth_calls.lock().await.push(format!("register:{email}"));
        self.auth_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(exhausted)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: std::sync::Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Debug, Clone)]
pub struct OpenCall {
    pub html: String,
    pub target: OpenTarget,
    pub at: Instant,
}

/// Records opens; `blocked` simulates a popup blocker.
#[derive(Default)]
pub struct RecordingOpener {
    pub blocked: bool,
    calls: Mutex<Vec<OpenCall>>,
}

impl RecordingOpener {
    pub fn blocking() -> Self {
        Self {
            blocked: true,
            ..Default::default()
        }
    }

    pub async fn calls(&self) -> Vec<OpenCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl DocumentOpener for RecordingOpener {
    async fn open(
        &self,
        html: &str,
        target: OpenTarget,
    ) -> Result<Option<OpenedDocument>, ClientError> {
        self.calls.lock().await.push(OpenCall {
            html: html.to_string(),
            target,
            at: Instant::now(),
        });
        if self.blocked {
            return Ok(None);
        }
        Ok(Some(OpenedDocument {
            path: format!("/tmp/{}.html", self.calls.lock().await.len()).into(),
        }))
    }
}
