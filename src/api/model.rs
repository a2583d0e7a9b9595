use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ClientError;
use crate::model::{
    ExtractionConfidence, ExtractionMethod, FileType, GuideResult, Plan, UploadItem, UsageState,
};
use crate::session::UserProfile;

/// Raw bodies shorter than this are not a guide.
pub const MIN_RAW_HTML_LEN: usize = 50;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub text_length: u64,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub extraction_method: Option<ExtractionMethod>,
    #[serde(default)]
    pub extraction_confidence: Option<ExtractionConfidence>,
    #[serde(default)]
    pub character_names: Vec<String>,
    #[serde(default)]
    pub preview: String,
}

impl UploadResponse {
    /// A body flagged `success: false`, or one without a server-issued id, is a
    /// failed upload.
    pub fn into_item(
        self,
        local_filename: &str,
        file_type: FileType,
    ) -> Result<UploadItem, ClientError> {
        if self.success == Some(false) {
            let message = ErrorBody {
                error: self.error,
                message: self.message,
            }
            .text()
            .unwrap_or_else(|| format!("Upload of {local_filename} failed"));
            return Err(ClientError::Server {
                status: 200,
                message,
            });
        }
        let upload_id = self
            .upload_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ClientError::MissingUploadId)?;
        Ok(UploadItem {
            upload_id,
            filename: self
                .filename
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| local_filename.to_string()),
            text_length: self.text_length,
            word_count: self.word_count,
            extraction_method: self.extraction_method.unwrap_or(ExtractionMethod::Basic),
            extraction_confidence: self
                .extraction_confidence
                .unwrap_or(ExtractionConfidence::Medium),
            character_names: self
                .character_names
                .into_iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
            preview: self.preview,
            file_type,
        })
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn text(self) -> Option<String> {
        self.error
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuideEnvelope {
    #[serde(default)]
    pub guide_content: Option<String>,
    #[serde(default)]
    pub child_guide_requested: bool,
    #[serde(default)]
    pub child_guide_completed: bool,
    #[serde(default)]
    pub child_guide_content: Option<String>,
}

/// The backend answers either with a JSON envelope or the document itself.
#[derive(Debug, PartialEq, Eq)]
pub enum GenerateResponse {
    Envelope(GuideEnvelope),
    RawHtml(String),
}

impl GenerateResponse {
    /// Decide the variant from the response content type.
    pub fn parse(content_type: Option<&str>, body: String) -> Result<Self, ClientError> {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);
        if is_json {
            let envelope: GuideEnvelope = serde_json::from_str(&body)
                .map_err(|e| ClientError::Contract(format!("invalid guide JSON: {e}")))?;
            Ok(GenerateResponse::Envelope(envelope))
        } else {
            Ok(GenerateResponse::RawHtml(body))
        }
    }

    /// Normalize to the single internal shape.
    pub fn into_result(self) -> Result<GuideResult, ClientError> {
        match self {
            GenerateResponse::Envelope(env) => {
                let guide_content = env
                    .guide_content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(ClientError::NoContent)?;
                Ok(GuideResult {
                    guide_content,
                    child_guide_requested: env.child_guide_requested,
                    child_guide_completed: env.child_guide_completed,
                    child_guide_content: env
                        .child_guide_content
                        .filter(|c| !c.trim().is_empty()),
                })
            }
            GenerateResponse::RawHtml(html) => {
                if html.trim().len() < MIN_RAW_HTML_LEN {
                    return Err(ClientError::NoContent);
                }
                Ok(GuideResult {
                    guide_content: html,
                    child_guide_requested: false,
                    child_guide_completed: false,
                    child_guide_content: None,
                })
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUser {
    pub subscription: Plan,
    #[serde(default)]
    pub guides_used: u32,
    #[serde(default)]
    pub guides_limit: Option<u32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSubscription {
    #[serde(default)]
    pub renews_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DashboardResponse {
    pub user: DashboardUser,
    #[serde(default)]
    pub subscription: Option<DashboardSubscription>,
}

impl DashboardResponse {
    pub fn into_usage(self) -> UsageState {
        // Unlimited plans carry no limit regardless of what the column says.
        let limit = match self.user.subscription {
            Plan::Unlimited => None,
            _ => self.user.guides_limit,
        };
        UsageState {
            plan: self.user.subscription,
            used: self.user.guides_used,
            limit,
            renews_at: self.subscription.and_then(|s| s.renews_at),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct RedeemResponse {
    pub message: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}
