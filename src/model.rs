use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Sides,
    FullScript,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Sides => "sides",
            FileType::FullScript => "full_script",
        }
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sides" => Ok(FileType::Sides),
            "full_script" | "full-script" => Ok(FileType::FullScript),
            other => Err(format!("unknown file type '{}'", other)),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Basic,
    Premium,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Basic => "basic",
            ExtractionMethod::Premium => "premium",
        }
    }
}

/// Ordered from worst to best.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionConfidence {
    Low,
    Medium,
    High,
}

impl ExtractionConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionConfidence::Low => "low",
            ExtractionConfidence::Medium => "medium",
            ExtractionConfidence::High => "high",
        }
    }
}

/// A file the user picked, before validation.
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl CandidateFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, deriving its MIME type from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(ClientError::Invalid("invalid file name"))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            filename,
            content_type: content_type_for(path).to_string(),
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case(PDF_MIME)
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "pdf" => PDF_MIME,
        Some(ext) if ext == "txt" => "text/plain",
        Some(ext) if ext == "doc" => "application/msword",
        Some(ext) if ext == "docx" => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

/// Result of extracting one uploaded file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub upload_id: String,
    pub filename: String,
    pub text_length: u64,
    pub word_count: u64,
    pub extraction_method: ExtractionMethod,
    pub extraction_confidence: ExtractionConfidence,
    pub character_names: BTreeSet<String>,
    pub preview: String,
    pub file_type: FileType,
}

/// Aggregate over every file of one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    pub upload_ids: Vec<String>,
    pub filenames: Vec<String>,
    pub total_text_length: u64,
    pub total_word_count: u64,
    pub character_names: BTreeSet<String>,
    pub combined_preview: String,
    pub file_count: usize,
    pub file_types: Vec<FileType>,
    /// Taken from the first file.
    pub extraction_method: ExtractionMethod,
    /// Taken from the first file.
    pub extraction_confidence: ExtractionConfidence,
    lowest_confidence: ExtractionConfidence,
}

impl UploadBatch {
    /// Reduce per-file results into one batch. `None` when `items` is empty.
    pub fn aggregate(items: &[UploadItem]) -> Option<Self> {
        let first = items.first()?;
        let mut batch = UploadBatch {
            upload_ids: Vec::with_capacity(items.len()),
            filenames: Vec::with_capacity(items.len()),
            total_text_length: 0,
            total_word_count: 0,
            character_names: BTreeSet::new(),
            combined_preview: String::new(),
            file_count: 0,
            file_types: Vec::with_capacity(items.len()),
            extraction_method: first.extraction_method,
            extraction_confidence: first.extraction_confidence,
            lowest_confidence: first.extraction_confidence,
        };
        for (i, item) in items.iter().enumerate() {
            batch.upload_ids.push(item.upload_id.clone());
            batch.filenames.push(item.filename.clone());
            batch.total_text_length += item.text_length;
            batch.total_word_count += item.word_count;
            batch
                .character_names
                .extend(item.character_names.iter().cloned());
            if i > 0 {
                batch.combined_preview.push_str("\n\n");
            }
            batch.combined_preview.push_str(&item.preview);
            batch.file_types.push(item.file_type);
            batch.lowest_confidence = batch.lowest_confidence.min(item.extraction_confidence);
            batch.file_count += 1;
        }
        Some(batch)
    }

    /// Id sent as the legacy single `uploadId`.
    pub fn primary_upload_id(&self) -> &str {
        self.upload_ids.first().map(String::as_str).unwrap_or_default()
    }

    /// Worst confidence across every file in the batch.
    pub fn lowest_confidence(&self) -> ExtractionConfidence {
        self.lowest_confidence
    }
}

/// What the user typed into the guide form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuideForm {
    pub character_name: String,
    pub production_title: String,
    pub production_type: String,
    pub role_size: String,
    pub genre: String,
    pub storyline: Option<String>,
    pub character_breakdown: Option<String>,
    pub callback_notes: Option<String>,
    pub focus_area: Option<String>,
    pub child_guide_requested: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuideRequest {
    pub upload_id: String,
    pub upload_ids: Vec<String>,
    pub character_name: String,
    pub production_title: String,
    pub production_type: String,
    pub role_size: String,
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storyline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_breakdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<String>,
    pub child_guide_requested: bool,
}

impl GuideRequest {
    /// Build the request, rejecting it before any network call when the batch
    /// is missing or a required field is blank.
    pub fn new(batch: Option<&UploadBatch>, form: &GuideForm) -> Result<Self, ClientError> {
        let batch = batch
            .filter(|b| !b.upload_ids.is_empty())
            .ok_or(ClientError::NoUpload)?;
        let required = [
            ("characterName", &form.character_name),
            ("productionTitle", &form.production_title),
            ("productionType", &form.production_type),
            ("roleSize", &form.role_size),
            ("genre", &form.genre),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ClientError::MissingField(name));
            }
        }
        Ok(Self {
            upload_id: batch.primary_upload_id().to_string(),
            upload_ids: batch.upload_ids.clone(),
            character_name: form.character_name.trim().to_string(),
            production_title: form.production_title.trim().to_string(),
            production_type: form.production_type.trim().to_string(),
            role_size: form.role_size.trim().to_string(),
            genre: form.genre.trim().to_string(),
            storyline: non_blank(&form.storyline),
            character_breakdown: non_blank(&form.character_breakdown),
            callback_notes: non_blank(&form.callback_notes),
            focus_area: non_blank(&form.focus_area),
            child_guide_requested: form.child_guide_requested,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalized generation outcome; never retained past delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideResult {
    pub guide_content: String,
    pub child_guide_requested: bool,
    pub child_guide_completed: bool,
    pub child_guide_content: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Basic,
    Premium,
    Starter,
    Alacarte,
    Unlimited,
}

impl Plan {
    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Basic => "Basic",
            Plan::Premium => "Premium",
            Plan::Starter => "Starter",
            Plan::Alacarte => "À la carte",
            Plan::Unlimited => "Unlimited",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageState {
    pub plan: Plan,
    pub used: u32,
    /// `None` means unlimited.
    pub limit: Option<u32>,
    pub renews_at: Option<DateTime<Utc>>,
}
