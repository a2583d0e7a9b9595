//! Materializing generated guides and handing them to a viewer.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ClientError;

/// Reused for every child guide so repeated opens replace the same document.
pub const CHILD_GUIDE_CONTEXT: &str = "prep101-child-guide";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTarget {
    /// A fresh context per open.
    NewContext,
    /// A named context; opening the same name again replaces its content.
    Named(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedDocument {
    pub path: PathBuf,
}

#[async_trait]
pub trait DocumentOpener: Send + Sync {
    /// `Ok(None)` means the viewer refused the document (a blocked popup).
    async fn open(
        &self,
        html: &str,
        target: OpenTarget,
    ) -> Result<Option<OpenedDocument>, ClientError>;
}

/// Writes each guide to `output_dir` and optionally launches the system viewer.
#[derive(Debug, Clone)]
pub struct FileDocumentOpener {
    output_dir: PathBuf,
    launch_viewer: bool,
}

impl FileDocumentOpener {
    pub fn new(output_dir: impl Into<PathBuf>, launch_viewer: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            launch_viewer,
        }
    }

    pub fn path_for(&self, target: OpenTarget) -> PathBuf {
        match target {
            OpenTarget::NewContext => self
                .output_dir
                .join(format!("guide-{}.html", Uuid::new_v4())),
            OpenTarget::Named(name) => self.output_dir.join(format!("{name}.html")),
        }
    }
}

#[async_trait]
impl DocumentOpener for FileDocumentOpener {
    async fn open(
        &self,
        html: &str,
        target: OpenTarget,
    ) -> Result<Option<OpenedDocument>, ClientError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.path_for(target);
        tokio::fs::write(&path, html).await?;
        info!(path = %path.display(), "guide written");

        if self.launch_viewer && !launch_viewer(&path).await {
            return Ok(None);
        }
        Ok(Some(OpenedDocument { path }))
    }
}

async fn launch_viewer(path: &Path) -> bool {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    match cmd.arg(path.as_os_str()).kill_on_drop(true).status().await {
        Ok(s) if s.success() => true,
        Ok(s) => {
            warn!(status = %s, path = %path.display(), "viewer refused guide");
            false
        }
        Err(err) => {
            warn!(?err, path = %path.display(), "viewer unavailable");
            false
        }
    }
}
