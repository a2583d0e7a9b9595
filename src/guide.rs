//! One generation request per submit, bounded by a client-side timeout, then
//! delivery of the primary guide and the optional child guide.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::api::PrepApi;
use crate::delivery::{DocumentOpener, OpenTarget, CHILD_GUIDE_CONTEXT};
use crate::error::ClientError;
use crate::model::{CandidateFile, FileType, GuideForm, GuideRequest, GuideResult, UploadBatch};
use crate::notify::{Notice, Notifier};
use crate::session::Session;
use crate::upload::UploadCoordinator;
use crate::usage::UsageGate;

pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_CHILD_GUIDE_DELAY: Duration = Duration::from_secs(1);

/// What was opened for one successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub primary_opened: bool,
    pub child_opened: Option<bool>,
}

/// Clears the in-flight flag however the submit ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ClientError> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::Busy);
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct GuideRequestCoordinator<'a> {
    api: &'a dyn PrepApi,
    opener: &'a dyn DocumentOpener,
    notifier: &'a dyn Notifier,
    timeout: Duration,
    child_delay: Duration,
    in_flight: AtomicBool,
    last_guide: Mutex<Option<String>>,
    last_child_guide: Mutex<Option<String>>,
}

impl<'a> GuideRequestCoordinator<'a> {
    pub fn new(
        api: &'a dyn PrepApi,
        opener: &'a dyn DocumentOpener,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            api,
            opener,
            notifier,
            timeout: DEFAULT_GENERATE_TIMEOUT,
            child_delay: DEFAULT_CHILD_GUIDE_DELAY,
            in_flight: AtomicBool::new(false),
            last_guide: Mutex::new(None),
            last_child_guide: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_child_delay(mut self, delay: Duration) -> Self {
        self.child_delay = delay;
        self
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_guide(&self) -> Option<String> {
        self.last_guide.lock().ok().and_then(|g| g.clone())
    }

    pub fn last_child_guide(&self) -> Option<String> {
        self.last_child_guide.lock().ok().and_then(|g| g.clone())
    }

    /// Validate, generate, count the guide, then deliver it. Every failure is turned
    /// into one notice before it is returned.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        session: &Session,
        batch: Option<&UploadBatch>,
        form: &GuideForm,
        usage: &mut UsageGate,
    ) -> Result<(GuideResult, Delivery), ClientError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        self.submit_inner(session, batch, form, usage)
            .await
            .inspect_err(|err| self.report(err))
    }

    /// Upload `files`, then request a guide from the fresh batch. A spent quota
    /// is refused before the first file goes out.
    pub async fn upload_and_submit(
        &self,
        uploader: &mut UploadCoordinator<'_>,
        session: &Session,
        files: &[CandidateFile],
        file_type: FileType,
        form: &GuideForm,
        usage: &mut UsageGate,
    ) -> Result<(GuideResult, Delivery), ClientError> {
        usage.check().inspect_err(|err| self.report(err))?;
        let batch = uploader.run(session, files, file_type, |_| {}).await?;
        self.submit(session, Some(&batch), form, usage).await
    }

    fn report(&self, err: &ClientError) {
        match err {
            ClientError::QuotaExceeded { used, limit } => {
                self.notifier.notify(Notice::QuotaExceeded {
                    used: *used,
                    limit: *limit,
                })
            }
            other => self.notifier.notify(Notice::Error(other.user_message())),
        }
    }

    async fn submit_inner(
        &self,
        session: &Session,
        batch: Option<&UploadBatch>,
        form: &GuideForm,
        usage: &mut UsageGate,
    ) -> Result<(GuideResult, Delivery), ClientError> {
        let request = GuideRequest::new(batch, form)?;
        usage.check()?;

        info!(
            uploads = request.upload_ids.len(),
            character = %request.character_name,
            child = request.child_guide_requested,
            "requesting guide"
        );
        let response = tokio::time::timeout(self.timeout, self.api.generate(session, &request))
            .await
            .map_err(|_| {
                warn!(timeout_secs = self.timeout.as_secs(), "guide generation timed out");
                ClientError::Timeout(self.timeout)
            })??;
        let result = response.into_result()?;
        // The backend has counted this guide even if delivery fails below.
        usage.record_generation();

        let delivery = self.deliver(&result).await?;
        self.notifier
            .notify(Notice::Success("Your guide is ready".to_string()));
        Ok((result, delivery))
    }

    /// Open the primary guide, then the child guide no sooner than
    /// `child_delay` later in its named context.
    async fn deliver(&self, result: &GuideResult) -> Result<Delivery, ClientError> {
        if let Ok(mut last) = self.last_guide.lock() {
            *last = Some(result.guide_content.clone());
        }
        if let Ok(mut last) = self.last_child_guide.lock() {
            *last = result
                .child_guide_content
                .clone()
                .filter(|_| result.child_guide_completed);
        }
        let primary_opened = self
            .opener
            .open(&result.guide_content, OpenTarget::NewContext)
            .await?
            .is_some();
        if !primary_opened {
            warn!("primary guide was blocked");
            self.notifier.notify(Notice::OpenLastGuide);
        }

        let child_opened = match (&result.child_guide_content, result.child_guide_completed) {
            (Some(child), true) => {
                tokio::time::sleep(self.child_delay).await;
                let opened = self
                    .opener
                    .open(child, OpenTarget::Named(CHILD_GUIDE_CONTEXT))
                    .await?
                    .is_some();
                if !opened {
                    warn!("child guide was blocked");
                    self.notifier.notify(Notice::OpenLastChildGuide);
                }
                Some(opened)
            }
            (None, true) => {
                warn!("child guide marked complete but no content returned");
                None
            }
            _ => None,
        };

        Ok(Delivery {
            primary_opened,
            child_opened,
        })
    }

    /// Open the most recent guide again.
    pub async fn reopen_last_guide(&self) -> Result<bool, ClientError> {
        let html = self.last_guide().ok_or(ClientError::NoContent)?;
        let opened = self.opener.open(&html, OpenTarget::NewContext).await?.is_some();
        if !opened {
            self.notifier.notify(Notice::OpenLastGuide);
        }
        Ok(opened)
    }

    /// Open the most recent child guide again in its named context.
    pub async fn reopen_child_guide(&self) -> Result<bool, ClientError> {
        let html = self.last_child_guide().ok_or(ClientError::NoContent)?;
        let opened = self
            .opener
            .open(&html, OpenTarget::Named(CHILD_GUIDE_CONTEXT))
            .await?
            .is_some();
        if !opened {
            self.notifier.notify(Notice::OpenLastChildGuide);
        }
        Ok(opened)
    }
}
