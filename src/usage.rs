//! Monthly quota tracking.
//!
//! The gate keeps the last server-confirmed usage plus a local pending delta.
//! A successful generation bumps the delta right away; the next authoritative
//! fetch collapses it.
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::api::PrepApi;
use crate::error::ClientError;
use crate::model::{Plan, UsageState};
use crate::session::Session;

/// Limit shown when the backend cannot be reached and nothing is cached.
pub const DEMO_LIMIT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageView {
    pub plan: Plan,
    pub used: u32,
    pub limit: Option<u32>,
    /// `None` means unlimited.
    pub remaining: Option<u32>,
    pub can_generate: bool,
    pub renews_at: Option<DateTime<Utc>>,
    /// Showing cached or demo numbers because the last refresh failed.
    pub degraded: bool,
}

/// `(remaining, can_generate)` for a usage count against an optional limit.
pub fn derive(used: u32, limit: Option<u32>) -> (Option<u32>, bool) {
    match limit {
        None => (None, true),
        Some(limit) => {
            let remaining = limit.saturating_sub(used);
            (Some(remaining), remaining > 0)
        }
    }
}

#[derive(Debug, Clone)]
pub struct UsageGate {
    confirmed: UsageState,
    pending_delta: u32,
    degraded: bool,
    identity: Option<String>,
}

impl Default for UsageGate {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageGate {
    /// Starts on demo values until the first refresh.
    pub fn new() -> Self {
        Self {
            confirmed: demo_usage(),
            pending_delta: 0,
            degraded: true,
            identity: None,
        }
    }

    pub fn with_state(state: UsageState) -> Self {
        Self {
            confirmed: state,
            pending_delta: 0,
            degraded: false,
            identity: None,
        }
    }

    pub fn view(&self) -> UsageView {
        let used = self.confirmed.used.saturating_add(self.pending_delta);
        let (remaining, can_generate) = derive(used, self.confirmed.limit);
        UsageView {
            plan: self.confirmed.plan,
            used,
            limit: self.confirmed.limit,
            remaining,
            can_generate,
            renews_at: self.confirmed.renews_at,
            degraded: self.degraded,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.view().can_generate
    }

    pub fn pending_delta(&self) -> u32 {
        self.pending_delta
    }

    /// Replace the confirmed value and drop any optimistic delta.
    pub fn apply(&mut self, state: UsageState) {
        self.confirmed = state;
        self.pending_delta = 0;
        self.degraded = false;
    }

    /// Optimistic +1 after a successful generation; unlimited plans are not counted.
    pub fn record_generation(&mut self) {
        if self.confirmed.limit.is_some() {
            self.pending_delta = self.pending_delta.saturating_add(1);
        }
    }

    /// Fetch the authoritative usage. On failure the cached (or demo) value
    /// stays in place and the view is marked degraded.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self, api: &dyn PrepApi, session: &Session) -> UsageView {
        match api.dashboard(session).await {
            Ok(dashboard) => {
                let state = dashboard.into_usage();
                debug!(used = state.used, limit = ?state.limit, "usage refreshed");
                self.apply(state);
            }
            Err(err) => {
                warn!(error = %err, "usage refresh failed; showing cached values");
                self.degraded = true;
            }
        }
        self.view()
    }

    /// Refresh when the logged-in identity differs from the last one seen.
    /// Logging out resets to demo values.
    pub async fn sync_identity(
        &mut self,
        api: &dyn PrepApi,
        session: Option<&Session>,
    ) -> UsageView {
        let next = session.map(|s| s.identity().to_string());
        if next == self.identity {
            return self.view();
        }
        self.identity = next;
        match session {
            Some(session) => {
                // Cached numbers belong to the previous identity.
                self.confirmed = demo_usage();
                self.pending_delta = 0;
                self.refresh(api, session).await
            }
            None => {
                *self = Self::new();
                self.view()
            }
        }
    }

    /// Precondition used before any generation request.
    pub fn check(&self) -> Result<(), ClientError> {
        let view = self.view();
        match (view.can_generate, view.limit) {
            (false, Some(limit)) => Err(ClientError::QuotaExceeded {
                used: view.used,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

fn demo_usage() -> UsageState {
    UsageState {
        plan: Plan::Free,
        used: 0,
        limit: Some(DEMO_LIMIT),
        renews_at: None,
    }
}
