//! Admin dashboard tab fetches.
//!
//! The first 403 flips the dashboard into the "Admin Access Required" state;
//! after that no tab issues another request.
use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::api::PrepApi;
use crate::error::ClientError;
use crate::session::Session;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminTab {
    Overview,
    Users,
    Guides,
    PromoCodes,
}

impl AdminTab {
    pub const ALL: [AdminTab; 4] = [
        AdminTab::Overview,
        AdminTab::Users,
        AdminTab::Guides,
        AdminTab::PromoCodes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminTab::Overview => "overview",
            AdminTab::Users => "users",
            AdminTab::Guides => "guides",
            AdminTab::PromoCodes => "promo-codes",
        }
    }

    /// Path relative to the API base.
    pub fn path(&self) -> &'static str {
        match self {
            AdminTab::Overview => "api/admin/stats",
            AdminTab::Users => "api/admin/users",
            AdminTab::Guides => "api/admin/guides",
            AdminTab::PromoCodes => "api/admin/promo-codes",
        }
    }

    pub fn is_paginated(&self) -> bool {
        !matches!(self, AdminTab::Overview)
    }
}

impl fmt::Display for AdminTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdminTab::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown admin tab '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE, None)
    }
}

impl PageQuery {
    /// Page is at least 1, limit is clamped to `1..=MAX_PAGE_SIZE`, blank search is dropped.
    pub fn new(page: u32, limit: u32, search: Option<String>) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            search: search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        params
    }
}

pub struct AdminDashboard<'a> {
    api: &'a dyn PrepApi,
    forbidden: bool,
}

impl<'a> AdminDashboard<'a> {
    pub fn new(api: &'a dyn PrepApi) -> Self {
        Self {
            api,
            forbidden: false,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.forbidden
    }

    #[instrument(skip_all, fields(tab = %tab))]
    pub async fn fetch(
        &mut self,
        session: &Session,
        tab: AdminTab,
        query: &PageQuery,
    ) -> Result<Value, ClientError> {
        if self.forbidden {
            return Err(ClientError::Forbidden);
        }
        match self.api.admin_fetch(session, tab, query).await {
            Err(ClientError::Forbidden) => {
                warn!("admin access denied; skipping remaining tabs");
                self.forbidden = true;
                Err(ClientError::Forbidden)
            }
            other => other,
        }
    }

    /// Fetch every tab in order, stopping the network traffic at the first 403.
    pub async fn fetch_all(
        &mut self,
        session: &Session,
        query: &PageQuery,
    ) -> Vec<(AdminTab, Result<Value, ClientError>)> {
        let mut out = Vec::with_capacity(AdminTab::ALL.len());
        for tab in AdminTab::ALL {
            let result = self.fetch(session, tab, query).await;
            if let Err(err) = &result {
                if !matches!(err, ClientError::Forbidden) {
                    warn!(%tab, error = %err, "admin tab failed");
                }
            } else {
                info!(%tab, "admin tab loaded");
            }
            out.push((tab, result));
        }
        out
    }
}

/// `(page, total_pages)` from the common pagination envelope, when present.
pub fn pagination(payload: &Value) -> Option<(u64, u64)> {
    let p = payload.get("pagination")?;
    let page = p.get("page").and_then(Value::as_u64)?;
    let pages = p
        .get("pages")
        .or_else(|| p.get("totalPages"))
        .and_then(Value::as_u64)?;
    Some((page, pages))
}
