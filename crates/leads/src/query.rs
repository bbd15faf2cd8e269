//! Lead listing: filters and pagination.

use serde::Serialize;

use albiero_core::DomainResult;

use crate::{Lead, LeadStatus};

/// Filter + page selection for the admin lead list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadQuery {
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    pub status: Option<LeadStatus>,
    /// Case-insensitive substring matched against name, email and service.
    pub search: Option<String>,
}

impl Default for LeadQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
            status: None,
            search: None,
        }
    }
}

impl LeadQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Build from raw query-string values.
    ///
    /// Unparseable or non-positive page/limit fall back to the defaults and
    /// limit is clamped to `MAX_LIMIT`. An unknown status is a validation
    /// error rather than an empty result.
    pub fn from_params(
        page: Option<&str>,
        limit: Option<&str>,
        status: Option<&str>,
        search: Option<&str>,
    ) -> DomainResult<Self> {
        let page = page
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<u32>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<LeadStatus>()?),
            None => None,
        };
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        Ok(Self { page, limit, status, search })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// `ILIKE` pattern for SQL backends, with wildcards in the needle escaped.
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(status) = self.status {
            if lead.status != status {
                return false;
            }
        }
        match &self.search {
            None => true,
            Some(needle) => [lead.name.as_str(), lead.email.as_str(), lead.service.as_str()]
                .iter()
                .any(|field| field.to_lowercase().contains(needle.as_str())),
        }
    }
}

/// Page metadata returned alongside list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(limit.max(1)));
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
