//! services/client/src/app/history.rs
//!
//! The paginated history of eligibility checks.

use carelink_core::domain::{
    EligibilityCheckResponse, EligibilityHistory, EligibilityHistoryItem, HistoryParams,
    Pagination,
};
use carelink_core::guard::Route;
use carelink_core::ports::{PortError, PortResult};
use tracing::warn;
use uuid::Uuid;

use crate::app::screen::{admit, expired_to_redirect, Screen};
use crate::app::state::AppState;

/// Page size requested when the caller sets none.
pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Clone)]
pub struct HistoryView {
    pub params: HistoryParams,
    pub page: EligibilityHistory,
    /// Narrows the loaded page; never sent to the backend.
    pub search: Option<String>,
    /// Set when the page could not be loaded and an empty one is shown instead.
    pub notice: Option<String>,
}

impl HistoryView {
    /// Rows of the loaded page that match the search text.
    pub fn visible(&self) -> Vec<&EligibilityHistoryItem> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        self.page
            .data
            .iter()
            .filter(|item| needle.as_deref().map_or(true, |n| matches_search(item, n)))
            .collect()
    }

    /// Nothing to show: no checks match or the page failed to load.
    pub fn is_empty(&self) -> bool {
        self.visible().is_empty()
    }

    fn fallback(params: HistoryParams, search: Option<String>, notice: String) -> Self {
        let page = EligibilityHistory {
            data: Vec::new(),
            pagination: Pagination {
                page: params.page.unwrap_or(1),
                limit: params.limit.unwrap_or(DEFAULT_LIMIT),
                total: 0,
                pages: 0,
            },
        };
        Self {
            params,
            page,
            search,
            notice: Some(notice),
        }
    }
}

/// Case-insensitive match on patient name, member ID and insurer.
/// `needle` is already lowercase.
fn matches_search(item: &EligibilityHistoryItem, needle: &str) -> bool {
    [
        &item.patient_first_name,
        &item.patient_last_name,
        &item.member_id,
        &item.insurance_company,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Opens one page of history, optionally narrowed by `search`. Load failures
/// fall back to an empty page the user can retry.
pub async fn load(
    state: &AppState,
    mut params: HistoryParams,
    search: Option<String>,
) -> Screen<HistoryView> {
    if let Err(screen) = admit(&state.session, Route::History) {
        return screen;
    }
    params.limit.get_or_insert(DEFAULT_LIMIT);
    match state.eligibility.get_history(&params).await {
        Ok(page) => Screen::Ready(HistoryView {
            params,
            page,
            search,
            notice: None,
        }),
        Err(PortError::SessionExpired) => Screen::Redirect(Route::Login),
        Err(e) => {
            warn!("Failed to load history: {}", e);
            Screen::Ready(HistoryView::fallback(
                params,
                search,
                "History could not be loaded. Try again.".to_string(),
            ))
        }
    }
}

/// Opens a single past check.
pub async fn show(state: &AppState, id: Uuid) -> PortResult<Screen<EligibilityCheckResponse>> {
    if let Err(screen) = admit(&state.session, Route::History) {
        return Ok(screen);
    }
    expired_to_redirect(state.eligibility.get_check(id).await)
}
