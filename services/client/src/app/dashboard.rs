//! services/client/src/app/dashboard.rs
//!
//! The dashboard: who is signed in, what they can reach, and a summary of the
//! most recent eligibility checks.

use carelink_core::capability::{self, Destination};
use carelink_core::domain::{
    EligibilityHistory, EligibilityHistoryItem, EligibilityStatus, HistoryParams, UserProfile,
};
use carelink_core::guard::Route;
use carelink_core::ports::PortError;
use tracing::warn;

use crate::app::screen::{admit, Screen};
use crate::app::state::AppState;

/// How many recent checks the dashboard summarizes.
pub const RECENT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Checks on record for the organization, across all pages.
    pub total: u64,
    pub active: usize,
    pub inactive: usize,
    /// Errors and not-found results.
    pub errors: usize,
}

impl DashboardStats {
    /// Summarizes one page of history. Status counts only cover that page and
    /// only rows with a recorded payer response.
    pub fn from_history(history: &EligibilityHistory) -> Self {
        let count = |wanted: &[EligibilityStatus]| {
            history
                .data
                .iter()
                .filter_map(|c| c.response_data.as_ref())
                .filter(|r| wanted.contains(&r.status))
                .count()
        };
        Self {
            total: history.pagination.total,
            active: count(&[EligibilityStatus::Active]),
            inactive: count(&[EligibilityStatus::Inactive]),
            errors: count(&[EligibilityStatus::Error, EligibilityStatus::NotFound]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub user: UserProfile,
    pub menu: Vec<Destination>,
    pub stats: DashboardStats,
    pub recent: Vec<EligibilityHistoryItem>,
    /// Set when the recent checks could not be loaded.
    pub notice: Option<String>,
}

/// Opens the dashboard. Failing to load the recent checks leaves an empty
/// summary with a notice; only an expired session leaves the screen.
pub async fn load(state: &AppState) -> Screen<DashboardView> {
    if let Err(screen) = admit(&state.session, Route::Dashboard) {
        return screen;
    }
    let Some(user) = state.session.user() else {
        return Screen::Redirect(Route::Login);
    };
    let menu = capability::menu(user.role);

    let params = HistoryParams {
        limit: Some(RECENT_LIMIT),
        ..Default::default()
    };
    let (stats, recent, notice) = match state.eligibility.get_history(&params).await {
        Ok(history) => (DashboardStats::from_history(&history), history.data, None),
        Err(PortError::SessionExpired) => return Screen::Redirect(Route::Login),
        Err(e) => {
            warn!("Failed to load dashboard data: {}", e);
            (
                DashboardStats::default(),
                Vec::new(),
                Some("Recent checks are unavailable right now.".to_string()),
            )
        }
    };

    Screen::Ready(DashboardView {
        user,
        menu,
        stats,
        recent,
        notice,
    })
}
