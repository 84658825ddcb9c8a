//! services/client/src/app/eligibility.rs
//!
//! The eligibility check screen: the list of supported payers and the check
//! itself. Viewers are shown the blocked screen before anything is sent.

use carelink_core::domain::{EligibilityCheckRequest, EligibilityCheckResponse};
use carelink_core::guard::Route;
use carelink_core::ports::{PortError, PortResult};
use tracing::{info, warn};

use crate::app::screen::{admit, expired_to_redirect, Screen};
use crate::app::state::AppState;

/// Loads the payers offered on the form. On failure the form still opens with
/// an empty list and the insurer can be typed in.
pub async fn insurers(state: &AppState) -> Screen<Vec<String>> {
    if let Err(screen) = admit(&state.session, Route::EligibilityCheck) {
        return screen;
    }
    match state.eligibility.supported_insurers().await {
        Ok(insurers) => Screen::Ready(insurers),
        Err(PortError::SessionExpired) => Screen::Redirect(Route::Login),
        Err(e) => {
            warn!("Failed to load insurers: {}", e);
            Screen::Ready(Vec::new())
        }
    }
}

/// Submits a check. Backend errors are returned for display.
pub async fn check(
    state: &AppState,
    request: &EligibilityCheckRequest,
) -> PortResult<Screen<EligibilityCheckResponse>> {
    if let Err(screen) = admit(&state.session, Route::EligibilityCheck) {
        return Ok(screen);
    }
    let result = state.eligibility.check_eligibility(request).await;
    match &result {
        Ok(response) => info!(
            id = %response.id,
            status = %response.status,
            elapsed_ms = ?response.response_time_ms,
            "Eligibility check completed"
        ),
        Err(e) => warn!("Eligibility check failed: {}", e),
    }
    expired_to_redirect(result)
}
