//! services/client/src/app/render.rs
//!
//! Plain-text rendering of screens for the terminal.

use carelink_core::capability::AccessDenied;
use carelink_core::domain::{
    CoverageInfo, EligibilityCheckResponse, ManagedUser, UserProfile,
};
use carelink_core::guard::Route;
use comfy_table::{ContentArrangement, Table};
use std::fmt::Write;

use crate::app::dashboard::DashboardView;
use crate::app::history::HistoryView;
use crate::app::screen::Screen;
use crate::app::users::UsersView;

/// Renders any screen, delegating the ready case to `ready`.
pub fn screen<V>(screen: &Screen<V>, ready: impl FnOnce(&V) -> String) -> String {
    match screen {
        Screen::Waiting => "Restoring session...".to_string(),
        Screen::Ready(view) => ready(view),
        Screen::Blocked(denied) => blocked(denied),
        Screen::Redirect(route) => redirect(*route),
    }
}

pub fn blocked(denied: &AccessDenied) -> String {
    format!("{}\n{}", denied.title, denied.subtitle)
}

pub fn redirect(route: Route) -> String {
    match route {
        Route::Login => "You are not signed in. Run `carelink login` to continue.".to_string(),
        other => format!("Redirected to {}", other),
    }
}

pub fn profile(user: &UserProfile) -> String {
    format!(
        "{} <{}>\nRole: {}\nOrganization: {}",
        user.full_name,
        user.email,
        user.role.as_str().to_uppercase(),
        user.organization.name
    )
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

pub fn dashboard(view: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Welcome, {} ({})",
        view.user.full_name, view.user.organization.name
    );
    let menu: Vec<&str> = view.menu.iter().map(|d| d.label()).collect();
    let _ = writeln!(out, "Menu: {}", menu.join(" | "));
    let _ = writeln!(
        out,
        "Total checks: {}  Active: {}  Inactive: {}  Errors: {}",
        view.stats.total, view.stats.active, view.stats.inactive, view.stats.errors
    );
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "{}", notice);
    }
    if view.recent.is_empty() {
        out.push_str("No recent eligibility checks.");
        return out;
    }

    let mut recent = table(vec!["Patient", "Insurance", "Status", "Checked"]);
    for check in &view.recent {
        recent.add_row(vec![
            format!("{} {}", check.patient_first_name, check.patient_last_name),
            check.insurance_company.clone(),
            check.effective_status().to_string(),
            check.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    out.push_str(&recent.to_string());
    out
}

pub fn history(view: &HistoryView) -> String {
    let mut out = String::new();
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "{}", notice);
    }
    if view.is_empty() {
        out.push_str("No eligibility checks found.");
        return out;
    }

    let mut rows = table(vec![
        "Date", "Patient", "DOB", "Insurance", "Member ID", "Status", "Time",
    ]);
    for check in view.visible() {
        rows.add_row(vec![
            check.created_at.format("%Y-%m-%d %H:%M").to_string(),
            format!("{} {}", check.patient_first_name, check.patient_last_name),
            check.patient_dob.to_string(),
            check.insurance_company.clone(),
            check.member_id.clone(),
            check.effective_status().to_string(),
            check
                .response_time_ms
                .map(|ms| format!("{}ms", ms))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    let p = &view.page.pagination;
    let _ = writeln!(out, "{}", rows);
    let _ = write!(out, "Page {} of {} ({} checks)", p.page, p.pages.max(1), p.total);
    out
}

fn coverage_lines(out: &mut String, coverage: &CoverageInfo) {
    let fields = [
        ("Plan", &coverage.plan_name),
        ("Plan type", &coverage.plan_type),
        ("Effective", &coverage.effective_date),
        ("Terminates", &coverage.termination_date),
        ("Copay (primary care)", &coverage.copay_primary_care),
        ("Copay (specialist)", &coverage.copay_specialist),
        ("Copay (urgent care)", &coverage.copay_urgent_care),
        ("Copay (emergency)", &coverage.copay_emergency),
        ("Deductible (individual)", &coverage.deductible_individual),
        ("Deductible (family)", &coverage.deductible_family),
        ("Deductible met", &coverage.deductible_met),
        ("Out-of-pocket max", &coverage.out_of_pocket_max),
        ("Out-of-pocket max (family)", &coverage.out_of_pocket_max_family),
        ("Out-of-pocket met", &coverage.out_of_pocket_met),
        ("Coinsurance", &coverage.coinsurance),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "  {}: {}", label, value);
        }
    }
}

pub fn check_result(result: &EligibilityCheckResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Check {}", result.id);
    let _ = writeln!(out, "Status: {}", result.status.as_str().to_uppercase());
    if let Some(message) = &result.error_message {
        let _ = writeln!(out, "Error: {}", message);
    }
    if let Some(subscriber) = &result.subscriber {
        let _ = writeln!(
            out,
            "Subscriber: {} ({})",
            subscriber.name.as_deref().unwrap_or("-"),
            subscriber.relationship.as_deref().unwrap_or("-")
        );
    }
    if let Some(coverage) = &result.coverage {
        out.push_str("Coverage:\n");
        coverage_lines(&mut out, coverage);
    }
    if let Some(ms) = result.response_time_ms {
        let _ = writeln!(out, "Response time: {}ms", ms);
    }
    let _ = write!(out, "Checked at {}", result.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    out
}

pub fn insurers(insurers: &[String]) -> String {
    if insurers.is_empty() {
        return "No insurers available.".to_string();
    }
    insurers.join("\n")
}

pub fn users(view: &UsersView) -> String {
    let mut out = String::new();
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "{}", notice);
    }
    if view.users.is_empty() {
        out.push_str("No users found.");
        return out;
    }
    let mut rows = table(vec!["ID", "Name", "Email", "Role", "Status", "Last login"]);
    for user in &view.users {
        rows.add_row(vec![
            user.id.to_string(),
            user.full_name.clone(),
            user.email.clone(),
            user.role.as_str().to_uppercase(),
            if user.is_active { "Active" } else { "Inactive" }.to_string(),
            user.last_login
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "Never".to_string()),
        ]);
    }
    out.push_str(&rows.to_string());
    out
}

pub fn user(user: &ManagedUser) -> String {
    format!(
        "{} <{}>\nID: {}\nRole: {}\nActive: {}",
        user.full_name,
        user.email,
        user.id,
        user.role.as_str().to_uppercase(),
        if user.is_active { "yes" } else { "no" }
    )
}
