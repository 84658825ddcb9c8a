//! services/client/src/cli.rs
//!
//! Command-line definition and dispatch. Each command maps to a screen (or a
//! session action) and goes through the same route guard a navigation would.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use carelink_core::capability;
use carelink_core::domain::{EligibilityCheckRequest, HistoryParams, NewUser, Role, UserUpdate};
use carelink_core::guard::{GuardDecision, Route};
use carelink_core::ports::PortError;
use uuid::Uuid;

use crate::app::{dashboard, eligibility, history, render, users, AppState};
use crate::error::ClientError;

#[derive(Debug, Parser)]
#[command(name = "carelink", version, about = "Insurance eligibility verification for the front desk")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CARELINK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Exchange the session token for a fresh one
    Refresh,
    /// Summary of recent checks
    Dashboard,
    /// List the payers eligibility can be checked against
    Insurers,
    /// Run an eligibility check
    Check(CheckArgs),
    /// Browse past eligibility checks
    History(HistoryArgs),
    /// Show a single past check
    Show { id: Uuid },
    /// Manage users (admins only)
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Navigate to an application path, e.g. `/app/history`
    Open { path: String },
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    /// Date of birth, YYYY-MM-DD
    #[arg(long)]
    pub dob: NaiveDate,
    #[arg(long)]
    pub insurer: String,
    #[arg(long)]
    pub member_id: String,
    #[arg(long)]
    pub group_number: Option<String>,
}

impl From<CheckArgs> for EligibilityCheckRequest {
    fn from(args: CheckArgs) -> Self {
        Self {
            patient_first_name: args.first_name,
            patient_last_name: args.last_name,
            patient_dob: args.dob,
            insurance_company: args.insurer,
            member_id: args.member_id,
            group_number: args.group_number,
        }
    }
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    /// Narrow the page by patient name, member ID or insurer
    #[arg(long)]
    pub search: Option<String>,
}

impl From<HistoryArgs> for HistoryParams {
    fn from(args: HistoryArgs) -> Self {
        Self {
            page: args.page,
            limit: args.limit,
            start_date: args.start_date,
            end_date: args.end_date,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    List,
    Show {
        id: Uuid,
    },
    Create {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CARELINK_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: String,
        #[arg(long, default_value = "staff")]
        role: Role,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        active: Option<bool>,
    },
}

//=========================================================================================
// Dispatch
//=========================================================================================

/// Runs `command` against an initialized state and returns what to print.
pub async fn run(state: &AppState, command: Command) -> Result<String, ClientError> {
    let out = match command {
        Command::Login { email, password } => {
            let user = state.session.login(&email, &password).await?;
            format!("Login successful!\n{}", render::profile(&user))
        }
        Command::Logout => {
            state.session.logout();
            "Signed out.".to_string()
        }
        Command::Whoami => match state.session.user() {
            Some(user) => {
                let menu: Vec<&str> = capability::menu(user.role)
                    .iter()
                    .map(|d| d.label())
                    .collect();
                format!("{}\nMenu: {}", render::profile(&user), menu.join(" | "))
            }
            None => render::redirect(Route::Login),
        },
        Command::Refresh => match state.session.refresh().await {
            Ok(()) => "Session refreshed.".to_string(),
            Err(PortError::SessionExpired) => render::redirect(Route::Login),
            Err(e) => return Err(e.into()),
        },
        Command::Dashboard => open_route(state, Route::Dashboard).await,
        Command::Insurers => {
            let screen = eligibility::insurers(state).await;
            render::screen(&screen, |list| render::insurers(list))
        }
        Command::Check(args) => {
            let request = EligibilityCheckRequest::from(args);
            let screen = eligibility::check(state, &request).await?;
            render::screen(&screen, render::check_result)
        }
        Command::History(mut args) => {
            let search = args.search.take();
            let screen = history::load(state, args.into(), search).await;
            render::screen(&screen, render::history)
        }
        Command::Show { id } => {
            let screen = history::show(state, id).await?;
            render::screen(&screen, render::check_result)
        }
        Command::Users { command } => run_users(state, command).await?,
        Command::Open { path } => match state.session.decide_path(&path) {
            GuardDecision::Render(route) => open_route(state, route).await,
            GuardDecision::Wait => "Restoring session...".to_string(),
            GuardDecision::Redirect(route) => render::redirect(route),
            GuardDecision::Blocked(denied) => render::blocked(&denied),
        },
    };
    Ok(out)
}

async fn run_users(state: &AppState, command: UsersCommand) -> Result<String, ClientError> {
    let out = match command {
        UsersCommand::List => {
            let screen = users::list(state).await;
            render::screen(&screen, render::users)
        }
        UsersCommand::Show { id } => {
            let screen = users::show(state, id).await?;
            render::screen(&screen, render::user)
        }
        UsersCommand::Create {
            email,
            password,
            full_name,
            role,
        } => {
            let new_user = NewUser {
                email,
                password,
                full_name,
                role,
            };
            let screen = users::create(state, &new_user).await?;
            render::screen(&screen, |u| format!("User created successfully\n{}", render::user(u)))
        }
        UsersCommand::Update {
            id,
            email,
            full_name,
            role,
            active,
        } => {
            let update = UserUpdate {
                email,
                full_name,
                role,
                is_active: active,
            };
            let screen = users::update(state, id, &update).await?;
            render::screen(&screen, |u| format!("User updated successfully\n{}", render::user(u)))
        }
    };
    Ok(out)
}

/// Renders the screen behind a route the guard already admitted (or checks it
/// again on the way in, for direct commands).
async fn open_route(state: &AppState, route: Route) -> String {
    match route {
        Route::Landing => {
            "CareLink: insurance eligibility verification for healthcare front offices.".to_string()
        }
        Route::Login => "Sign in with `carelink login --email <email>`.".to_string(),
        Route::Dashboard => {
            let screen = dashboard::load(state).await;
            render::screen(&screen, render::dashboard)
        }
        Route::EligibilityCheck => {
            let screen = eligibility::insurers(state).await;
            render::screen(&screen, |list| {
                format!(
                    "Run `carelink check` with one of these insurers:\n{}",
                    render::insurers(list)
                )
            })
        }
        Route::History => {
            let screen = history::load(state, HistoryParams::default(), None).await;
            render::screen(&screen, render::history)
        }
        Route::Users => {
            let screen = users::list(state).await;
            render::screen(&screen, render::users)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_command() {
        let cli = Cli::try_parse_from([
            "carelink",
            "check",
            "--first-name",
            "Ana",
            "--last-name",
            "Lopez",
            "--dob",
            "1984-03-02",
            "--insurer",
            "Aetna",
            "--member-id",
            "AET123456",
        ])
        .unwrap();
        match cli.command {
            Command::Check(args) => {
                let request = EligibilityCheckRequest::from(args);
                assert_eq!(request.patient_dob.to_string(), "1984-03-02");
                assert!(request.group_number.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_role_for_new_users() {
        let result = Cli::try_parse_from([
            "carelink",
            "users",
            "create",
            "--email",
            "new@carelink.demo",
            "--password",
            "a-long-password",
            "--full-name",
            "New Hire",
            "--role",
            "root",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn new_users_default_to_staff() {
        let cli = Cli::try_parse_from([
            "carelink",
            "users",
            "create",
            "--email",
            "new@carelink.demo",
            "--password",
            "a-long-password",
            "--full-name",
            "New Hire",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Users {
                command: UsersCommand::Create { role: Role::Staff, .. }
            }
        ));
    }
}
