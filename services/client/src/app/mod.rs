pub mod dashboard;
pub mod eligibility;
pub mod history;
pub mod render;
pub mod screen;
pub mod state;
pub mod users;

pub use screen::Screen;
pub use state::AppState;
