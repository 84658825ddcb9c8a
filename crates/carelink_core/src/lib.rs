pub mod capability;
pub mod domain;
pub mod guard;
pub mod ports;
pub mod session;

pub use capability::{AccessDenied, Destination};
pub use domain::{
    CoverageInfo, EligibilityCheckRequest, EligibilityCheckResponse, EligibilityHistory,
    EligibilityHistoryItem, EligibilityStatus, HistoryParams, LoginResponse, ManagedUser, NewUser,
    Organization, Pagination, ResponseData, Role, Session, SubscriberInfo, UserProfile, UserUpdate,
};
pub use guard::{AuthEvent, AuthState, GuardDecision, Route};
pub use ports::{
    AuthService, EligibilityService, PortError, PortResult, TokenStorage, UserDirectory,
};
pub use session::SessionStore;
