//! crates/carelink_core/src/domain.rs
//!
//! Defines the core data structures for the front-desk client: the session and
//! the user profile it carries, plus the eligibility and user-administration
//! records exchanged with the backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Roles
//=========================================================================================

/// The role a user holds inside their organization.
///
/// The backend knows three roles. Anything else it sends (or a missing value)
/// decodes as `Unknown`, which the capability gate treats as least privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Admin,
    Staff,
    Viewer,
    #[default]
    Unknown,
}

impl Role {
    /// Lenient parse used for values coming off the wire.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "staff" => Role::Staff,
            "viewer" => Role::Viewer,
            _ => Role::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Viewer => "viewer",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role typed by a person is not one of the known roles.
#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}' (expected admin, staff or viewer)")]
pub struct UnknownRole(pub String);

/// Strict parse used for operator input, where a typo must not silently
/// become `Unknown`.
impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Role::parse(s) {
            Role::Unknown => Err(UnknownRole(s.to_string())),
            role => Ok(role),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|r| Role::parse(&r)).unwrap_or_default())
    }
}

//=========================================================================================
// Users and Sessions
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
}

/// The profile of the signed-in user, as returned by login and "who am I".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    pub organization: Organization,
}

/// The client-held authentication context.
///
/// A session is either empty or holds both a token and a profile; there is no
/// way to build one with only half of the pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user: Option<UserProfile>,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(token: String, user: UserProfile) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// The role of the signed-in user, `Unknown` when nobody is signed in.
    pub fn role(&self) -> Role {
        self.user.as_ref().map(|u| u.role).unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    /// Swaps the bearer token while keeping the profile. No-op on an empty session.
    pub(crate) fn replace_token(&mut self, token: String) {
        if self.user.is_some() {
            self.token = Some(token);
        }
    }
}

/// Body returned by `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

//=========================================================================================
// Eligibility
//=========================================================================================

/// Outcome of an eligibility verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EligibilityStatus {
    Active,
    Inactive,
    Error,
    NotFound,
    Unknown,
}

impl EligibilityStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => EligibilityStatus::Active,
            "inactive" => EligibilityStatus::Inactive,
            "error" => EligibilityStatus::Error,
            "not_found" => EligibilityStatus::NotFound,
            _ => EligibilityStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityStatus::Active => "active",
            EligibilityStatus::Inactive => "inactive",
            EligibilityStatus::Error => "error",
            EligibilityStatus::NotFound => "not_found",
            EligibilityStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EligibilityStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EligibilityStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EligibilityStatus::parse(&raw))
    }
}

/// The patient and insurance fields submitted for a check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityCheckRequest {
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_dob: NaiveDate,
    pub insurance_company: String,
    pub member_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageInfo {
    pub effective_date: Option<String>,
    pub termination_date: Option<String>,
    pub plan_name: Option<String>,
    pub plan_type: Option<String>,
    pub copay_primary_care: Option<String>,
    pub copay_specialist: Option<String>,
    pub copay_urgent_care: Option<String>,
    pub copay_emergency: Option<String>,
    pub deductible_individual: Option<String>,
    pub deductible_family: Option<String>,
    pub deductible_met: Option<String>,
    pub out_of_pocket_max: Option<String>,
    pub out_of_pocket_max_family: Option<String>,
    pub out_of_pocket_met: Option<String>,
    pub coinsurance: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberInfo {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub member_id: Option<String>,
}

/// The result of a single eligibility check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityCheckResponse {
    pub id: Uuid,
    pub status: EligibilityStatus,
    #[serde(default)]
    pub coverage: Option<CoverageInfo>,
    #[serde(default)]
    pub subscriber: Option<SubscriberInfo>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// The payer response stored alongside a history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub status: EligibilityStatus,
    #[serde(default)]
    pub coverage: Option<CoverageInfo>,
    #[serde(default)]
    pub subscriber: Option<SubscriberInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityHistoryItem {
    pub id: Uuid,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_dob: NaiveDate,
    pub insurance_company: String,
    pub member_id: String,
    #[serde(default)]
    pub group_number: Option<String>,
    pub status: EligibilityStatus,
    #[serde(default)]
    pub response_data: Option<ResponseData>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl EligibilityHistoryItem {
    /// The payer's verdict when one was recorded, otherwise the row status.
    pub fn effective_status(&self) -> EligibilityStatus {
        self.response_data
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

/// One page of `GET /eligibility/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityHistory {
    pub data: Vec<EligibilityHistoryItem>,
    pub pagination: Pagination,
}

impl EligibilityHistory {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Query parameters for the history endpoint. Unset fields are left to the
/// backend defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

//=========================================================================================
// User Administration
//=========================================================================================

/// A user as listed on the administration screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    pub is_active: bool,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

/// A partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

//=========================================================================================
// Timestamp Encoding
//=========================================================================================

/// The backend emits RFC 3339 timestamps, but rows written without a zone
/// come back naive. Naive values are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            Err(_) => NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).map(|n| n.and_utc()),
        }
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).map_err(D::Error::custom),
                None => Ok(None),
            }
        }
    }
}
