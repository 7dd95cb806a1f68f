//! Shared entity types and the enum columns they store.
//!
//! Enum columns are persisted as text and mapped to Rust enums through
//! diesel's `AsExpression`/`FromSqlRow`, so illegal values are rejected at
//! the deserialization boundary instead of leaking into handlers.

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow, Queryable};
use serde::{Deserialize, Serialize};
use std::io::Write;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingForCustomer,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::WaitingForCustomer => "WAITING_FOR_CUSTOMER",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }

    /// Display label: underscores become spaces.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl ToSql<Text, Pg> for TicketStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TicketStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match std::str::from_utf8(bytes.as_bytes())? {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "WAITING_FOR_CUSTOMER" => Ok(Self::WaitingForCustomer),
            "RESOLVED" => Ok(Self::Resolved),
            "CLOSED" => Ok(Self::Closed),
            other => Err(format!("Unrecognized ticket status: {other}").into()),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }

    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl ToSql<Text, Pg> for TicketPriority {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TicketPriority {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match std::str::from_utf8(bytes.as_bytes())? {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            other => Err(format!("Unrecognized ticket priority: {other}").into()),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    Bug,
    FeatureRequest,
    Question,
    Issue,
    TechnicalSupport,
    Billing,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "BUG",
            Self::FeatureRequest => "FEATURE_REQUEST",
            Self::Question => "QUESTION",
            Self::Issue => "ISSUE",
            Self::TechnicalSupport => "TECHNICAL_SUPPORT",
            Self::Billing => "BILLING",
        }
    }
}

impl Default for TicketCategory {
    fn default() -> Self {
        Self::Issue
    }
}

impl ToSql<Text, Pg> for TicketCategory {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TicketCategory {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match std::str::from_utf8(bytes.as_bytes())? {
            "BUG" => Ok(Self::Bug),
            "FEATURE_REQUEST" => Ok(Self::FeatureRequest),
            "QUESTION" => Ok(Self::Question),
            "ISSUE" => Ok(Self::Issue),
            "TECHNICAL_SUPPORT" => Ok(Self::TechnicalSupport),
            "BILLING" => Ok(Self::Billing),
            other => Err(format!("Unrecognized ticket category: {other}").into()),
        }
    }
}

/// Display fields of the acting or assigned user, joined into responses.
#[derive(Debug, Clone, Serialize, Queryable)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct ContactSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Queryable)]
pub struct CompanySummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable)]
pub struct Contact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company_id: Option<Uuid>,
    pub lead_score: i32,
    pub lead_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_replace_underscores_with_spaces() {
        assert_eq!(TicketStatus::WaitingForCustomer.label(), "WAITING FOR CUSTOMER");
        assert_eq!(TicketStatus::InProgress.label(), "IN PROGRESS");
        assert_eq!(TicketStatus::Open.label(), "OPEN");
    }

    #[test]
    fn ticket_defaults_match_creation_policy() {
        assert_eq!(TicketStatus::default(), TicketStatus::Open);
        assert_eq!(TicketPriority::default(), TicketPriority::Medium);
        assert_eq!(TicketCategory::default(), TicketCategory::Issue);
    }

    #[test]
    fn enum_wire_form_is_screaming_snake_case() {
        let status = serde_json::to_string(&TicketStatus::WaitingForCustomer).unwrap();
        assert_eq!(status, "\"WAITING_FOR_CUSTOMER\"");
        let parsed: TicketPriority = serde_json::from_str("\"URGENT\"").unwrap();
        assert_eq!(parsed, TicketPriority::Urgent);
    }
}
