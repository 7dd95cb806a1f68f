//! Append-only audit log. Every ticket mutation and comment writes one row
//! here; rows are never updated or deleted.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::activities;

pub const TYPE_TICKET: &str = "ticket";
pub const TYPE_COMMENT: &str = "comment";

pub const ACTION_CREATED: &str = "created";
pub const ACTION_UPDATED: &str = "updated";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = activities)]
pub struct Activity {
    pub id: Uuid,
    pub activity_type: String,
    pub action: String,
    pub description: String,
    pub user_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        activity_type: &str,
        action: &str,
        description: impl Into<String>,
        user_id: Uuid,
        ticket_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_type: activity_type.to_string(),
            action: action.to_string(),
            description: description.into(),
            user_id,
            ticket_id,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches the raw payload of the triggering request for audit purposes.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

pub fn record(conn: &mut PgConnection, activity: &Activity) -> QueryResult<()> {
    diesel::insert_into(activities::table)
        .values(activity)
        .execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_type_action_and_metadata() {
        let user = Uuid::new_v4();
        let ticket = Uuid::new_v4();
        let activity = Activity::new(
            TYPE_TICKET,
            ACTION_UPDATED,
            "Ticket T-0007 updated",
            user,
            Some(ticket),
        )
        .with_metadata(serde_json::json!({ "status": "RESOLVED" }));

        assert_eq!(activity.activity_type, "ticket");
        assert_eq!(activity.action, "updated");
        assert_eq!(activity.ticket_id, Some(ticket));
        assert_eq!(
            activity.metadata,
            Some(serde_json::json!({ "status": "RESOLVED" }))
        );
    }
}
