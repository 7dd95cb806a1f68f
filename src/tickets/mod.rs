//! Ticket lifecycle: creation with sequential ticket numbers, partial
//! updates with resolution timestamp bookkeeping, comments, and the
//! activity records that accompany every mutation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::activity::{self, Activity, ACTION_CREATED, ACTION_UPDATED, TYPE_COMMENT, TYPE_TICKET};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    CompanySummary, ContactSummary, Tag, TicketCategory, TicketPriority, TicketStatus, UserSummary,
};
use crate::schema::{activities, comments, companies, contacts, tags, ticket_tags, tickets, users};
use crate::state::AppState;

const TICKET_NUMBER_PREFIX: &str = "T-";
const TICKET_NUMBER_WIDTH: usize = 4;

/// Create/insert can lose the number race to a concurrent request; the
/// unique index on `ticket_number` rejects the duplicate and we recompute.
const MAX_NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = tickets)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category: TicketCategory,
    pub contact_id: Uuid,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub due_date: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub description: String,
    pub contact_id: Uuid,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. `assigned_to_id` and `due_date` distinguish "absent"
/// from "set to null" so an explicit null unassigns.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateTicketRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TicketCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub is_internal: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = tickets)]
struct TicketChanges {
    subject: Option<String>,
    description: Option<String>,
    status: Option<TicketStatus>,
    priority: Option<TicketPriority>,
    category: Option<TicketCategory>,
    assigned_to_id: Option<Option<Uuid>>,
    due_date: Option<Option<DateTime<Utc>>>,
    resolved_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TicketWithRelations {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub contact: ContactSummary,
    pub company: Option<CompanySummary>,
    pub assigned_to: Option<UserSummary>,
    pub created_by: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct TicketListItem {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub contact: ContactSummary,
    pub company: Option<CompanySummary>,
    pub assigned_to: Option<UserSummary>,
    pub comment_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CommentWithUser {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    #[serde(flatten)]
    pub activity: Activity,
    pub user_name: String,
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub contact: ContactSummary,
    pub company: Option<CompanySummary>,
    pub assigned_to: Option<UserSummary>,
    pub created_by: UserSummary,
    pub comments: Vec<CommentWithUser>,
    pub tags: Vec<Tag>,
    pub activities: Vec<ActivityEntry>,
}

/// Next number in the sequence: parse the numeric suffix of the highest
/// assigned number and increment, starting at 1 for an empty store.
fn next_ticket_number(last: Option<&str>) -> String {
    let next = last
        .and_then(|number| number.rsplit('-').next())
        .and_then(|suffix| suffix.parse::<i64>().ok())
        .map_or(1, |n| n + 1);
    format!(
        "{}{:0width$}",
        TICKET_NUMBER_PREFIX,
        next,
        width = TICKET_NUMBER_WIDTH
    )
}

/// Timestamps to stamp alongside a status change. `resolved_at` is written
/// exactly once, on the first transition to RESOLVED; `closed_at` follows
/// the same rule for CLOSED. Already-set values are never overwritten.
fn resolution_stamps(
    incoming: Option<TicketStatus>,
    resolved_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let stamp_resolved =
        (incoming == Some(TicketStatus::Resolved) && resolved_at.is_none()).then_some(now);
    let stamp_closed =
        (incoming == Some(TicketStatus::Closed) && closed_at.is_none()).then_some(now);
    (stamp_resolved, stamp_closed)
}

fn user_summary(conn: &mut PgConnection, id: Uuid) -> QueryResult<UserSummary> {
    users::table
        .find(id)
        .select((users::id, users::name, users::email, users::image))
        .first(conn)
}

fn contact_summary(conn: &mut PgConnection, id: Uuid) -> QueryResult<ContactSummary> {
    contacts::table
        .find(id)
        .select((
            contacts::id,
            contacts::first_name,
            contacts::last_name,
            contacts::email,
        ))
        .first(conn)
}

fn company_summary(conn: &mut PgConnection, id: Uuid) -> QueryResult<CompanySummary> {
    companies::table
        .find(id)
        .select((companies::id, companies::name))
        .first(conn)
}

fn load_relations(conn: &mut PgConnection, ticket: Ticket) -> Result<TicketWithRelations, ApiError> {
    let contact = contact_summary(conn, ticket.contact_id)?;
    let company = ticket
        .company_id
        .map(|id| company_summary(conn, id))
        .transpose()?;
    let assigned_to = ticket
        .assigned_to_id
        .map(|id| user_summary(conn, id))
        .transpose()?;
    let created_by = user_summary(conn, ticket.created_by_id)?;
    Ok(TicketWithRelations {
        ticket,
        contact,
        company,
        assigned_to,
        created_by,
    })
}

fn insert_with_unique_number(
    conn: &mut PgConnection,
    req: &CreateTicketRequest,
    created_by: Uuid,
) -> Result<Ticket, ApiError> {
    use diesel::result::{DatabaseErrorKind, Error};

    for _ in 0..MAX_NUMBER_ATTEMPTS {
        let last: Option<String> = tickets::table
            .select(tickets::ticket_number)
            .order(tickets::ticket_number.desc())
            .first(conn)
            .optional()?;

        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            ticket_number: next_ticket_number(last.as_deref()),
            subject: req.subject.clone(),
            description: req.description.clone(),
            status: TicketStatus::default(),
            priority: req.priority.unwrap_or_default(),
            category: req.category.unwrap_or_default(),
            contact_id: req.contact_id,
            company_id: req.company_id,
            assigned_to_id: req.assigned_to_id,
            created_by_id: created_by,
            due_date: req.due_date,
            resolved_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };

        match diesel::insert_into(tickets::table)
            .values(&ticket)
            .execute(conn)
        {
            Ok(_) => return Ok(ticket),
            // Lost the number race to a concurrent create; recompute and retry.
            Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Database(
        "Could not allocate a unique ticket number".to_string(),
    ))
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketWithRelations>), ApiError> {
    if req.subject.trim().is_empty() || req.description.trim().is_empty() {
        return Err(ApiError::Validation(
            "Missing required fields: subject and description".to_string(),
        ));
    }

    let mut conn = state.conn.get()?;
    let ticket = insert_with_unique_number(&mut conn, &req, user.user_id)?;

    activity::record(
        &mut conn,
        &Activity::new(
            TYPE_TICKET,
            ACTION_CREATED,
            format!("Ticket {} created", ticket.ticket_number),
            user.user_id,
            Some(ticket.id),
        ),
    )?;

    let response = load_relations(&mut conn, ticket)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TicketListItem>>, ApiError> {
    let mut conn = state.conn.get()?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = tickets::table.into_boxed();
    if let Some(status) = query.status {
        q = q.filter(tickets::status.eq(status));
    }
    if let Some(priority) = query.priority {
        q = q.filter(tickets::priority.eq(priority));
    }
    if let Some(assigned_to) = query.assigned_to {
        q = q.filter(tickets::assigned_to_id.eq(assigned_to));
    }

    let rows: Vec<Ticket> = q
        .order(tickets::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)?;

    let mut items = Vec::with_capacity(rows.len());
    for ticket in rows {
        let contact = contact_summary(&mut conn, ticket.contact_id)?;
        let company = ticket
            .company_id
            .map(|id| company_summary(&mut conn, id))
            .transpose()?;
        let assigned_to = ticket
            .assigned_to_id
            .map(|id| user_summary(&mut conn, id))
            .transpose()?;
        let comment_count: i64 = comments::table
            .filter(comments::ticket_id.eq(ticket.id))
            .count()
            .get_result(&mut conn)?;
        items.push(TicketListItem {
            ticket,
            contact,
            company,
            assigned_to,
            comment_count,
        });
    }

    Ok(Json(items))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketDetail>, ApiError> {
    let mut conn = state.conn.get()?;

    let ticket: Ticket = tickets::table
        .find(id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    let relations = load_relations(&mut conn, ticket)?;

    let comment_rows: Vec<(Comment, UserSummary)> = comments::table
        .inner_join(users::table)
        .filter(comments::ticket_id.eq(id))
        .order(comments::created_at.asc())
        .select((
            comments::all_columns,
            (users::id, users::name, users::email, users::image),
        ))
        .load(&mut conn)?;

    let ticket_tag_rows: Vec<Tag> = ticket_tags::table
        .inner_join(tags::table)
        .filter(ticket_tags::ticket_id.eq(id))
        .select(tags::all_columns)
        .load(&mut conn)?;

    let activity_rows: Vec<(Activity, String)> = activities::table
        .inner_join(users::table)
        .filter(activities::ticket_id.eq(id))
        .order(activities::created_at.desc())
        .limit(20)
        .select((activities::all_columns, users::name))
        .load(&mut conn)?;

    Ok(Json(TicketDetail {
        ticket: relations.ticket,
        contact: relations.contact,
        company: relations.company,
        assigned_to: relations.assigned_to,
        created_by: relations.created_by,
        comments: comment_rows
            .into_iter()
            .map(|(comment, user)| CommentWithUser { comment, user })
            .collect(),
        tags: ticket_tag_rows,
        activities: activity_rows
            .into_iter()
            .map(|(activity, user_name)| ActivityEntry {
                activity,
                user_name,
            })
            .collect(),
    }))
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTicketRequest>,
) -> Result<Json<TicketWithRelations>, ApiError> {
    let mut conn = state.conn.get()?;

    let existing: Ticket = tickets::table
        .find(id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    // Raw payload is preserved as audit metadata before the struct is
    // consumed by the changeset.
    let payload = serde_json::to_value(&req)
        .map_err(|e| ApiError::Database(format!("Failed to serialize update payload: {e}")))?;

    let now = Utc::now();
    let (resolved_at, closed_at) =
        resolution_stamps(req.status, existing.resolved_at, existing.closed_at, now);

    let changes = TicketChanges {
        subject: req.subject,
        description: req.description,
        status: req.status,
        priority: req.priority,
        category: req.category,
        assigned_to_id: req.assigned_to_id,
        due_date: req.due_date,
        resolved_at,
        closed_at,
        updated_at: now,
    };

    diesel::update(tickets::table.find(id))
        .set(&changes)
        .execute(&mut conn)?;

    let updated: Ticket = tickets::table.find(id).first(&mut conn)?;

    activity::record(
        &mut conn,
        &Activity::new(
            TYPE_TICKET,
            ACTION_UPDATED,
            format!("Ticket {} updated", updated.ticket_number),
            user.user_id,
            Some(id),
        )
        .with_metadata(payload),
    )?;

    let response = load_relations(&mut conn, updated)?;
    Ok(Json(response))
}

pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require_admin()?;

    let mut conn = state.conn.get()?;
    let deleted = diesel::delete(tickets::table.find(id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Ticket not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentWithUser>), ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation(
            "Comment content is required".to_string(),
        ));
    }

    let mut conn = state.conn.get()?;

    let ticket_number: String = tickets::table
        .find(ticket_id)
        .select(tickets::ticket_number)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    let is_internal = req.is_internal.unwrap_or(false);
    let comment = Comment {
        id: Uuid::new_v4(),
        ticket_id,
        user_id: user.user_id,
        content: content.to_string(),
        is_internal,
        created_at: Utc::now(),
    };

    diesel::insert_into(comments::table)
        .values(&comment)
        .execute(&mut conn)?;

    let visibility = if is_internal { "internal " } else { "" };
    activity::record(
        &mut conn,
        &Activity::new(
            TYPE_COMMENT,
            ACTION_CREATED,
            format!("Added a {visibility}comment to ticket {ticket_number}"),
            user.user_id,
            Some(ticket_id),
        ),
    )?;

    let author = user_summary(&mut conn, user.user_id)?;
    Ok((StatusCode::CREATED, Json(CommentWithUser { comment, user: author })))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Vec<CommentWithUser>>, ApiError> {
    let mut conn = state.conn.get()?;

    let rows: Vec<(Comment, UserSummary)> = comments::table
        .inner_join(users::table)
        .filter(comments::ticket_id.eq(ticket_id))
        .order(comments::created_at.asc())
        .select((
            comments::all_columns,
            (users::id, users::name, users::email, users::image),
        ))
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|(comment, user)| CommentWithUser { comment, user })
            .collect(),
    ))
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route(
            "/api/tickets/:id",
            get(get_ticket).patch(update_ticket).delete(delete_ticket),
        )
        .route(
            "/api/tickets/:id/comments",
            get(list_comments).post(add_comment),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ticket_number_starts_the_sequence() {
        assert_eq!(next_ticket_number(None), "T-0001");
    }

    #[test]
    fn ticket_numbers_increment_from_the_last_assigned() {
        assert_eq!(next_ticket_number(Some("T-0001")), "T-0002");
        assert_eq!(next_ticket_number(Some("T-0041")), "T-0042");
        assert_eq!(next_ticket_number(Some("T-0999")), "T-1000");
    }

    #[test]
    fn ticket_numbers_grow_past_the_padding_width() {
        assert_eq!(next_ticket_number(Some("T-9999")), "T-10000");
        assert_eq!(next_ticket_number(Some("T-10000")), "T-10001");
    }

    #[test]
    fn unparseable_last_number_restarts_at_one() {
        assert_eq!(next_ticket_number(Some("garbage")), "T-0001");
        assert_eq!(next_ticket_number(Some("T-")), "T-0001");
    }

    #[test]
    fn sequential_creation_yields_one_through_n() {
        let mut last: Option<String> = None;
        let numbers: Vec<String> = (0..5)
            .map(|_| {
                let number = next_ticket_number(last.as_deref());
                last = Some(number.clone());
                number
            })
            .collect();
        assert_eq!(numbers, ["T-0001", "T-0002", "T-0003", "T-0004", "T-0005"]);
    }

    #[test]
    fn resolving_stamps_resolved_at_once() {
        let now = Utc::now();
        let (resolved, closed) =
            resolution_stamps(Some(TicketStatus::Resolved), None, None, now);
        assert_eq!(resolved, Some(now));
        assert_eq!(closed, None);
    }

    #[test]
    fn repeated_resolved_updates_leave_the_stamp_unchanged() {
        let first = Utc::now();
        let later = first + chrono::Duration::hours(3);
        let (resolved, _) =
            resolution_stamps(Some(TicketStatus::Resolved), Some(first), None, later);
        assert_eq!(resolved, None, "existing resolved_at must not be overwritten");
    }

    #[test]
    fn closing_a_resolved_ticket_keeps_both_stamps() {
        let resolved_at = Utc::now();
        let close_time = resolved_at + chrono::Duration::days(1);
        let (resolved, closed) = resolution_stamps(
            Some(TicketStatus::Closed),
            Some(resolved_at),
            None,
            close_time,
        );
        assert_eq!(resolved, None);
        assert_eq!(closed, Some(close_time));
    }

    #[test]
    fn non_status_updates_never_stamp_timestamps() {
        let now = Utc::now();
        assert_eq!(resolution_stamps(None, None, None, now), (None, None));
        assert_eq!(
            resolution_stamps(Some(TicketStatus::InProgress), None, None, now),
            (None, None)
        );
    }
}
