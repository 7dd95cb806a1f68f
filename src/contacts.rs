//! Contact reads and the one non-trivial guard outside the ticket core:
//! a contact with associated tickets cannot be deleted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{CompanySummary, Contact, TicketPriority, TicketStatus};
use crate::schema::{companies, contacts, tickets};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ContactListItem {
    #[serde(flatten)]
    pub contact: Contact,
    pub company: Option<CompanySummary>,
    pub ticket_count: i64,
}

#[derive(Debug, Serialize, Queryable)]
pub struct ContactTicketSummary {
    pub id: Uuid,
    pub ticket_number: String,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ContactDetail {
    #[serde(flatten)]
    pub contact: Contact,
    pub company: Option<CompanySummary>,
    pub tickets: Vec<ContactTicketSummary>,
}

fn company_summary(
    conn: &mut PgConnection,
    id: Option<Uuid>,
) -> QueryResult<Option<CompanySummary>> {
    id.map(|id| {
        companies::table
            .find(id)
            .select((companies::id, companies::name))
            .first(conn)
    })
    .transpose()
}

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<Json<Vec<ContactListItem>>, ApiError> {
    let mut conn = state.conn.get()?;

    let rows: Vec<Contact> = contacts::table
        .order(contacts::created_at.desc())
        .load(&mut conn)?;

    let mut items = Vec::with_capacity(rows.len());
    for contact in rows {
        let company = company_summary(&mut conn, contact.company_id)?;
        let ticket_count: i64 = tickets::table
            .filter(tickets::contact_id.eq(contact.id))
            .count()
            .get_result(&mut conn)?;
        items.push(ContactListItem {
            contact,
            company,
            ticket_count,
        });
    }

    Ok(Json(items))
}

pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactDetail>, ApiError> {
    let mut conn = state.conn.get()?;

    let contact: Contact = contacts::table
        .find(id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Contact not found".to_string()))?;

    let company = company_summary(&mut conn, contact.company_id)?;

    let contact_tickets: Vec<ContactTicketSummary> = tickets::table
        .filter(tickets::contact_id.eq(id))
        .order(tickets::created_at.desc())
        .select((
            tickets::id,
            tickets::ticket_number,
            tickets::subject,
            tickets::status,
            tickets::priority,
            tickets::created_at,
        ))
        .load(&mut conn)?;

    Ok(Json(ContactDetail {
        contact,
        company,
        tickets: contact_tickets,
    }))
}

/// Deletion is refused while tickets still reference the contact; the error
/// carries the exact blocking count so the caller can reassign first.
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.conn.get()?;

    let exists: Option<Uuid> = contacts::table
        .find(id)
        .select(contacts::id)
        .first(&mut conn)
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::NotFound("Contact not found".to_string()));
    }

    let ticket_count: i64 = tickets::table
        .filter(tickets::contact_id.eq(id))
        .count()
        .get_result(&mut conn)?;
    if ticket_count > 0 {
        return Err(ApiError::Dependency(ticket_count));
    }

    diesel::delete(contacts::table.find(id)).execute(&mut conn)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_contacts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/contacts", get(list_contacts))
        .route(
            "/api/contacts/:id",
            get(get_contact).delete(delete_contact),
        )
}
