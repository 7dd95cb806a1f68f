//! Dashboard metrics aggregation: a read-only snapshot computed fresh on
//! every request. All-or-nothing — any failed query fails the whole
//! snapshot, partial results are never returned.

use axum::{extract::State, Json};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::activity::Activity;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{TicketPriority, TicketStatus};
use crate::schema::{activities, companies, contacts, tickets, users};
use crate::state::AppState;

const RESOLVED_WINDOW_DAYS: i64 = 7;
const TIME_SERIES_WINDOW_DAYS: i64 = 30;
const RESOLUTION_SAMPLE_SIZE: i64 = 100;
const TOP_AGENT_COUNT: i64 = 5;
const ACTIVITY_FEED_SIZE: i64 = 10;

#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub metrics: Metrics,
    pub charts: Charts,
    pub activities: Vec<ActivityFeedItem>,
}

#[derive(Debug, Serialize)]
pub struct Metrics {
    pub total_open_tickets: i64,
    pub pending_tickets: i64,
    pub resolved_this_week: i64,
    pub average_resolution_time: String,
    /// Placeholder until survey records are collected.
    pub customer_satisfaction: f64,
    /// Placeholder until derived from first-comment timestamps.
    pub first_response_time: String,
    pub active_customers: i64,
    pub total_contacts: i64,
    pub total_companies: i64,
    pub total_tickets: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ChartPoint {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct AgentRanking {
    pub name: String,
    pub resolved: i64,
}

#[derive(Debug, Serialize)]
pub struct Charts {
    pub tickets_by_status: Vec<ChartPoint>,
    pub tickets_by_priority: Vec<ChartPoint>,
    pub tickets_over_time: Vec<TimeSeriesPoint>,
    pub top_agents: Vec<AgentRanking>,
}

#[derive(Debug, Serialize)]
pub struct ActivityFeedItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub action: String,
    pub description: String,
    pub user_name: String,
    pub user_image: Option<String>,
    pub ticket_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Mean of (resolved − created) in fractional days; 0 when nothing has been
/// resolved yet.
fn average_resolution_days(pairs: &[(DateTime<Utc>, DateTime<Utc>)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let total_ms: i64 = pairs
        .iter()
        .map(|(created, resolved)| (*resolved - *created).num_milliseconds())
        .sum();
    total_ms as f64 / pairs.len() as f64 / (1000.0 * 60.0 * 60.0 * 24.0)
}

fn format_resolution_time(days: f64) -> String {
    format!("{days:.1} days")
}

/// Buckets creation instants by calendar day, ascending. Days with no
/// tickets are omitted (sparse series).
fn bucket_by_day(timestamps: &[DateTime<Utc>]) -> Vec<TimeSeriesPoint> {
    let mut buckets: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for ts in timestamps {
        *buckets.entry(ts.date_naive()).or_insert(0) += 1;
    }
    buckets
        .into_iter()
        .map(|(date, count)| TimeSeriesPoint { date, count })
        .collect()
}

fn count_by_status(conn: &mut PgConnection, status: TicketStatus) -> QueryResult<i64> {
    tickets::table
        .filter(tickets::status.eq(status))
        .count()
        .get_result(conn)
}

fn compute_snapshot(conn: &mut PgConnection) -> QueryResult<DashboardSnapshot> {
    let now = Utc::now();

    let total_open_tickets = count_by_status(conn, TicketStatus::Open)?;
    let in_progress = count_by_status(conn, TicketStatus::InProgress)?;
    let waiting = count_by_status(conn, TicketStatus::WaitingForCustomer)?;

    let week_cutoff = now - Duration::days(RESOLVED_WINDOW_DAYS);
    let resolved_this_week: i64 = tickets::table
        .filter(tickets::status.eq(TicketStatus::Resolved))
        .filter(tickets::resolved_at.ge(week_cutoff))
        .count()
        .get_result(conn)?;

    let total_tickets: i64 = tickets::table.count().get_result(conn)?;
    let total_contacts: i64 = contacts::table.count().get_result(conn)?;
    let total_companies: i64 = companies::table.count().get_result(conn)?;

    let resolved_rows: Vec<(DateTime<Utc>, Option<DateTime<Utc>>)> = tickets::table
        .filter(tickets::status.eq(TicketStatus::Resolved))
        .filter(tickets::resolved_at.is_not_null())
        .order(tickets::resolved_at.desc())
        .limit(RESOLUTION_SAMPLE_SIZE)
        .select((tickets::created_at, tickets::resolved_at))
        .load(conn)?;
    let resolved_pairs: Vec<(DateTime<Utc>, DateTime<Utc>)> = resolved_rows
        .into_iter()
        .filter_map(|(created, resolved)| resolved.map(|r| (created, r)))
        .collect();
    let average_resolution_time = format_resolution_time(average_resolution_days(&resolved_pairs));

    let by_status: Vec<(TicketStatus, i64)> = tickets::table
        .group_by(tickets::status)
        .select((tickets::status, count_star()))
        .load(conn)?;
    let tickets_by_status = by_status
        .into_iter()
        .map(|(status, value)| ChartPoint {
            name: status.label(),
            value,
        })
        .collect();

    let by_priority: Vec<(TicketPriority, i64)> = tickets::table
        .group_by(tickets::priority)
        .select((tickets::priority, count_star()))
        .load(conn)?;
    let tickets_by_priority = by_priority
        .into_iter()
        .map(|(priority, value)| ChartPoint {
            name: priority.label(),
            value,
        })
        .collect();

    let series_cutoff = now - Duration::days(TIME_SERIES_WINDOW_DAYS);
    let created_instants: Vec<DateTime<Utc>> = tickets::table
        .filter(tickets::created_at.ge(series_cutoff))
        .select(tickets::created_at)
        .load(conn)?;
    let tickets_over_time = bucket_by_day(&created_instants);

    let agent_rows: Vec<(Option<Uuid>, i64)> = tickets::table
        .filter(tickets::status.eq(TicketStatus::Resolved))
        .filter(tickets::assigned_to_id.is_not_null())
        .group_by(tickets::assigned_to_id)
        .select((tickets::assigned_to_id, count_star()))
        .order(count_star().desc())
        .limit(TOP_AGENT_COUNT)
        .load(conn)?;
    let mut top_agents = Vec::with_capacity(agent_rows.len());
    for (agent_id, resolved) in agent_rows {
        let Some(agent_id) = agent_id else { continue };
        let name: String = users::table
            .find(agent_id)
            .select(users::name)
            .first(conn)?;
        top_agents.push(AgentRanking { name, resolved });
    }

    let feed_rows: Vec<(Activity, String, Option<String>, Option<String>)> = activities::table
        .inner_join(users::table)
        .left_join(tickets::table)
        .order(activities::created_at.desc())
        .limit(ACTIVITY_FEED_SIZE)
        .select((
            activities::all_columns,
            users::name,
            users::image,
            tickets::ticket_number.nullable(),
        ))
        .load(conn)?;
    let feed = feed_rows
        .into_iter()
        .map(|(activity, user_name, user_image, ticket_number)| ActivityFeedItem {
            id: activity.id,
            activity_type: activity.activity_type,
            action: activity.action,
            description: activity.description,
            user_name,
            user_image,
            ticket_number,
            created_at: activity.created_at,
        })
        .collect();

    Ok(DashboardSnapshot {
        metrics: Metrics {
            total_open_tickets,
            pending_tickets: in_progress + waiting,
            resolved_this_week,
            average_resolution_time,
            customer_satisfaction: 4.5,
            first_response_time: "2.5 hours".to_string(),
            active_customers: total_contacts,
            total_contacts,
            total_companies,
            total_tickets,
        },
        charts: Charts {
            tickets_by_status,
            tickets_by_priority,
            tickets_over_time,
            top_agents,
        },
        activities: feed,
    })
}

pub async fn get_dashboard_metrics(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Aggregation(e.to_string()))?;
    let snapshot =
        compute_snapshot(&mut conn).map_err(|e| ApiError::Aggregation(e.to_string()))?;
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn average_over_zero_resolved_tickets_is_exactly_zero() {
        assert_eq!(average_resolution_days(&[]), 0.0);
        assert_eq!(format_resolution_time(average_resolution_days(&[])), "0.0 days");
    }

    #[test]
    fn average_resolution_is_in_fractional_days() {
        let pairs = vec![
            (ts(2026, 8, 1, 0), ts(2026, 8, 4, 0)),  // 3 days
            (ts(2026, 8, 1, 0), ts(2026, 8, 2, 0)),  // 1 day
        ];
        let avg = average_resolution_days(&pairs);
        assert!((avg - 2.0).abs() < 1e-9);
        assert_eq!(format_resolution_time(avg), "2.0 days");
    }

    #[test]
    fn resolution_time_formats_to_one_decimal_place() {
        let pairs = vec![(ts(2026, 8, 1, 0), ts(2026, 8, 4, 12))]; // 3.5 days
        assert_eq!(
            format_resolution_time(average_resolution_days(&pairs)),
            "3.5 days"
        );
    }

    #[test]
    fn day_buckets_are_ascending_and_sparse() {
        let instants = vec![
            ts(2026, 8, 20, 9),
            ts(2026, 8, 18, 23),
            ts(2026, 8, 20, 14),
            ts(2026, 8, 15, 1),
        ];
        let series = bucket_by_day(&instants);
        assert_eq!(
            series,
            vec![
                TimeSeriesPoint {
                    date: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
                    count: 1,
                },
                TimeSeriesPoint {
                    date: NaiveDate::from_ymd_opt(2026, 8, 18).unwrap(),
                    count: 1,
                },
                TimeSeriesPoint {
                    date: NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
                    count: 2,
                },
            ]
        );
    }

    #[test]
    fn bucketing_uses_the_calendar_day_not_the_time() {
        let instants = vec![ts(2026, 8, 20, 0), ts(2026, 8, 20, 23)];
        let series = bucket_by_day(&instants);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].count, 2);
    }

    #[test]
    fn empty_window_yields_an_empty_series() {
        assert!(bucket_by_day(&[]).is_empty());
    }
}
