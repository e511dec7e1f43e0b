//! SLA deadlines and the countdown shown next to each ticket.
//!
//! Everything here is a pure function of timestamps. Callers pass `now` so
//! the countdown is recomputed on every read instead of being cached.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ticketmodel::Ticket;

/// Remaining time under which an unbreached ticket is flagged as urgent.
pub const URGENT_THRESHOLD_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaState {
    Breached,
    Urgent,
    OnTrack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaCountdown {
    pub state: SlaState,
    pub hours_remaining: i64,
    pub minutes_remaining: i64,
    pub label: String,
}

pub fn due_date(created_at: DateTime<Utc>, resolution_time_hours: i32) -> DateTime<Utc> {
    created_at + Duration::hours(i64::from(resolution_time_hours))
}

pub fn classify(due: DateTime<Utc>, now: DateTime<Utc>) -> SlaState {
    let remaining = due - now;
    if remaining < Duration::zero() {
        SlaState::Breached
    } else if remaining < Duration::hours(URGENT_THRESHOLD_HOURS) {
        SlaState::Urgent
    } else {
        SlaState::OnTrack
    }
}

pub fn countdown(due: DateTime<Utc>, now: DateTime<Utc>) -> SlaCountdown {
    let state = classify(due, now);
    let remaining = due - now;

    match state {
        SlaState::Breached => SlaCountdown {
            state,
            hours_remaining: 0,
            minutes_remaining: 0,
            label: "SLA Breached".to_string(),
        },
        _ => {
            let hours = remaining.num_hours();
            let minutes = remaining.num_minutes() - hours * 60;
            SlaCountdown {
                state,
                hours_remaining: hours,
                minutes_remaining: minutes,
                label: format!("{}h {}m remaining", hours, minutes),
            }
        }
    }
}

/// True once the deadline has passed while the ticket is still open.
pub fn is_breached(ticket: &Ticket, now: DateTime<Utc>) -> bool {
    now > ticket.sla_due_date && !ticket.status.is_finished()
}
