//! Derived statistics for the analytics and team performance views.
//!
//! All functions are pure over the tickets already loaded for the caller's
//! scope. Percentages are whole numbers and an empty input never divides
//! by zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    profilemodel::Profile,
    ticketmodel::{TicketFeedback, TicketPriority, TicketStatus, TicketWithDetails},
};

pub const RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BreakdownEntry {
    pub key: String,
    pub count: usize,
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentStats {
    pub id: Uuid,
    pub name: String,
    pub total_tickets: usize,
    pub resolved_tickets: usize,
    pub pending_tickets: usize,
    pub sla_breached: usize,
    pub sla_score: i64,
    pub avg_resolution_hours: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryStats {
    pub name: String,
    pub total: usize,
    pub resolved: usize,
    pub breached: usize,
    pub resolution_rate: i64,
    pub sla_rate: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalyticsSummary {
    pub total_tickets: usize,
    pub recent_tickets: usize,
    pub sla_breached: usize,
    pub resolution_rate: i64,
    pub team_sla_score: i64,
    pub average_rating: f64,
    pub feedback_count: usize,
    pub status_breakdown: Vec<BreakdownEntry>,
    pub priority_breakdown: Vec<BreakdownEntry>,
    pub category_breakdown: Vec<BreakdownEntry>,
    pub category_stats: Vec<CategoryStats>,
    pub agents: Vec<AgentStats>,
}

/// `round(count / total * 100)`, or 0 for an empty total.
pub fn percentage(count: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as i64
}

fn breakdown<I>(counts: I, total: usize) -> Vec<BreakdownEntry>
where
    I: IntoIterator<Item = (String, usize)>,
{
    counts
        .into_iter()
        .map(|(key, count)| BreakdownEntry {
            key,
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

/// One entry per status, zero counts included.
pub fn status_breakdown(tickets: &[TicketWithDetails]) -> Vec<BreakdownEntry> {
    let counts = TicketStatus::ALL.iter().map(|status| {
        let count = tickets.iter().filter(|t| t.ticket.status == *status).count();
        (status.to_str().to_string(), count)
    });
    breakdown(counts, tickets.len())
}

pub fn priority_breakdown(tickets: &[TicketWithDetails]) -> Vec<BreakdownEntry> {
    let counts = TicketPriority::ALL.iter().map(|priority| {
        let count = tickets
            .iter()
            .filter(|t| t.ticket.priority == *priority)
            .count();
        (priority.to_str().to_string(), count)
    });
    breakdown(counts, tickets.len())
}

/// Categories that actually occur, sorted by name.
pub fn category_breakdown(tickets: &[TicketWithDetails]) -> Vec<BreakdownEntry> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for t in tickets {
        *counts.entry(category_name(t)).or_default() += 1;
    }
    breakdown(counts, tickets.len())
}

fn category_name(ticket: &TicketWithDetails) -> String {
    if ticket.category_name.is_empty() {
        "Unknown".to_string()
    } else {
        ticket.category_name.clone()
    }
}

pub fn resolution_rate(tickets: &[TicketWithDetails]) -> i64 {
    let resolved = tickets.iter().filter(|t| t.ticket.status.is_finished()).count();
    percentage(resolved, tickets.len())
}

/// Share of tickets that did not breach. 100 when there are no tickets.
pub fn team_sla_score(tickets: &[TicketWithDetails]) -> i64 {
    sla_score(tickets.len(), breached_count(tickets))
}

fn sla_score(total: usize, breached: usize) -> i64 {
    if total == 0 {
        return 100;
    }
    percentage(total - breached, total)
}

fn breached_count(tickets: &[TicketWithDetails]) -> usize {
    tickets.iter().filter(|t| t.ticket.sla_breached).count()
}

/// Mean hours from creation to resolution over finished tickets, 0 when none.
pub fn average_resolution_hours(tickets: &[&TicketWithDetails]) -> f64 {
    let finished: Vec<_> = tickets
        .iter()
        .filter(|t| t.ticket.status.is_finished())
        .collect();
    if finished.is_empty() {
        return 0.0;
    }

    let total_hours: f64 = finished
        .iter()
        .map(|t| {
            let ended = t
                .ticket
                .resolved_at
                .or(t.ticket.closed_at)
                .unwrap_or(t.ticket.updated_at);
            (ended - t.ticket.created_at).num_seconds() as f64 / 3600.0
        })
        .sum();

    total_hours / finished.len() as f64
}

/// Per-agent stats for every IT member, best SLA score first. Ties keep the
/// input order.
pub fn agent_stats(tickets: &[TicketWithDetails], agents: &[Profile]) -> Vec<AgentStats> {
    let mut stats: Vec<AgentStats> = agents
        .iter()
        .map(|agent| {
            let assigned: Vec<&TicketWithDetails> = tickets
                .iter()
                .filter(|t| t.ticket.assigned_to == Some(agent.id))
                .collect();
            let resolved = assigned.iter().filter(|t| t.ticket.status.is_finished()).count();
            let breached = assigned.iter().filter(|t| t.ticket.sla_breached).count();

            AgentStats {
                id: agent.id,
                name: agent.full_name.clone(),
                total_tickets: assigned.len(),
                resolved_tickets: resolved,
                pending_tickets: assigned.len() - resolved,
                sla_breached: breached,
                sla_score: sla_score(assigned.len(), breached),
                avg_resolution_hours: average_resolution_hours(&assigned),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.sla_score.cmp(&a.sla_score));
    stats
}

pub fn category_stats(tickets: &[TicketWithDetails]) -> Vec<CategoryStats> {
    let mut grouped: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
    for t in tickets {
        let entry = grouped.entry(category_name(t)).or_default();
        entry.0 += 1;
        if t.ticket.status.is_finished() {
            entry.1 += 1;
        }
        if t.ticket.sla_breached {
            entry.2 += 1;
        }
    }

    grouped
        .into_iter()
        .map(|(name, (total, resolved, breached))| CategoryStats {
            name,
            total,
            resolved,
            breached,
            resolution_rate: percentage(resolved, total),
            sla_rate: sla_score(total, breached),
        })
        .collect()
}

/// Mean rating rounded to one decimal, 0 when there is no feedback.
pub fn average_rating(feedback: &[TicketFeedback]) -> f64 {
    if feedback.is_empty() {
        return 0.0;
    }
    let sum: f64 = feedback.iter().map(|f| f64::from(f.rating)).sum();
    (sum / feedback.len() as f64 * 10.0).round() / 10.0
}

pub fn recent_count(tickets: &[TicketWithDetails], now: DateTime<Utc>) -> usize {
    let since = now - Duration::days(RECENT_WINDOW_DAYS);
    tickets
        .iter()
        .filter(|t| t.ticket.created_at >= since)
        .count()
}

pub fn summarize(
    tickets: &[TicketWithDetails],
    agents: &[Profile],
    feedback: &[TicketFeedback],
    now: DateTime<Utc>,
) -> AnalyticsSummary {
    AnalyticsSummary {
        total_tickets: tickets.len(),
        recent_tickets: recent_count(tickets, now),
        sla_breached: breached_count(tickets),
        resolution_rate: resolution_rate(tickets),
        team_sla_score: team_sla_score(tickets),
        average_rating: average_rating(feedback),
        feedback_count: feedback.len(),
        status_breakdown: status_breakdown(tickets),
        priority_breakdown: priority_breakdown(tickets),
        category_breakdown: category_breakdown(tickets),
        category_stats: category_stats(tickets),
        agents: agent_stats(tickets, agents),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{profilemodel::UserRole, ticketmodel::Ticket};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn agent(name: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: format!("{}@corp.test", name.to_lowercase()),
            full_name: name.to_string(),
            role: UserRole::ItTeam,
            created_at: now(),
        }
    }

    fn ticket(
        category: &str,
        status: TicketStatus,
        assignee: Option<Uuid>,
        breached: bool,
    ) -> TicketWithDetails {
        let created = now() - Duration::hours(10);
        TicketWithDetails {
            ticket: Ticket {
                id: Uuid::new_v4(),
                ticket_number: "TKT-000001".to_string(),
                user_id: Uuid::new_v4(),
                category_id: Uuid::new_v4(),
                title: "Laptop".to_string(),
                description: "Won't boot".to_string(),
                status,
                priority: TicketPriority::Medium,
                assigned_to: assignee,
                created_at: created,
                updated_at: created,
                resolved_at: None,
                closed_at: None,
                sla_due_date: created + Duration::hours(24),
                sla_breached: breached,
            },
            category_name: category.to_string(),
            resolution_time_hours: 24,
            owner_name: "Owner".to_string(),
            owner_email: "owner@corp.test".to_string(),
            assignee_name: None,
        }
    }

    #[test]
    fn percentages_of_empty_input_are_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert!(status_breakdown(&[]).iter().all(|e| e.percentage == 0));
        assert_eq!(resolution_rate(&[]), 0);
        assert_eq!(team_sla_score(&[]), 100);
    }

    #[test]
    fn status_breakdown_counts_sum_to_total() {
        let tickets = vec![
            ticket("Hardware", TicketStatus::New, None, false),
            ticket("Hardware", TicketStatus::New, None, false),
            ticket("Network", TicketStatus::Closed, None, false),
        ];
        let breakdown = status_breakdown(&tickets);
        let sum: usize = breakdown.iter().map(|e| e.count).sum();
        assert_eq!(sum, tickets.len());

        let new = breakdown.iter().find(|e| e.key == "new").unwrap();
        assert_eq!(new.percentage, 67);
        let closed = breakdown.iter().find(|e| e.key == "closed").unwrap();
        assert_eq!(closed.percentage, 33);
    }

    #[test]
    fn agent_without_tickets_scores_full_marks() {
        let idle = agent("Idle");
        let stats = agent_stats(&[], &[idle]);
        assert_eq!(stats[0].sla_score, 100);
        assert_eq!(stats[0].avg_resolution_hours, 0.0);
    }

    #[test]
    fn agent_score_rounds_breach_ratio() {
        let a = agent("Ada");
        let tickets = vec![
            ticket("Software", TicketStatus::InProgress, Some(a.id), true),
            ticket("Software", TicketStatus::InProgress, Some(a.id), false),
            ticket("Software", TicketStatus::InProgress, Some(a.id), false),
        ];
        let stats = agent_stats(&tickets, &[a]);
        assert_eq!(stats[0].sla_score, 67);
        assert_eq!(stats[0].pending_tickets, 3);
        assert_eq!(stats[0].sla_breached, 1);
    }

    #[test]
    fn leaderboard_is_sorted_by_score_and_stable() {
        let slow = agent("Slow");
        let first_idle = agent("First");
        let second_idle = agent("Second");
        let tickets = vec![ticket("Access", TicketStatus::New, Some(slow.id), true)];

        let stats = agent_stats(
            &tickets,
            &[slow.clone(), first_idle.clone(), second_idle.clone()],
        );
        let order: Vec<Uuid> = stats.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![first_idle.id, second_idle.id, slow.id]);
    }

    #[test]
    fn resolution_time_falls_back_to_closed_then_updated() {
        let a = agent("Grace");
        let mut resolved = ticket("Hardware", TicketStatus::Resolved, Some(a.id), false);
        resolved.ticket.resolved_at = Some(resolved.ticket.created_at + Duration::hours(4));
        let mut closed = ticket("Hardware", TicketStatus::Closed, Some(a.id), false);
        closed.ticket.closed_at = Some(closed.ticket.created_at + Duration::hours(8));
        let mut bare = ticket("Hardware", TicketStatus::Closed, Some(a.id), false);
        bare.ticket.updated_at = bare.ticket.created_at + Duration::hours(6);

        let stats = agent_stats(&[resolved, closed, bare], &[a]);
        assert!((stats[0].avg_resolution_hours - 6.0).abs() < f64::EPSILON);
        assert_eq!(stats[0].resolved_tickets, 3);
    }

    #[test]
    fn category_stats_group_by_name() {
        let tickets = vec![
            ticket("Network", TicketStatus::Resolved, None, false),
            ticket("Network", TicketStatus::New, None, true),
            ticket("", TicketStatus::New, None, false),
        ];
        let stats = category_stats(&tickets);
        let network = stats.iter().find(|s| s.name == "Network").unwrap();
        assert_eq!((network.total, network.resolved, network.breached), (2, 1, 1));
        assert_eq!(network.resolution_rate, 50);
        assert_eq!(network.sla_rate, 50);
        assert!(stats.iter().any(|s| s.name == "Unknown"));
    }

    #[test]
    fn average_rating_and_recent_window() {
        let feedback: Vec<TicketFeedback> = [5, 4, 4]
            .iter()
            .map(|r| TicketFeedback {
                id: Uuid::new_v4(),
                ticket_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                rating: *r,
                comments: String::new(),
                created_at: now(),
            })
            .collect();
        assert_eq!(average_rating(&feedback), 4.3);
        assert_eq!(average_rating(&[]), 0.0);

        let mut old = ticket("Other", TicketStatus::New, None, false);
        old.ticket.created_at = now() - Duration::days(45);
        let fresh = ticket("Other", TicketStatus::New, None, false);
        assert_eq!(recent_count(&[old, fresh], now()), 1);
    }

    #[test]
    fn summary_bundles_everything() {
        let a = agent("Linus");
        let tickets = vec![
            ticket("Hardware", TicketStatus::Closed, Some(a.id), false),
            ticket("Hardware", TicketStatus::New, None, true),
        ];
        let summary = summarize(&tickets, &[a], &[], now());
        assert_eq!(summary.total_tickets, 2);
        assert_eq!(summary.resolution_rate, 50);
        assert_eq!(summary.team_sla_score, 50);
        assert_eq!(summary.sla_breached, 1);
        assert_eq!(summary.agents.len(), 1);
        assert_eq!(summary.priority_breakdown.len(), 4);
    }
}
