//! Guards that decide which actions a ticket currently allows.
//!
//! Status moves themselves are checked with [`TicketStatus::can_transition_to`].

use crate::models::{
    profilemodel::Profile,
    ticketmodel::{Ticket, TicketFeedback, TicketStatus},
};

/// The "Assign to Me" guard: only unassigned tickets that are still new.
pub fn can_assign(ticket: &Ticket) -> bool {
    ticket.assigned_to.is_none() && ticket.status == TicketStatus::New
}

pub fn feedback_eligible(ticket: &Ticket, existing: Option<&TicketFeedback>) -> bool {
    ticket.status == TicketStatus::Closed && existing.is_none()
}

/// Chat stays writable until the ticket is closed.
pub fn chat_open(ticket: &Ticket) -> bool {
    ticket.status != TicketStatus::Closed
}

/// Owners see their own tickets, the IT team sees everything.
pub fn can_view(ticket: &Ticket, viewer: &Profile) -> bool {
    viewer.role.is_it_team() || ticket.user_id == viewer.id
}

pub fn is_assignee(ticket: &Ticket, agent: &Profile) -> bool {
    ticket.assigned_to == Some(agent.id)
}
