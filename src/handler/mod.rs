pub mod analytics;
pub mod attachments;
pub mod auth;
pub mod chat;
pub mod feedback;
pub mod functions;
pub mod profiles;
pub mod realtime;
pub mod tickets;
