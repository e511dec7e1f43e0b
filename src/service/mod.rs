pub mod analytics;
pub mod background_jobs;
pub mod error;
pub mod lifecycle;
pub mod notification_service;
pub mod realtime;
pub mod session;
pub mod sla;
pub mod storage;
pub mod ticket_service;
