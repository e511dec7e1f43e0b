pub mod attachmentdb;
pub mod chatdb;
pub mod db;
pub mod feedbackdb;
#[cfg(test)]
pub mod memory;
pub mod profiledb;
pub mod store;
pub mod ticketdb;
