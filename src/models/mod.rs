pub mod profilemodel;
pub mod ticketmodel;
