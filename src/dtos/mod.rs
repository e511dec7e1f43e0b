pub mod profiledtos;
pub mod ticketdtos;
