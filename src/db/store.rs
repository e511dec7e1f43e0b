use super::{
    attachmentdb::AttachmentExt, chatdb::ChatExt, feedbackdb::FeedbackExt,
    profiledb::ProfileExt, ticketdb::TicketExt,
};

/// Everything the ticket lifecycle needs from persistence, as one object-safe seam.
pub trait DeskStore: ProfileExt + TicketExt + ChatExt + FeedbackExt + AttachmentExt {}

impl<T> DeskStore for T where T: ProfileExt + TicketExt + ChatExt + FeedbackExt + AttachmentExt {}
