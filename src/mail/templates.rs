//! HTML bodies for the ticket notifications. Every interpolated value is
//! escaped before it lands in the markup.

use ammonia::clean_text;

const BASE_STYLE: &str = r#"
      body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
      .container { max-width: 600px; margin: 0 auto; padding: 20px; }
      .content { background: #f9fafb; padding: 30px; border: 1px solid #e5e7eb; border-top: none; }
      .footer { text-align: center; padding: 20px; color: #6b7280; font-size: 14px; }"#;

fn render(accent: &str, heading: &str, body: &str, footer: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <style>{base}
      .header {{ background: {accent}; color: white; padding: 30px; text-align: center; border-radius: 8px 8px 0 0; }}
      .ticket-info {{ background: white; padding: 20px; border-radius: 8px; margin: 20px 0; border-left: 4px solid {accent}; }}
    </style>
  </head>
  <body>
    <div class="container">
      <div class="header"><h1>{heading}</h1></div>
      <div class="content">{body}</div>
      <div class="footer"><p>{footer}</p></div>
    </div>
  </body>
</html>"#,
        base = BASE_STYLE,
        accent = accent,
        heading = heading,
        body = body,
        footer = footer,
    )
}

/// Sent to the IT team when a ticket is opened.
pub fn ticket_created_email(
    ticket_number: &str,
    title: &str,
    user_name: &str,
    user_email: &str,
) -> String {
    let body = format!(
        r#"
        <p>Hello IT Team,</p>
        <p>A new support ticket has been created and requires attention.</p>
        <div class="ticket-info">
          <p><strong>Ticket Number:</strong> {}</p>
          <p><strong>Title:</strong> {}</p>
          <p><strong>Submitted by:</strong> {} ({})</p>
        </div>
        <p>Please log in to the IT Service Desk to review and assign this ticket.</p>"#,
        clean_text(ticket_number),
        clean_text(title),
        clean_text(user_name),
        clean_text(user_email),
    );

    render(
        "#2563eb",
        "New Support Ticket Created",
        &body,
        "This is an automated notification from the IT Service Desk",
    )
}

/// Sent to the ticket owner once the ticket is closed.
pub fn feedback_request_email(ticket_number: &str, title: &str, user_name: &str) -> String {
    let body = format!(
        r#"
        <p>Hello {},</p>
        <p>Your support ticket has been closed. We would greatly appreciate your feedback on the service you received.</p>
        <div class="ticket-info">
          <p><strong>Ticket Number:</strong> {}</p>
          <p><strong>Title:</strong> {}</p>
        </div>
        <p>Please log in to the IT Service Desk to provide your feedback and help us improve our service.</p>"#,
        clean_text(user_name),
        clean_text(ticket_number),
        clean_text(title),
    );

    render(
        "#10b981",
        "Ticket Closed - Feedback Requested",
        &body,
        "Thank you for using the IT Service Desk",
    )
}

/// Sent to the ticket owner when an agent picks the ticket up.
pub fn ticket_assigned_email(
    ticket_number: &str,
    title: &str,
    user_name: &str,
    assignee_name: &str,
) -> String {
    let body = format!(
        r#"
        <p>Hello {},</p>
        <p>Your support ticket is now being worked on.</p>
        <div class="ticket-info">
          <p><strong>Ticket Number:</strong> {}</p>
          <p><strong>Title:</strong> {}</p>
          <p><strong>Assigned to:</strong> {}</p>
        </div>
        <p>You can follow progress and chat with the agent in the IT Service Desk.</p>"#,
        clean_text(user_name),
        clean_text(ticket_number),
        clean_text(title),
        clean_text(assignee_name),
    );

    render(
        "#f59e0b",
        "Ticket Assigned",
        &body,
        "This is an automated notification from the IT Service Desk",
    )
}

/// Sent to the ticket owner when the assignee marks the ticket resolved.
pub fn ticket_resolved_email(ticket_number: &str, title: &str, user_name: &str) -> String {
    let body = format!(
        r#"
        <p>Hello {},</p>
        <p>Your support ticket has been resolved.</p>
        <div class="ticket-info">
          <p><strong>Ticket Number:</strong> {}</p>
          <p><strong>Title:</strong> {}</p>
        </div>
        <p>If the problem is still there, reply in the ticket chat before it is closed.</p>"#,
        clean_text(user_name),
        clean_text(ticket_number),
        clean_text(title),
    );

    render(
        "#8b5cf6",
        "Ticket Resolved",
        &body,
        "This is an automated notification from the IT Service Desk",
    )
}
