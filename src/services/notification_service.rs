//! Outbound notifications. Delivery is best-effort by contract: `notify`
//! never returns an error, so notifier latency or failure can never fail or
//! roll back a core operation.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info, warn};

use crate::config::SmtpConfig;
use crate::models::RewardLevel;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, subject: &str, body: &str);
}

/// SMTP delivery via lettre. Failures are logged and swallowed.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) {
        let message = Message::builder()
            .from(match self.from_address.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    error!("Invalid sender address '{}': {}", self.from_address, e);
                    return;
                }
            })
            .to(match recipient.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    warn!("Invalid recipient address '{}': {}", recipient, e);
                    return;
                }
            })
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string());

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to build notification email: {}", e);
                return;
            }
        };

        match self.transport.send(message).await {
            Ok(_) => info!("Notification sent to {}: {}", recipient, subject),
            Err(e) => error!("Failed to send notification to {}: {}", recipient, e),
        }
    }
}

/// Log-only notifier, used when SMTP is not configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) {
        info!(
            "Notification (log only) to {}: {} - {}",
            recipient,
            subject,
            body.lines().next().unwrap_or("")
        );
    }
}

// ======================================================================
// MESSAGE TEMPLATES
// ======================================================================

pub fn ticket_created_message(ticket_id: &str, subject: &str) -> (String, String) {
    (
        "Your complaint has been registered".to_string(),
        format!(
            "Hello,\n\nYour complaint \"{subject}\" (ID: {ticket_id}) has been registered and is \
             pending review. We will keep you informed as it progresses.\n\nComplaint Management Team"
        ),
    )
}

pub fn ticket_escalated_message(
    ticket_id: &str,
    subject: &str,
    threshold_hours: i64,
) -> (String, String) {
    (
        "Complaint Escalated".to_string(),
        format!(
            "Hello,\n\nYour complaint \"{subject}\" (ID: {ticket_id}) has been escalated because \
             it exceeded the {threshold_hours} hour resolution window. It now has priority \
             attention from our team.\n\nComplaint Management Team"
        ),
    )
}

pub fn points_earned_message(
    points: i64,
    total_points: i64,
    action_display: &str,
    level_name: &str,
) -> (String, String) {
    (
        format!("Achievement Unlocked: {points} Reward Points Earned!"),
        format!(
            "Congratulations!\n\nYou earned {points} points for {action_display}.\n\n\
             Total points: {total_points}\nCurrent level: {level_name}\n\n\
             Keep up the great work!\n\nComplaint Management Team"
        ),
    )
}

pub fn level_up_message(
    user_name: &str,
    old_level: &str,
    new_level: &RewardLevel,
    total_points: i64,
) -> (String, String) {
    let benefits = new_level
        .benefits
        .iter()
        .map(|b| format!("- {b}"))
        .collect::<Vec<_>>()
        .join("\n");
    (
        format!("Congratulations! You've reached {}!", new_level.name),
        format!(
            "Congratulations {user_name}!\n\nYou have advanced from {old_level} to {}.\n\n\
             Total points: {total_points}\n\nYour new benefits:\n{benefits}\n\n\
             Complaint Management Team",
            new_level.name
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_levels;

    #[test]
    fn level_up_message_lists_benefits() {
        let levels = default_levels();
        let (subject, body) =
            level_up_message("Ada", "Rookie Support Agent", &levels[1], 115);
        assert!(subject.contains("Support Specialist"));
        assert!(body.contains("- Priority support"));
        assert!(body.contains("115"));
    }

    #[test]
    fn escalation_message_names_the_window() {
        let (_, body) = ticket_escalated_message("abc", "Broken street light", 24);
        assert!(body.contains("24 hour"));
        assert!(body.contains("Broken street light"));
    }
}
