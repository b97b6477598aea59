//! Outbound email over SMTP.
//!
//! Delivery is fire-and-forget from the workflow's point of view: callers
//! spawn the send and only log failures.

use crate::config::EmailConfig;
use crate::database::models::{Project, Task};
use crate::errors::{ServiceError, ServiceResult};
use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::str::FromStr;
use std::sync::Arc;

/// Narrow email interface: one message, two renderings.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> ServiceResult<()>;
}

pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new EmailService instance
    pub fn new(config: EmailConfig) -> ServiceResult<Self> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| ServiceError::external_service(format!("Invalid SMTP host: {e}")))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { mailer, config })
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> ServiceResult<()> {
        let from_mailbox = Mailbox::from_str(&format!(
            "{} <{}>",
            self.config.from_name, self.config.from_email
        ))
        .map_err(|e| ServiceError::validation(format!("Invalid from email: {e}")))?;

        let to_mailbox = Mailbox::from_str(to_email)
            .map_err(|e| ServiceError::validation(format!("Invalid recipient email: {e}")))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_content.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_content.to_string()),
                    ),
            )
            .map_err(|e| ServiceError::validation(format!("Failed to build email: {e}")))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| ServiceError::external_service(format!("Failed to send email: {e}")))?;

        Ok(())
    }
}

/// Sends the "new task assigned" email in the background.
pub fn spawn_task_assigned_email(
    mailer: Arc<dyn Mailer>,
    to_email: String,
    contractor_name: String,
    project: &Project,
    task: &Task,
) {
    let subject = format!("New task assigned: {}", task.title);
    let text_content = format!(
        "Hello {},\n\nYou have been assigned \"{}\" on project {} (unit {}).\n\
         Phase: {}\nDeadline: {}\n",
        contractor_name,
        task.title,
        project.name,
        task.unit,
        task.construction_phase,
        task.deadline.format("%Y-%m-%d"),
    );
    let html_content = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <p>Hello {},</p>
    <p>You have been assigned <strong>{}</strong> on project <strong>{}</strong> (unit {}).</p>
    <p>Phase: {}<br>Deadline: {}</p>
</body>
</html>"#,
        escape_html(&contractor_name),
        escape_html(&task.title),
        escape_html(&project.name),
        escape_html(&task.unit),
        escape_html(&task.construction_phase),
        task.deadline.format("%Y-%m-%d"),
    );

    tokio::spawn(async move {
        match mailer
            .send_email(&to_email, &subject, &html_content, &text_content)
            .await
        {
            Ok(()) => tracing::info!("Task assignment email sent to {}", to_email),
            Err(e) => tracing::error!("Failed to send task assignment email to {}: {}", to_email, e),
        }
    });
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
