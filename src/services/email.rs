// src/services/email.rs
//! Outgoing mail: the `Mailer` seam, the SMTP transport and the message templates

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::config_manager::EmailConfig;
use crate::services::summary::format_local;
use crate::types::ScheduledMeeting;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email is not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid email address '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("Failed to build email: {0}")]
    Build(String),
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address.parse().map_err(|e: lettre::address::AddressError| EmailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

// ===== SMTP =====

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// STARTTLS relay authenticated with the configured account, which is also the sender
    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        let (Some(username), Some(password)) = (&config.username, &config.password) else {
            return Err(EmailError::NotConfigured(
                "EMAIL_USER and EMAIL_PASS are required for SMTP".to_string(),
            ));
        };

        let from = parse_mailbox(&format!("{} <{}>", config.from_name, username))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| EmailError::NotConfigured(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&email.to)?)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError::Smtp(e.to_string()))?;

        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            chars = email.body.chars().count(),
            "Email not delivered (no SMTP credentials)"
        );
        Ok(())
    }
}

/// SMTP when credentials exist. Without them production fails and other
/// environments fall back to `LogMailer`.
pub fn build_mailer(config: &EmailConfig, production: bool) -> Result<Arc<dyn Mailer>, EmailError> {
    if config.has_credentials() {
        return Ok(Arc::new(SmtpMailer::from_config(config)?));
    }
    if production {
        return Err(EmailError::NotConfigured(
            "EMAIL_USER and EMAIL_PASS must be set in production".to_string(),
        ));
    }
    warn!("SMTP credentials missing, emails will only be logged");
    Ok(Arc::new(LogMailer))
}

// ===== Templates =====

pub fn hr_summary_email(
    hr_email: &str,
    candidate_name: &str,
    position: &str,
    summary: String,
) -> OutgoingEmail {
    OutgoingEmail {
        to: hr_email.to_string(),
        subject: format!("🤖 HR Agent Analysis: {} - {}", candidate_name, position),
        body: summary,
    }
}

pub fn hr_interview_email(
    hr_email: &str,
    candidate_name: &str,
    position: &str,
    summary: String,
) -> OutgoingEmail {
    OutgoingEmail {
        to: hr_email.to_string(),
        subject: format!("🎯 Interview Scheduled: {} - {}", candidate_name, position),
        body: summary,
    }
}

pub fn rejection_email(
    candidate_email: &str,
    candidate_name: &str,
    position: &str,
    company_name: &str,
) -> OutgoingEmail {
    OutgoingEmail {
        to: candidate_email.to_string(),
        subject: format!("Your application for {} at {}", position, company_name),
        body: format!(
            "Dear {},\n\n\
             Thank you for your interest in the {} position at {} and for the time you \
             put into your application.\n\n\
             After careful review we have decided not to move forward with your \
             application at this time. We will keep your details on file and \
             encourage you to apply for future openings that match your experience.\n\n\
             We wish you every success in your search.\n\n\
             Kind regards,\n\
             The {} Hiring Team\n",
            candidate_name, position, company_name, company_name
        ),
    }
}

pub fn interview_invitation(
    candidate_email: &str,
    candidate_name: &str,
    position: &str,
    company_name: &str,
    meeting: &ScheduledMeeting,
    utc_offset_minutes: i32,
    time_zone: &str,
) -> OutgoingEmail {
    OutgoingEmail {
        to: candidate_email.to_string(),
        subject: format!("Interview invitation: {} at {}", position, company_name),
        body: format!(
            "Dear {},\n\n\
             Thank you for applying for the {} position at {}. We were impressed by \
             your background and would like to invite you to an interview.\n\n\
             📅 Date & Time: {} ({})\n\
             ⏱️ Duration: {} minutes\n\
             🔗 Calendar event: {}\n\n\
             A calendar invitation has been sent to this address. If the time does \
             not suit you, reply to this email and we will find another slot.\n\n\
             Looking forward to speaking with you.\n\n\
             Kind regards,\n\
             The {} Hiring Team\n",
            candidate_name,
            position,
            company_name,
            format_local(meeting.scheduled_time, utc_offset_minutes),
            time_zone,
            meeting.duration_minutes,
            meeting.calendar_link,
            company_name
        ),
    }
}
