use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::{Message, Transport};
use sqlx::SqlitePool;

use crate::error::Error;
use crate::models::{SharedCollection, User};
use crate::sharing::absolute_share_url;

/// Outbound mail delivery. One call per recipient; a `false` return means
/// the message was not handed off.
pub trait MailTransport: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str, from: &str, locale: &str) -> bool;
}

/// SMTP delivery through a relay host.
pub struct SmtpMailTransport {
    transport: lettre::SmtpTransport,
}

impl SmtpMailTransport {
    pub fn new(relay: &str) -> Result<Self, lettre::transport::smtp::Error> {
        Ok(Self {
            transport: lettre::SmtpTransport::relay(relay)?.build(),
        })
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, to: &str, subject: &str, body: &str, from: &str, _locale: &str) -> bool {
        let message = Message::builder()
            .from(match from.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    tracing::warn!("Invalid sender address {from}: {e}");
                    return false;
                }
            })
            .to(match to.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    tracing::warn!("Invalid recipient address {to}: {e}");
                    return false;
                }
            })
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string());

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Building mail to {to} failed: {e}");
                return false;
            }
        };

        match self.transport.send(&message) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Sending mail to {to} failed: {e}");
                false
            }
        }
    }
}

/// Stand-in transport for deployments without SMTP configured. Every
/// send fails (and is logged), so nothing is recorded as delivered.
pub struct NullMailTransport;

impl MailTransport for NullMailTransport {
    fn send(&self, to: &str, _subject: &str, _body: &str, _from: &str, _locale: &str) -> bool {
        tracing::warn!("Mail transport not configured; dropping mail to {to}");
        false
    }
}

/// Persistent record of which recipients were already notified for a
/// shared collection, keyed by share identity.
pub struct MailLedger {
    db: SqlitePool,
}

impl MailLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Sent timestamps per recipient for one share.
    pub async fn read(&self, shared_id: &str) -> Result<HashMap<String, String>, Error> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT email, sent_at FROM collection_mail_ledger WHERE shared_collection_id = ?",
        )
        .bind(shared_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn record(&self, shared_id: &str, email: &str) -> Result<(), Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO collection_mail_ledger (shared_collection_id, email, sent_at) VALUES (?, ?, ?)",
        )
        .bind(shared_id)
        .bind(email)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(())
    }

}

#[derive(Debug, Default, serde::Serialize)]
pub struct SendReport {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

/// Sends share notifications with per-share recipient de-duplication.
pub struct CollectionMailer {
    ledger: MailLedger,
    transport: Arc<dyn MailTransport>,
    base_url: String,
    from: Option<String>,
}

impl CollectionMailer {
    pub fn new(
        ledger: MailLedger,
        transport: Arc<dyn MailTransport>,
        base_url: String,
        from: Option<String>,
    ) -> Self {
        Self {
            ledger,
            transport,
            base_url,
            from,
        }
    }

    /// Notify every pending recipient of a shared collection.
    ///
    /// The recipient set is the owner's email plus the share's explicit
    /// emails, minus anyone already in the ledger. Each successful send
    /// is recorded; failures are logged and the batch continues.
    pub async fn send_collection(
        &self,
        shared: &SharedCollection,
        owner: &User,
        share_emails: &[String],
    ) -> Result<SendReport, Error> {
        let already_sent = self.ledger.read(&shared.id).await?;

        let mut recipients = Vec::new();
        if let Some(owner_email) = &owner.email {
            if !already_sent.contains_key(owner_email) {
                recipients.push(owner_email.clone());
            }
        }
        for email in share_emails {
            if already_sent.contains_key(email) || recipients.contains(email) {
                continue;
            }
            recipients.push(email.clone());
        }

        let share_url = absolute_share_url(&self.base_url, &shared.url);
        let subject = format!("Set of assets shared by {}", owner.name);
        let body = format!(
            "{} shared a set of assets with you.\n\nView and download the collection here:\n{}\n",
            owner.name, share_url
        );
        let from = self
            .from
            .clone()
            .or_else(|| owner.email.clone())
            .unwrap_or_else(|| "noreply@localhost".to_string());

        let mut report = SendReport::default();

        for recipient in recipients {
            if self
                .transport
                .send(&recipient, &subject, &body, &from, "en")
            {
                self.ledger.record(&shared.id, &recipient).await?;
                tracing::info!("Shared collection {} was sent to {recipient}", shared.id);
                report.sent.push(recipient);
            } else {
                tracing::warn!("Shared collection {} failed to send to {recipient}", shared.id);
                report.failed.push(recipient);
            }
        }

        Ok(report)
    }
}
