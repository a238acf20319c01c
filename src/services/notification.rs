use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use tokio::sync::{mpsc, oneshot};

use crate::config::MailConfig;
use crate::errors::{AppError, Result};

const PORTAL_NAME: &str = "GASCKK AISHE PORTAL";

/// Transactional emails the portal sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ResetCode {
        to: String,
        code: String,
    },
    PasswordChanged {
        to: String,
        name: String,
        username: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::ResetCode { to, .. } | Notification::PasswordChanged { to, .. } => to,
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Notification::ResetCode { .. } => "reset_code",
            Notification::PasswordChanged { .. } => "password_changed",
        }
    }

    pub fn render(&self) -> EmailMessage {
        match self {
            Notification::ResetCode { to, code } => EmailMessage {
                to: to.clone(),
                subject: format!("{} - Password Reset Code", PORTAL_NAME),
                html: layout(
                    "Password reset request",
                    &format!(
                        r#"<p style="color:#334155;margin:0 0 12px;">Use the code below to reset your password. It expires in 10 minutes.</p>
<div style="display:inline-block;padding:18px 28px;border-radius:8px;background:#eef2ff;color:#1e3a8a;font-size:28px;letter-spacing:6px;">{}</div>
<p style="color:#64748b;margin-top:14px;font-size:13px;">If you didn't request this, ignore this email or contact admin.</p>"#,
                        code
                    ),
                ),
            },
            Notification::PasswordChanged { to, name, username } => EmailMessage {
                to: to.clone(),
                subject: format!("{} - Password Changed", PORTAL_NAME),
                html: layout(
                    "Password change confirmation",
                    &format!(
                        r#"<p style="color:#334155;">Hello {},</p>
<p style="color:#334155;">The password for <strong>{}</strong> has been changed successfully.</p>
<p style="color:#64748b;font-size:13px;">If you did not request this change, contact the administrator immediately.</p>"#,
                        name, username
                    ),
                ),
            },
        }
    }
}

fn layout(subtitle: &str, content: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width:700px;margin:0 auto;padding:20px;background:#f7fafc;border-radius:8px;">
<header style="text-align:center;margin-bottom:18px;">
<h1 style="margin:0;color:#0b3b64">{portal}</h1>
<p style="margin:4px 0 0;color:#475569;font-size:14px">{subtitle}</p>
</header>
<main style="background:white;padding:20px;border-radius:6px;text-align:center;">
{content}
</main>
<footer style="text-align:center;margin-top:14px;font-size:12px;color:#94a3b8;">&copy; {portal}</footer>
</div>"#,
        portal = PORTAL_NAME,
        subtitle = subtitle,
        content = content,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email delivery seam.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// STARTTLS relay authenticated with the portal's mail account.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .timeout(Some(std::time::Duration::from_secs(20)))
            .build();
        let from = Mailbox::new(Some(config.from_name.clone()), config.username.parse()?);

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(message.to.parse()?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())?;

        self.transport.send(email).await?;
        Ok(())
    }
}

/// Keeps every message in memory. Can be told to fail to exercise error paths.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<bool>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if *self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(AppError::Email("relay refused connection".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok(())
    }
}

enum Job {
    Send(Notification),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget email queue drained by one background worker.
///
/// Callers never wait on delivery; failures are logged and dropped. Jobs are
/// handled in order, which is what makes `flush` a reliable barrier.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Job>,
    has_mailer: bool,
}

impl NotificationDispatcher {
    /// Spawn the worker. Must be called inside a Tokio runtime.
    pub fn spawn(mailer: Option<Arc<dyn Mailer>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let has_mailer = mailer.is_some();
        tokio::spawn(run_worker(rx, mailer));
        Self { tx, has_mailer }
    }

    pub fn has_mailer(&self) -> bool {
        self.has_mailer
    }

    pub fn dispatch(&self, notification: Notification) {
        if self.tx.send(Job::Send(notification)).is_err() {
            tracing::error!("notification worker has stopped; message dropped");
        }
    }

    /// Resolve once every job queued before this call has been handled.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, mailer: Option<Arc<dyn Mailer>>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Send(notification) => deliver(mailer.as_deref(), notification).await,
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("notification worker shutting down");
}

async fn deliver(mailer: Option<&dyn Mailer>, notification: Notification) {
    let Some(mailer) = mailer else {
        tracing::warn!(
            to = notification.recipient(),
            template = notification.template(),
            "mail not configured; notification skipped"
        );
        return;
    };

    let message = notification.render();
    match mailer.send(&message).await {
        Ok(()) => tracing::info!(
            to = %message.to,
            template = notification.template(),
            "email sent"
        ),
        Err(e) => tracing::error!(
            to = %message.to,
            template = notification.template(),
            error = %e,
            "email delivery failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flush_waits_for_queued_sends() {
        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = NotificationDispatcher::spawn(Some(mailer.clone()));

        dispatcher.dispatch(Notification::ResetCode {
            to: "user@example.com".into(),
            code: "482913".into(),
        });
        dispatcher.dispatch(Notification::PasswordChanged {
            to: "user@example.com".into(),
            name: "User".into(),
            username: "user".into(),
        });
        dispatcher.flush().await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].html.contains("482913"));
        assert!(sent[1].subject.ends_with("Password Changed"));
    }

    #[tokio::test]
    async fn delivery_failures_are_swallowed() {
        let mailer = Arc::new(RecordingMailer::new());
        mailer.set_failing(true);
        let dispatcher = NotificationDispatcher::spawn(Some(mailer.clone()));

        dispatcher.dispatch(Notification::ResetCode {
            to: "user@example.com".into(),
            code: "111111".into(),
        });
        dispatcher.flush().await;
        assert!(mailer.sent().is_empty());

        mailer.set_failing(false);
        dispatcher.dispatch(Notification::ResetCode {
            to: "user@example.com".into(),
            code: "222222".into(),
        });
        dispatcher.flush().await;
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn without_mailer_jobs_are_dropped() {
        let dispatcher = NotificationDispatcher::spawn(None);
        assert!(!dispatcher.has_mailer());
        dispatcher.dispatch(Notification::ResetCode {
            to: "user@example.com".into(),
            code: "333333".into(),
        });
        dispatcher.flush().await;
    }

    #[test]
    fn confirmation_never_contains_a_password() {
        let message = Notification::PasswordChanged {
            to: "a@b.c".into(),
            name: "Dr. A".into(),
            username: "dra".into(),
        }
        .render();
        assert!(!message.html.to_lowercase().contains("new password:"));
        assert!(message.html.contains("dra"));
    }
}
