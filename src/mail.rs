//! Send emails to user for important updates.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message as LettreMessage,
    Tokio1Executor, message::Mailbox,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Mail as MailConfig;
use crate::error::{Result, ServerError};

const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Mail templates list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Ask user to confirm their email address.
    Confirmation,
    /// Provide user a password reset code.
    PasswordReset,
}

/// A queued outbound mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub template: Template,
    pub to: String,
    pub code: String,
}

/// Port for outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, message: &Message) -> Result<()>;
}

/// SMTP mailer.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a new [`SmtpMailer`] from configuration.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let transport =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.relay)
                .map_err(ServerError::internal)?
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .build();
        let from = config.from.parse().map_err(ServerError::internal)?;

        tracing::info!(relay = %config.relay, "smtp transport ready");

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        let subject = match message.template {
            Template::Confirmation => "Confirm your email",
            Template::PasswordReset => "Reset your password",
        };

        let email = LettreMessage::builder()
            .from(self.from.clone())
            .to(message.to.parse().map_err(ServerError::internal)?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(format!("<h1>{}</h1>", message.code))
            .map_err(ServerError::internal)?;

        self.transport
            .send(email)
            .await
            .map_err(ServerError::internal)?;

        Ok(())
    }
}

/// Mailer used when no mail section is configured.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        tracing::debug!(template = ?message.template, "mail sending disabled");
        Ok(())
    }
}

/// Hand-off queue between request handlers and the mail worker.
///
/// Handlers never wait on delivery; a full queue drops the message with a
/// log line. Dropping every dispatcher clone closes the channel, letting
/// the worker drain what is left before shutdown completes.
#[derive(Clone)]
pub struct MailDispatcher {
    tx: mpsc::Sender<Message>,
}

impl MailDispatcher {
    /// Spawn the worker and return the dispatcher plus its handle.
    pub fn start(
        mailer: Arc<dyn Mailer>,
        capacity: Option<usize>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) =
            mpsc::channel(capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY));

        let worker = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(err) = mailer.send(&message).await {
                    tracing::error!(
                        to = %message.to,
                        err = %err,
                        "failed to send email"
                    );
                }
            }
        });

        (Self { tx }, worker)
    }

    /// Queue a message without waiting for delivery.
    pub fn dispatch(&self, template: Template, to: &str, code: &str) {
        let message = Message {
            template,
            to: to.to_owned(),
            code: code.to_owned(),
        };

        if let Err(err) = self.tx.try_send(message) {
            tracing::error!(err = %err, "mail queue rejected message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMailer;

    #[tokio::test]
    async fn test_dispatch_delivers_without_blocking() {
        let mailer = Arc::new(RecordingMailer::default());
        let (dispatcher, worker) =
            MailDispatcher::start(Arc::clone(&mailer) as Arc<dyn Mailer>, None);

        dispatcher.dispatch(Template::Confirmation, "a@b.com", "582014");
        dispatcher.dispatch(Template::PasswordReset, "a@b.com", "token");

        // Closing the queue drains in-flight sends.
        drop(dispatcher);
        worker.await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].template, Template::Confirmation);
        assert_eq!(sent[0].code, "582014");
        assert_eq!(sent[1].template, Template::PasswordReset);
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        struct StuckMailer;

        #[async_trait]
        impl Mailer for StuckMailer {
            async fn send(&self, _message: &Message) -> Result<()> {
                std::future::pending().await
            }
        }

        let (dispatcher, worker) =
            MailDispatcher::start(Arc::new(StuckMailer), Some(1));

        // One in the worker, one queued, the rest dropped. None block.
        for _ in 0..8 {
            dispatcher.dispatch(Template::Confirmation, "a@b.com", "1");
        }

        drop(dispatcher);
        worker.abort();
    }
}
