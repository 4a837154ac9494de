use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::SmtpConfig;

pub mod messages;
pub mod templates;

/// Everything needed to send one mail.
#[derive(Debug, Clone)]
pub struct MailContext {
    pub subject: String,
    pub body: String,
    pub html_body: String,
    pub from: String,
    pub recipients: Vec<String>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, ctx: &MailContext) -> anyhow::Result<()>;
}

/// SMTP delivery via lettre. With credentials configured the relay is
/// reached over STARTTLS; without them a plaintext connection is used,
/// which covers local mail catchers.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .context("smtp relay config")?
                    .credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };
        Ok(Self {
            transport: builder.port(config.port).build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, ctx: &MailContext) -> anyhow::Result<()> {
        let from: Mailbox = ctx.from.parse().context("parse sender address")?;
        let mut builder = Message::builder().from(from).subject(ctx.subject.clone());
        for recipient in &ctx.recipients {
            let to: Mailbox = recipient.parse().context("parse recipient address")?;
            builder = builder.to(to);
        }
        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                ctx.body.clone(),
                ctx.html_body.clone(),
            ))
            .context("build message")?;

        self.transport.send(message).await.context("smtp send")?;
        Ok(())
    }
}

/// Attempt delivery and fold the outcome into a status line for the log.
/// Transport failures are reported, never propagated: a dead relay must not
/// take down the request or job that triggered the mail.
pub async fn deliver(transport: &dyn MailTransport, ctx: &MailContext, verb: &str) -> String {
    let recipients = ctx.recipients.join(",");
    match transport.send(ctx).await {
        Ok(()) => {
            info!(%recipients, verb, "mail sent");
            format!("{} success = {}", recipients, verb)
        }
        Err(e) => {
            warn!(%recipients, verb, error = %e, "mail send failed");
            format!("{} error = {}", recipients, verb)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{context_to, FakeTransport};
    use super::*;

    #[tokio::test]
    async fn deliver_reports_success_with_recipient_list() {
        let transport = FakeTransport::new(false);
        let ctx = context_to(&["one@example.com", "two@example.com"]);

        let status = deliver(&transport, &ctx, "activation").await;

        assert_eq!(status, "one@example.com,two@example.com success = activation");
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deliver_swallows_transport_failure() {
        let transport = FakeTransport::new(true);
        let ctx = context_to(&["one@example.com"]);

        let status = deliver(&transport, &ctx, "reminder mail").await;

        assert_eq!(status, "one@example.com error = reminder mail");
        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
