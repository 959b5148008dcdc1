use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, Message, SmtpTransport, Transport,
};

use crate::app_state::AppConfig;

/// Outgoing email. Without SMTP settings, messages are only logged.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<(SmtpTransport, Mailbox)>,
}

impl Mailer {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let Some(host) = &config.smtp_host else {
            log::info!("No SMTP host configured; emails will be logged instead of sent");
            return Ok(Mailer { transport: None });
        };
        let from = config
            .smtp_from
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("smtp_from must be set when smtp_host is set"))?;
        let from = Mailbox::new(
            Some(config.site_name.clone()),
            from.parse::<Address>()
                .map_err(|e| anyhow::anyhow!("Invalid from address: {e}"))?,
        );

        let mut builder = SmtpTransport::relay(host)?;
        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }
        Ok(Mailer {
            transport: Some((builder.build(), from)),
        })
    }

    pub fn disabled() -> Self {
        Mailer { transport: None }
    }

    /// Sends in the background. Delivery failures are logged, never returned.
    pub fn send(&self, to: &str, subject: &str, html_body: String) {
        let Some((transport, from)) = self.transport.clone() else {
            log::info!("Email to {to} ({subject}):\n{html_body}");
            return;
        };
        let to_address = match to.parse::<Address>() {
            Ok(address) => address,
            Err(err) => {
                log::warn!("Not sending email to invalid address {to}: {err}");
                return;
            }
        };
        let email = match Message::builder()
            .from(from)
            .to(Mailbox::new(None, to_address))
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
        {
            Ok(email) => email,
            Err(err) => {
                log::warn!("Failed to build email: {err}");
                return;
            }
        };

        let to = to.to_string();
        tokio::task::spawn_blocking(move || match transport.send(&email) {
            Ok(_) => log::trace!("Sent email to {to}"),
            Err(err) => log::warn!("Ignored error sending email to {to}: {err}"),
        });
    }
}
