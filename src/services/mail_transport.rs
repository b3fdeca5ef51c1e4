//! services/mail_transport.rs
//! Seam del transporte de correo. El servicio solo conoce este trait;
//! producción usa lettre contra un relay SMTP, los tests usan mocks.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::smtp_config::SmtpConfig;
use crate::error::TransportError;

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .context("Dirección 'from' inválida")?;

        let tls_params = TlsParameters::new(config.host.clone())?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .tls(Tls::Required(tls_params))
            .build();

        Ok(SmtpMailTransport { mailer, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", to, e)))?;

        // Cuerpo en HTML, igual que los correos del panel de admin.
        let html_part = SinglePart::builder()
            .header(
                ContentType::parse("text/html; charset=utf-8")
                    .map_err(|e| TransportError::Send(format!("content-type inválido: {}", e)))?,
            )
            .body(body.to_string());

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .multipart(MultiPart::mixed().singlepart(html_part))
            .map_err(|e| TransportError::Send(format!("No se pudo construir el mensaje: {}", e)))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        Ok(())
    }
}
