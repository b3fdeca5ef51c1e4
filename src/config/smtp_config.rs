//! config/smtp_config.rs
//! Configuración del relay SMTP, leída del entorno (.env).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from_name: String,
    pub from_address: String,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self> {
        Ok(SmtpConfig {
            host: std::env::var("SMTP_HOST").context("Falta SMTP_HOST")?,
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .context("SMTP_PORT inválido")?,
            user: std::env::var("SMTP_USER").context("Falta SMTP_USER")?,
            pass: std::env::var("SMTP_PASS").context("Falta SMTP_PASS")?,
            from_name: std::env::var("SMTP_FROM_NAME")
                .unwrap_or_else(|_| "Plataforma".to_string()),
            from_address: std::env::var("SMTP_FROM").context("Falta SMTP_FROM")?,
        })
    }
}
