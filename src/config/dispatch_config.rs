//! config/dispatch_config.rs
//! Parámetros del motor de envío (pool acotado y timeout por destinatario).

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Envíos simultáneos máximos contra el relay SMTP.
    pub concurrency: usize,
    /// Timeout de cada envío individual; al vencer se registra como
    /// 'failed: timeout', nunca aborta el batch.
    pub per_recipient_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            concurrency: 8,
            per_recipient_timeout_secs: 30,
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Self {
        let defaults = DispatchConfig::default();

        let concurrency = std::env::var("DISPATCH_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.concurrency)
            .max(1);

        let per_recipient_timeout_secs = std::env::var("DISPATCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.per_recipient_timeout_secs)
            .max(1);

        DispatchConfig {
            concurrency,
            per_recipient_timeout_secs,
        }
    }

    pub fn per_recipient_timeout(&self) -> Duration {
        Duration::from_secs(self.per_recipient_timeout_secs)
    }
}
