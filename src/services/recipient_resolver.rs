//! services/recipient_resolver.rs
//! Convierte un target (ids explícitos o "todos") en un conjunto concreto
//! de destinatarios con email válido. Resuelve en el momento del dispatch,
//! no sobre un snapshot previo.

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::recipient_model::{Recipient, RecipientTarget};
use crate::services::user_directory::UserDirectory;

#[derive(Clone)]
pub struct RecipientResolver {
    directory: Arc<dyn UserDirectory>,
}

/// Validación sintáctica: lettre es quien va a parsear la dirección al
/// enviar, así que usamos su mismo parser aquí.
pub fn is_valid_email(email: &str) -> bool {
    !email.trim().is_empty() && email.parse::<lettre::Address>().is_ok()
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        RecipientResolver { directory }
    }

    /// Devuelve un conjunto deduplicado de destinatarios elegibles.
    /// Los excluidos por email inválido no cuentan como fallos: nunca se
    /// intentó enviarles nada.
    pub async fn resolve(&self, target: &RecipientTarget) -> Result<Vec<Recipient>> {
        let found = match target {
            RecipientTarget::Everyone => self.directory.list_all().await?,
            RecipientTarget::Ids(ids) => {
                let unique: BTreeSet<i64> = ids.iter().copied().collect();
                if unique.is_empty() {
                    return Ok(Vec::new());
                }
                let unique: Vec<i64> = unique.into_iter().collect();
                self.directory.lookup(&unique).await?
            }
        };

        let total_found = found.len();
        let mut seen: BTreeSet<i64> = BTreeSet::new();
        let mut eligible = Vec::with_capacity(total_found);
        let mut excluded = 0usize;

        for recipient in found {
            if !seen.insert(recipient.id) {
                continue;
            }
            if is_valid_email(&recipient.email) {
                eligible.push(recipient);
            } else {
                excluded += 1;
                log::warn!(
                    "(resolve) Destinatario {} excluido por email inválido: '{}'",
                    recipient.id,
                    recipient.email
                );
            }
        }

        if excluded > 0 {
            log::info!(
                "(resolve) {} de {} destinatarios excluidos por email inválido",
                excluded,
                total_found
            );
        }

        Ok(eligible)
    }
}
