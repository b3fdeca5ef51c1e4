//! error.rs
//! Errores de dominio del servicio de campañas.

use thiserror::Error;

/// Errores a nivel de campaña: rechazan el dispatch completo antes de
/// intentar ningún envío. Los fallos por destinatario NO viven aquí;
/// se agregan en `CampaignResult.failures`.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("plantilla desconocida: '{0}'")]
    UnknownTemplate(String),

    #[error("request inválido: {0}")]
    InvalidRequest(String),

    #[error("fallo consultando el directorio de usuarios: {0}")]
    Directory(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errores del ledger de envíos.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ya existe una fila 'sent' para (recipient_id, template_key).
    /// Es el punto de enforcement de la idempotencia: el índice único
    /// parcial en SQLite rechaza el INSERT.
    #[error("ya existe un envío de '{template_key}' para el destinatario {recipient_id}")]
    DuplicateSend {
        recipient_id: i64,
        template_key: String,
    },

    #[error("fallo de escritura en el ledger: {0}")]
    Write(#[from] sqlx::Error),
}

/// Errores del transporte de correo.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("dirección de correo inválida: {0}")]
    InvalidAddress(String),

    #[error("fallo de transporte: {0}")]
    Send(String),
}
