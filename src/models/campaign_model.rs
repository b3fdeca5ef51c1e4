use serde::{Deserialize, Serialize};

use crate::models::delivery_model::FailureKind;

/// Una campaña ya resuelta: subject/body son texto final (la
/// personalización, si la hay, es responsabilidad del caller).
/// `template_key = None` es un envío custom sin control de reenvío.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub subject: String,
    pub body: String,
    pub template_key: Option<String>,
}

/// POST /api/campaigns/dispatch
/// `recipient_ids` ausente significa "todos los destinatarios".
/// Con `template_key`, subject/body son opcionales (se toman de la
/// plantilla) y la idempotencia se activa sola.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchCampaignRequest {
    pub subject: Option<String>,
    pub body: Option<String>,
    pub recipient_ids: Option<Vec<i64>>,
    pub template_key: Option<String>,
}

/// POST /api/campaigns/send-single
#[derive(Debug, Clone, Deserialize)]
pub struct SendSingleRequest {
    pub recipient_id: i64,
    pub template_key: String,
}

/// Fallo de un destinatario concreto dentro de un batch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub recipient_id: i64,
    pub kind: FailureKind,
    pub reason: String,
}

/// Resultado agregado de un dispatch. Efímero, no se persiste; el
/// historial durable vive en el ledger.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignResult {
    /// Tamaño del conjunto resuelto, antes del filtro de idempotencia.
    pub total_recipients: usize,
    /// Destinatarios realmente intentados tras el filtro.
    pub selected_recipients: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub failures: Vec<DispatchFailure>,
}

impl CampaignResult {
    /// "Nada que enviar" es un estado terminal normal, no un error.
    pub fn nothing_to_do(total_recipients: usize) -> Self {
        CampaignResult {
            total_recipients,
            selected_recipients: 0,
            emails_sent: 0,
            emails_failed: 0,
            failures: Vec::new(),
        }
    }
}

/// Resultado de send-single, colapsado para la UI de la tabla
/// usuario × plantilla.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SendSingleOutcome {
    Sent,
    AlreadySent,
    Failed { reason: String },
}
