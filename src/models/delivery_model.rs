use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::campaign_model::Campaign;
use crate::models::recipient_model::Recipient;

/// Resultado de un intento individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// Tipo de fallo por destinatario. Se guarda en el ledger para que un
/// operador pueda distinguir "el correo nunca salió" (transport/timeout)
/// de "salió pero no quedó registrado" (ledger_write).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Timeout,
    Duplicate,
    LedgerWrite,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::Duplicate => "duplicate",
            FailureKind::LedgerWrite => "ledger_write",
        }
    }
}

/// Fila nueva para el ledger. El email va denormalizado: la fila refleja
/// la dirección que se usó realmente, aunque el usuario la cambie después.
#[derive(Debug, Clone)]
pub struct NewDeliveryRecord {
    pub recipient_id: i64,
    pub recipient_email: String,
    pub template_key: Option<String>,
    pub subject: String,
    pub status: DeliveryStatus,
    pub failure_kind: Option<FailureKind>,
    pub failure_reason: Option<String>,
}

impl NewDeliveryRecord {
    pub fn sent(recipient: &Recipient, campaign: &Campaign) -> Self {
        NewDeliveryRecord {
            recipient_id: recipient.id,
            recipient_email: recipient.email.clone(),
            template_key: campaign.template_key.clone(),
            subject: campaign.subject.clone(),
            status: DeliveryStatus::Sent,
            failure_kind: None,
            failure_reason: None,
        }
    }

    pub fn failed(
        recipient: &Recipient,
        campaign: &Campaign,
        kind: FailureKind,
        reason: &str,
    ) -> Self {
        NewDeliveryRecord {
            recipient_id: recipient.id,
            recipient_email: recipient.email.clone(),
            template_key: campaign.template_key.clone(),
            subject: campaign.subject.clone(),
            status: DeliveryStatus::Failed,
            failure_kind: Some(kind),
            failure_reason: Some(reason.to_string()),
        }
    }
}

/// Fila del ledger tal y como se devuelve en el historial.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    pub id: String,
    pub recipient_id: i64,
    pub recipient_email: String,
    pub template_key: Option<String>,
    pub subject: String,
    pub status: String,
    pub failure_kind: Option<String>,
    pub failure_reason: Option<String>,
    pub sent_at: String,
}

/// Filtros opcionales del historial.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilters {
    pub status: Option<String>,
    pub template_key: Option<String>,
    pub recipient_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDeliveriesResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<DeliveryRecord>,
}

/// Query params de GET /api/deliveries
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub status: Option<String>,
    pub template_key: Option<String>,
    pub recipient_id: Option<i64>,
}

/// Celda de la matriz destinatario × plantilla.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSendStatus {
    pub sent: bool,
    pub sent_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkStatusRequest {
    pub recipient_ids: Vec<i64>,
    pub template_keys: Vec<String>,
}

pub type BulkStatusMatrix = HashMap<i64, HashMap<String, TemplateSendStatus>>;
