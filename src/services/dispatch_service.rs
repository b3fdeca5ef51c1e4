//! services/dispatch_service.rs
//! El motor de batch: resuelve destinatarios, filtra ya-enviados si la
//! campaña es idempotente, envía con un pool acotado y escribe exactamente
//! una fila del ledger por intento. Un fallo de un destinatario nunca
//! aborta el resto.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::dispatch_config::DispatchConfig;
use crate::error::{CampaignError, LedgerError};
use crate::models::campaign_model::{Campaign, CampaignResult, DispatchFailure, SendSingleOutcome};
use crate::models::delivery_model::{FailureKind, NewDeliveryRecord};
use crate::models::recipient_model::{Recipient, RecipientTarget};
use crate::services::ledger_service::LedgerService;
use crate::services::mail_transport::MailTransport;
use crate::services::recipient_resolver::RecipientResolver;
use crate::services::template_catalog::TemplateCatalog;

#[derive(Clone)]
pub struct DispatchService {
    catalog: TemplateCatalog,
    resolver: RecipientResolver,
    ledger: LedgerService,
    transport: Arc<dyn MailTransport>,
    config: DispatchConfig,
}

impl DispatchService {
    pub fn new(
        catalog: TemplateCatalog,
        resolver: RecipientResolver,
        ledger: LedgerService,
        transport: Arc<dyn MailTransport>,
        config: DispatchConfig,
    ) -> Self {
        DispatchService {
            catalog,
            resolver,
            ledger,
            transport,
            config,
        }
    }

    /// Construye la campaña final a partir del request. Con plantilla,
    /// subject/body pueden omitirse (se toman de la plantilla); sin
    /// plantilla son obligatorios.
    pub fn build_campaign(
        &self,
        subject: Option<String>,
        body: Option<String>,
        template_key: Option<String>,
    ) -> Result<Campaign, CampaignError> {
        let subject = subject.filter(|s| !s.trim().is_empty());
        let body = body.filter(|b| !b.trim().is_empty());

        match template_key {
            Some(key) => {
                let template = self.catalog.resolve(&key)?;
                Ok(Campaign {
                    subject: subject.unwrap_or_else(|| template.subject.clone()),
                    body: body.unwrap_or_else(|| template.body.clone()),
                    template_key: Some(key),
                })
            }
            None => Ok(Campaign {
                subject: subject.ok_or_else(|| {
                    CampaignError::InvalidRequest("falta 'subject' para un envío custom".to_string())
                })?,
                body: body.ok_or_else(|| {
                    CampaignError::InvalidRequest("falta 'body' para un envío custom".to_string())
                })?,
                template_key: None,
            }),
        }
    }

    /// Lanza la campaña. Los errores estructurales (plantilla desconocida,
    /// directorio caído) rechazan el dispatch completo antes de enviar
    /// nada; los fallos por destinatario se agregan en el resultado.
    pub async fn dispatch(
        &self,
        campaign: Campaign,
        target: RecipientTarget,
        idempotent: bool,
    ) -> Result<CampaignResult, CampaignError> {
        // Validar la plantilla antes de tocar el directorio o el ledger.
        if let Some(key) = &campaign.template_key {
            self.catalog.resolve(key)?;
        }

        let recipients = self
            .resolver
            .resolve(&target)
            .await
            .map_err(|e| CampaignError::Directory(format!("{:?}", e)))?;
        let total_recipients = recipients.len();

        // Filtro de idempotencia: un solo bulk lookup, nunca una query por
        // destinatario.
        let selected: Vec<Recipient> = match (&campaign.template_key, idempotent) {
            (Some(key), true) if !recipients.is_empty() => {
                let ids: Vec<i64> = recipients.iter().map(|r| r.id).collect();
                let done = self.ledger.already_sent(&ids, key).await?;
                if !done.is_empty() {
                    log::info!(
                        "(dispatch) {} destinatarios ya recibieron '{}', se omiten",
                        done.len(),
                        key
                    );
                }
                recipients
                    .into_iter()
                    .filter(|r| !done.contains(&r.id))
                    .collect()
            }
            _ => recipients,
        };

        let selected_recipients = selected.len();
        if selected_recipients == 0 {
            log::info!(
                "(dispatch) Nada que enviar: total={}, seleccionados=0",
                total_recipients
            );
            return Ok(CampaignResult::nothing_to_do(total_recipients));
        }

        log::info!(
            "(dispatch) Enviando '{}' a {} destinatarios (concurrencia={})",
            campaign.subject,
            selected_recipients,
            self.config.concurrency
        );

        let campaign_ref = &campaign;
        let outcomes: Vec<Option<DispatchFailure>> = stream::iter(selected)
            .map(|recipient| async move { self.send_one(campaign_ref, recipient).await })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let failures: Vec<DispatchFailure> = outcomes.into_iter().flatten().collect();
        let emails_failed = failures.len();
        let emails_sent = selected_recipients - emails_failed;

        if emails_failed > 0 {
            log::error!(
                "(dispatch) Batch terminado con fallos: sent={}, failed={}",
                emails_sent,
                emails_failed
            );
        } else {
            log::info!("(dispatch) Batch terminado: sent={}", emails_sent);
        }

        Ok(CampaignResult {
            total_recipients,
            selected_recipients,
            emails_sent,
            emails_failed,
            failures,
        })
    }

    /// Equivalente a un dispatch de un solo destinatario con idempotencia
    /// forzada; es lo que hay detrás del botón "Enviar" de cada celda.
    pub async fn send_single(
        &self,
        recipient_id: i64,
        template_key: &str,
    ) -> Result<SendSingleOutcome, CampaignError> {
        let template = self.catalog.resolve(template_key)?.clone();
        let campaign = Campaign {
            subject: template.subject,
            body: template.body,
            template_key: Some(template.key),
        };

        let result = self
            .dispatch(campaign, RecipientTarget::Ids(vec![recipient_id]), true)
            .await?;

        let outcome = if result.total_recipients == 0 {
            SendSingleOutcome::Failed {
                reason: "destinatario inexistente o sin email válido".to_string(),
            }
        } else if result.selected_recipients == 0 {
            SendSingleOutcome::AlreadySent
        } else if result.emails_sent == 1 {
            SendSingleOutcome::Sent
        } else {
            SendSingleOutcome::Failed {
                reason: result
                    .failures
                    .first()
                    .map(|f| f.reason.clone())
                    .unwrap_or_else(|| "fallo desconocido".to_string()),
            }
        };
        Ok(outcome)
    }

    /// Un intento aislado: timeout + transporte + una fila del ledger.
    /// Devuelve None si quedó registrado como 'sent'.
    async fn send_one(&self, campaign: &Campaign, recipient: Recipient) -> Option<DispatchFailure> {
        let send_result = tokio::time::timeout(
            self.config.per_recipient_timeout(),
            self.transport
                .send(&recipient.email, &campaign.subject, &campaign.body),
        )
        .await;

        match send_result {
            Ok(Ok(())) => {
                match self
                    .ledger
                    .append(&NewDeliveryRecord::sent(&recipient, campaign))
                    .await
                {
                    Ok(()) => None,
                    Err(LedgerError::DuplicateSend { .. }) => {
                        // Otro dispatch ganó la carrera por este par
                        // (destinatario, plantilla). El intento perdedor
                        // queda como 'failed: duplicate'.
                        let failure = DispatchFailure {
                            recipient_id: recipient.id,
                            kind: FailureKind::Duplicate,
                            reason: format!(
                                "ya existía un envío de '{}' para este destinatario",
                                campaign.template_key.as_deref().unwrap_or("")
                            ),
                        };
                        self.record_failure(campaign, &recipient, &failure).await;
                        Some(failure)
                    }
                    Err(LedgerError::Write(e)) => {
                        // El correo SÍ salió; lo que falló fue el registro.
                        log::error!(
                            "(send_one) Correo enviado a {} pero sin registro en el ledger: {:?}",
                            recipient.id,
                            e
                        );
                        Some(DispatchFailure {
                            recipient_id: recipient.id,
                            kind: FailureKind::LedgerWrite,
                            reason: format!("correo enviado pero sin registro en el ledger: {}", e),
                        })
                    }
                }
            }
            Ok(Err(transport_err)) => {
                let failure = DispatchFailure {
                    recipient_id: recipient.id,
                    kind: FailureKind::Transport,
                    reason: transport_err.to_string(),
                };
                self.record_failure(campaign, &recipient, &failure).await;
                Some(failure)
            }
            Err(_elapsed) => {
                let failure = DispatchFailure {
                    recipient_id: recipient.id,
                    kind: FailureKind::Timeout,
                    reason: format!(
                        "timeout tras {}s",
                        self.config.per_recipient_timeout_secs
                    ),
                };
                self.record_failure(campaign, &recipient, &failure).await;
                Some(failure)
            }
        }
    }

    /// Deja constancia del intento fallido en el ledger. Las filas 'failed'
    /// no entran en el índice único, así que esto no puede chocar.
    async fn record_failure(
        &self,
        campaign: &Campaign,
        recipient: &Recipient,
        failure: &DispatchFailure,
    ) {
        let record =
            NewDeliveryRecord::failed(recipient, campaign, failure.kind, &failure.reason);
        if let Err(e) = self.ledger.append(&record).await {
            // El destinatario ya viene reportado como failed en el
            // resultado; aquí solo queda el log del hueco en el historial.
            log::error!(
                "(record_failure) No se pudo registrar el fallo de {} en el ledger: {:?}",
                recipient.id,
                e
            );
        }
    }
}
